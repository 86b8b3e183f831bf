pub mod codec;
pub mod schedule;
pub mod types;

pub use codec::DecodeError;
pub use schedule::{CommandError, Direction, ItemEdit, Progress, Stats};
pub use types::*;
