pub mod calendar;
pub mod entry;
pub mod error;
pub mod log;
pub mod period;

pub use calendar::{Annotation, CalendarGrid, CalendarIndex};
pub use entry::{ListeningEntry, Song};
pub use error::JournalError;
pub use log::LogAppender;
pub use period::{DayKey, PeriodKey};
