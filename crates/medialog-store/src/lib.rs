pub mod backend;
pub mod config;
pub mod coordinator;
pub mod credential;
pub mod error;
pub mod github;
pub mod repository;

pub use backend::{DocumentBackend, GetOutcome, MemoryBackend, PutOutcome, PutRequest, RemoteDocument};
pub use config::StoreConfig;
pub use coordinator::WriteCoordinator;
pub use credential::{CredentialStore, StaticCredential};
pub use error::StoreError;
pub use github::GitHubBackend;
pub use repository::StateRepository;
