pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
mod realtime;
pub mod render;
pub mod session;
pub mod submit;
mod sync;

pub use api::{ApiClient, CreateRoomRequest};
pub use config::ClientConfig;
pub use credentials::{CredentialStore, Credentials};
pub use directory::{Directory, DirectoryStore};
pub use error::ClientError;
pub use session::{Navigation, Session, SessionEvents, SessionSettings};
pub use submit::{Confirm, SubmitOutcome};
