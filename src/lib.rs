pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use auth::{AuthDecision, Authenticator, ConfigAuthenticator, CredentialStore};
pub use config::ServerConfig;
pub use logging::setup_logging;
pub use server::{Server, ServerContext};
pub use storage::{Filesystem, StorageBackend, VirtualFilesystem, VirtualPath};
