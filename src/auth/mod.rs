//! Authentication system
//!
//! Pluggable credential checking for the USER/PASS exchange.

pub mod credentials;
pub mod results;
pub mod validator;

pub use credentials::CredentialStore;
pub use results::AuthDecision;
pub use validator::{Authenticator, ConfigAuthenticator};
