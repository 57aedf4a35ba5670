//! Authentication validator
//!
//! Defines the pluggable credential-check capability and the default
//! implementation backed by the configured credential store.

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;

use super::credentials::CredentialStore;
use super::results::AuthDecision;

/// Maximum accepted length of a username or password
const MAX_CREDENTIAL_LENGTH: usize = 256;

/// Credential-check capability shared by all sessions.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    async fn check(&self, username: &str, password: &str) -> AuthDecision;
}

/// Performs basic input sanitation to check for malicious or malformed usernames/passwords.
fn is_valid_input(input: &str) -> bool {
    input.len() <= MAX_CREDENTIAL_LENGTH && !input.contains(['\r', '\n', '\0'])
}

/// Accepts configured users, and any password for anonymous names when
/// anonymous login is enabled.
#[derive(Debug, Clone)]
pub struct ConfigAuthenticator {
    store: CredentialStore,
}

impl ConfigAuthenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authenticator for ConfigAuthenticator {
    async fn check(&self, username: &str, password: &str) -> AuthDecision {
        if username.trim().is_empty() || !is_valid_input(username) || !is_valid_input(password) {
            return AuthDecision::Rejected;
        }

        if self.store.is_anonymous(username) {
            debug!("Anonymous login as {}", username);
            return AuthDecision::Accepted;
        }

        match self.store.password_for(username) {
            Some(stored) if stored == password => AuthDecision::Accepted,
            _ => AuthDecision::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn authenticator() -> ConfigAuthenticator {
        let mut config = AuthConfig::default();
        config.users.insert("testuser".into(), "testpass".into());
        ConfigAuthenticator::new(CredentialStore::from_config(&config))
    }

    #[tokio::test]
    async fn anonymous_accepts_any_password() {
        let auth = authenticator();
        assert!(auth.check("anonymous", "guest@example.com").await.is_accepted());
        assert!(auth.check("AnonyMous", "").await.is_accepted());
        assert!(auth.check("ftp", "x").await.is_accepted());
    }

    #[tokio::test]
    async fn configured_user() {
        let auth = authenticator();
        assert!(auth.check("testuser", "testpass").await.is_accepted());
        assert_eq!(auth.check("testuser", "wrong").await, AuthDecision::Rejected);
        assert_eq!(auth.check("invaliduser", "invalidpass").await, AuthDecision::Rejected);
    }

    #[tokio::test]
    async fn anonymous_can_be_disabled() {
        let store = CredentialStore::default().with_anonymous(false);
        let auth = ConfigAuthenticator::new(store);
        assert_eq!(auth.check("anonymous", "a@b").await, AuthDecision::Rejected);
    }

    #[tokio::test]
    async fn malformed_input_is_rejected() {
        let store = CredentialStore::default().with_user("bob", "pw\n");
        let auth = ConfigAuthenticator::new(store);
        assert_eq!(auth.check("bob", "pw\n").await, AuthDecision::Rejected);
        assert_eq!(auth.check("", "x").await, AuthDecision::Rejected);
    }
}
