//! Credential storage and management
//!
//! Holds the configured user accounts and anonymous login policy.

use std::collections::HashMap;

use crate::config::AuthConfig;

/// In-memory credential store built from configuration
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
    anonymous_enabled: bool,
    anonymous_users: Vec<String>,
}

impl CredentialStore {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            users: config.users.clone(),
            anonymous_enabled: config.anonymous,
            anonymous_users: config
                .anonymous_users
                .iter()
                .map(|u| u.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.insert(username.to_string(), password.to_string());
        self
    }

    pub fn with_anonymous(mut self, enabled: bool) -> Self {
        self.anonymous_enabled = enabled;
        if self.anonymous_users.is_empty() {
            self.anonymous_users = vec!["anonymous".to_string(), "ftp".to_string()];
        }
        self
    }

    /// Anonymous names match case-insensitively
    pub fn is_anonymous(&self, username: &str) -> bool {
        self.anonymous_enabled
            && self
                .anonymous_users
                .iter()
                .any(|u| u.eq_ignore_ascii_case(username))
    }

    pub fn password_for(&self, username: &str) -> Option<&str> {
        self.users.get(username).map(String::as_str)
    }
}
