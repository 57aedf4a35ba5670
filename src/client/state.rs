//! Module `state`
//!
//! Defines the per-connection `Session` and its authentication state
//! machine, working directory, transfer type and pending data channel.

use std::net::SocketAddr;
use uuid::Uuid;

use crate::error::AuthError;
use crate::storage::VirtualPath;
use crate::transfer::{DataChannel, TransferType};

/// Authentication progress of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    New,
    AwaitingPassword { username: String },
    Authenticated { username: String },
}

/// Represents the state of one control connection.
///
/// Owned by exactly one task; nothing in here is shared with other sessions.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    auth: AuthState,
    cwd: VirtualPath,
    transfer_type: TransferType,
    data_channel: Option<DataChannel>,
    failed_logins: u32,
}

impl Session {
    pub fn new(peer_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            local_addr,
            auth: AuthState::New,
            cwd: VirtualPath::root(),
            transfer_type: TransferType::default(),
            data_channel: None,
            failed_logins: 0,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Local end of the control connection
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.auth {
            AuthState::New => None,
            AuthState::AwaitingPassword { username } | AuthState::Authenticated { username } => {
                Some(username.as_str())
            }
        }
    }

    pub fn cwd(&self) -> &VirtualPath {
        &self.cwd
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    pub fn failed_logins(&self) -> u32 {
        self.failed_logins
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_cwd(&mut self, cwd: VirtualPath) {
        self.cwd = cwd;
    }

    pub fn set_transfer_type(&mut self, transfer_type: TransferType) {
        self.transfer_type = transfer_type;
    }

    /// Install a new data channel descriptor, dropping any previous one.
    pub fn set_data_channel(&mut self, channel: DataChannel) {
        self.data_channel = Some(channel);
    }

    /// Take the pending descriptor for a transfer. A second call returns
    /// `None` until a new channel is set up.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        self.data_channel.take()
    }

    // --------------------
    // Authentication transitions
    // --------------------

    /// USER: remember the name and wait for PASS.
    pub fn begin_login(&mut self, username: &str) -> Result<(), AuthError> {
        if self.is_logged_in() {
            return Err(AuthError::AlreadyLoggedIn);
        }
        self.auth = AuthState::AwaitingPassword {
            username: username.to_string(),
        };
        Ok(())
    }

    /// Username awaiting its PASS, if any
    pub fn pending_username(&self) -> Result<&str, AuthError> {
        match &self.auth {
            AuthState::AwaitingPassword { username } => Ok(username.as_str()),
            AuthState::Authenticated { .. } => Err(AuthError::AlreadyLoggedIn),
            AuthState::New => Err(AuthError::BadSequence("Login with USER first".into())),
        }
    }

    /// PASS accepted
    pub fn complete_login(&mut self) -> Result<(), AuthError> {
        let username = self.pending_username()?.to_string();
        self.auth = AuthState::Authenticated { username };
        self.failed_logins = 0;
        Ok(())
    }

    /// PASS rejected. Fails with `TooManyAttempts` once `max_attempts` is
    /// reached; otherwise the session returns to `New`.
    pub fn fail_login(&mut self, max_attempts: u32) -> AuthError {
        let username = self.username().unwrap_or_default().to_string();
        self.auth = AuthState::New;
        self.failed_logins += 1;
        if self.failed_logins >= max_attempts {
            AuthError::TooManyAttempts
        } else {
            AuthError::LoginFailed(username)
        }
    }
}
