//! Error types
//!
//! Defines domain-specific error types for each module of the FTP server.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Malformed or unsupported command lines
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Command not implemented: {0}")]
    NotImplemented(String),
    #[error("Command line exceeds {0} bytes")]
    CommandTooLong(usize),
    #[error("Command line is not valid UTF-8")]
    InvalidEncoding,
    #[error("Unsupported parameter: {0}")]
    BadArgument(String),
}

/// Authentication module errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not logged in")]
    NotLoggedIn,
    #[error("Login failed for user: {0}")]
    LoginFailed(String),
    #[error("Bad command sequence: {0}")]
    BadSequence(String),
    #[error("User already logged in")]
    AlreadyLoggedIn,
    #[error("Too many failed login attempts")]
    TooManyAttempts,
}

/// Storage and virtual filesystem errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Is a directory: {0}")]
    IsADirectory(String),
    #[error("Local storage error: {0}")]
    Local(#[from] io::Error),
}

impl StorageError {
    /// Classify an I/O error raised while operating on `path`.
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.to_string()),
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
            io::ErrorKind::NotADirectory => StorageError::NotADirectory(path.to_string()),
            io::ErrorKind::IsADirectory => StorageError::IsADirectory(path.to_string()),
            _ => StorageError::Local(err),
        }
    }
}

/// Data channel and transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("No data channel has been set up")]
    NoDataChannel,
    #[error("Timed out waiting for data connection on {0}")]
    DataConnectionTimeout(SocketAddr),
    #[error("Data connection to {0} refused: {1}")]
    DataConnectionRefused(SocketAddr, io::Error),
    #[error("No available port for data connection")]
    NoAvailablePort,
    #[error("Invalid PORT command: {0}")]
    InvalidPortCommand(String),
    #[error("IP mismatch: expected {expected}, got {provided}")]
    IpMismatch { expected: String, provided: String },
    #[error("Address family not supported for this command")]
    UnsupportedAddressFamily,
    #[error("Transfer failed: {0}")]
    Io(#[from] io::Error),
}

/// Control connection failures that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Control connection I/O error: {0}")]
    ControlSocket(#[from] io::Error),
}

/// General FTP server error that encompasses all error types
#[derive(Debug, Error)]
pub enum FtpServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl FtpServerError {
    /// Errors after which the control connection cannot continue
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FtpServerError::Session(_) | FtpServerError::Auth(AuthError::TooManyAttempts)
        )
    }
}
