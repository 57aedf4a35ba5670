//! Error handlers
//!
//! Converts domain errors into the single FTP reply the client receives.
//! Reply texts are generic; backend detail stays in the server log.

use crate::error::types::{
    AuthError, FtpServerError, ProtocolError, SessionError, StorageError, TransferError,
};
use crate::protocol::responses::{Reply, ReplyCode};
use log::{debug, warn};

/// Log an FTP server error at a level matching its severity
pub fn handle_error(err: &FtpServerError) {
    match err {
        FtpServerError::Storage(StorageError::Local(_))
        | FtpServerError::Transfer(_)
        | FtpServerError::Session(_) => warn!("{}", err),
        _ => debug!("{}", err),
    }
}

/// Convert error to FTP response code
pub fn error_to_ftp_code(err: &FtpServerError) -> ReplyCode {
    error_to_reply(err).code
}

/// Convert error to the reply sent on the control connection
pub fn error_to_reply(err: &FtpServerError) -> Reply {
    match err {
        FtpServerError::Protocol(e) => protocol_reply(e),
        FtpServerError::Auth(e) => auth_reply(e),
        FtpServerError::Storage(e) => storage_reply(e),
        FtpServerError::Transfer(e) => transfer_reply(e),
        FtpServerError::Session(SessionError::ControlSocket(_)) => Reply::new(
            ReplyCode::ServiceNotAvailable,
            "Service not available, closing control connection",
        ),
    }
}

fn protocol_reply(err: &ProtocolError) -> Reply {
    match err {
        ProtocolError::Syntax(_) | ProtocolError::InvalidEncoding => Reply::new(
            ReplyCode::ParameterSyntaxError,
            "Syntax error in parameters or arguments",
        ),
        ProtocolError::NotImplemented(_) => {
            Reply::new(ReplyCode::CommandNotImplemented, "Command not implemented")
        }
        ProtocolError::CommandTooLong(_) => {
            Reply::new(ReplyCode::CommandSyntaxError, "Command too long")
        }
        ProtocolError::BadArgument(_) => Reply::new(
            ReplyCode::CommandNotImplementedForParameter,
            "Command not implemented for that parameter",
        ),
    }
}

fn auth_reply(err: &AuthError) -> Reply {
    match err {
        AuthError::NotLoggedIn => {
            Reply::new(ReplyCode::NotLoggedIn, "Please login with USER and PASS")
        }
        AuthError::LoginFailed(_) => Reply::new(ReplyCode::NotLoggedIn, "Login incorrect"),
        AuthError::BadSequence(msg) => Reply::new(ReplyCode::BadCommandSequence, msg.clone()),
        AuthError::AlreadyLoggedIn => {
            Reply::new(ReplyCode::BadCommandSequence, "Already logged in")
        }
        AuthError::TooManyAttempts => Reply::new(
            ReplyCode::ServiceNotAvailable,
            "Too many failed login attempts, closing control connection",
        ),
    }
}

fn storage_reply(err: &StorageError) -> Reply {
    match err {
        StorageError::NotFound(_) => Reply::new(ReplyCode::FileError, "File not found"),
        StorageError::PermissionDenied(_) => {
            Reply::new(ReplyCode::FileError, "Permission denied")
        }
        StorageError::AlreadyExists(_) => {
            Reply::new(ReplyCode::FileError, "File already exists")
        }
        StorageError::NotADirectory(_) => Reply::new(ReplyCode::FileError, "Not a directory"),
        StorageError::IsADirectory(_) => Reply::new(ReplyCode::FileError, "Is a directory"),
        StorageError::InvalidPath(_) => {
            Reply::new(ReplyCode::BadFileName, "Requested path is not allowed")
        }
        StorageError::Local(_) => Reply::new(
            ReplyCode::LocalError,
            "Requested action aborted: local error in processing",
        ),
    }
}

fn transfer_reply(err: &TransferError) -> Reply {
    match err {
        TransferError::NoDataChannel => Reply::new(
            ReplyCode::CantOpenDataConnection,
            "Use PASV, EPSV, PORT or EPRT first",
        ),
        TransferError::DataConnectionTimeout(_)
        | TransferError::DataConnectionRefused(_, _)
        | TransferError::NoAvailablePort => {
            Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection")
        }
        TransferError::InvalidPortCommand(_) | TransferError::IpMismatch { .. } => Reply::new(
            ReplyCode::ParameterSyntaxError,
            "Illegal PORT command",
        ),
        TransferError::UnsupportedAddressFamily => Reply::new(
            ReplyCode::ProtocolNotSupported,
            "Network protocol not supported, use (1)",
        ),
        TransferError::Io(_) => Reply::new(
            ReplyCode::ConnectionClosed,
            "Connection closed; transfer aborted",
        ),
    }
}
