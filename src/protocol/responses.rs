//! FTP Response handling
//!
//! Defines FTP reply codes and the `Reply` value every command produces.

use std::fmt;

/// Reply codes used by this server (RFC 959 / RFC 2428).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReplyCode {
    FileStatusOkay = 150,

    CommandOkay = 200,
    FileStatus = 213,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    ClosingDataConnection = 226,
    EnteringPassiveMode = 227,
    EnteringExtendedPassiveMode = 229,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    PathCreated = 257,

    NeedPassword = 331,

    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    ConnectionClosed = 426,
    LocalError = 451,

    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    CommandNotImplementedForParameter = 504,
    ProtocolNotSupported = 522,
    NotLoggedIn = 530,
    FileError = 550,
    BadFileName = 553,
}

impl ReplyCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// A single-line reply on the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub text: String,
}

impl Reply {
    pub fn new(code: ReplyCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Wire form including the CRLF terminator
    pub fn to_wire(&self) -> String {
        format_response(self.code.as_u16(), &self.text)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code.as_u16(), self.text)
    }
}

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_is_crlf_terminated() {
        let reply = Reply::new(ReplyCode::UserLoggedIn, "User logged in");
        assert_eq!(reply.to_wire(), "230 User logged in\r\n");
        assert_eq!(reply.to_string(), "230 User logged in");
    }
}
