//! Module `command`
//!
//! Defines the FTP command set, the table that maps each verb to its
//! argument rules and required session state, and the data structures used
//! to represent the outcome of a command.

use crate::error::ProtocolError;
use crate::protocol::parser::split_command_line;
use crate::protocol::responses::Reply;

/// Represents an FTP command parsed from the client input.
///
/// Commands that require arguments store them as `String` variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    USER(String),
    PASS(String),
    PWD,
    CWD(String),
    CDUP,
    LIST(Option<String>),
    NLST(Option<String>),
    RETR(String),
    STOR(String),
    SIZE(String),
    TYPE(String),
    NOOP,
    QUIT,
    PASV,
    EPSV(Option<String>),
    PORT(String),
    EPRT(String),
}

/// Session state a command needs before it may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Any,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Argument {
    None,
    Optional,
    Required,
}

struct VerbRule {
    verb: &'static str,
    argument: Argument,
    access: Access,
}

const fn rule(verb: &'static str, argument: Argument, access: Access) -> VerbRule {
    VerbRule {
        verb,
        argument,
        access,
    }
}

/// Every verb the server understands
const COMMAND_TABLE: &[VerbRule] = &[
    rule("USER", Argument::Required, Access::Any),
    rule("PASS", Argument::Optional, Access::Any),
    rule("QUIT", Argument::None, Access::Any),
    rule("NOOP", Argument::None, Access::Any),
    rule("PWD", Argument::None, Access::LoggedIn),
    rule("CWD", Argument::Required, Access::LoggedIn),
    rule("CDUP", Argument::None, Access::LoggedIn),
    rule("LIST", Argument::Optional, Access::LoggedIn),
    rule("NLST", Argument::Optional, Access::LoggedIn),
    rule("RETR", Argument::Required, Access::LoggedIn),
    rule("STOR", Argument::Required, Access::LoggedIn),
    rule("SIZE", Argument::Required, Access::LoggedIn),
    rule("TYPE", Argument::Required, Access::LoggedIn),
    rule("PASV", Argument::None, Access::LoggedIn),
    rule("EPSV", Argument::Optional, Access::LoggedIn),
    rule("PORT", Argument::Required, Access::LoggedIn),
    rule("EPRT", Argument::Required, Access::LoggedIn),
];

fn lookup(verb: &str) -> Option<&'static VerbRule> {
    COMMAND_TABLE.iter().find(|r| r.verb == verb)
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::USER(_) => "USER",
            Command::PASS(_) => "PASS",
            Command::PWD => "PWD",
            Command::CWD(_) => "CWD",
            Command::CDUP => "CDUP",
            Command::LIST(_) => "LIST",
            Command::NLST(_) => "NLST",
            Command::RETR(_) => "RETR",
            Command::STOR(_) => "STOR",
            Command::SIZE(_) => "SIZE",
            Command::TYPE(_) => "TYPE",
            Command::NOOP => "NOOP",
            Command::QUIT => "QUIT",
            Command::PASV => "PASV",
            Command::EPSV(_) => "EPSV",
            Command::PORT(_) => "PORT",
            Command::EPRT(_) => "EPRT",
        }
    }

    /// Session state required by this command
    pub fn access(&self) -> Access {
        lookup(self.verb()).map_or(Access::LoggedIn, |r| r.access)
    }

    pub fn requires_login(&self) -> bool {
        self.access() == Access::LoggedIn
    }
}

/// Parses a raw command line received from a client into the `Command` enum.
///
/// Verbs are case-insensitive. Unknown verbs yield `NotImplemented`; a missing
/// required argument yields `Syntax`. Arguments given to verbs that take none
/// are ignored.
pub fn parse_command(raw: &str) -> Result<Command, ProtocolError> {
    let (verb, arg) = split_command_line(raw);
    let rule = lookup(&verb).ok_or_else(|| ProtocolError::NotImplemented(verb.clone()))?;

    let arg = match rule.argument {
        Argument::None => None,
        Argument::Optional => Some(arg).filter(|a| !a.is_empty()).map(str::to_string),
        Argument::Required if arg.is_empty() => {
            return Err(ProtocolError::Syntax(format!("{} requires an argument", verb)));
        }
        Argument::Required => Some(arg.to_string()),
    };

    let required = || arg.clone().unwrap_or_default();
    let command = match rule.verb {
        "USER" => Command::USER(required()),
        "PASS" => Command::PASS(required()),
        "QUIT" => Command::QUIT,
        "NOOP" => Command::NOOP,
        "PWD" => Command::PWD,
        "CWD" => Command::CWD(required()),
        "CDUP" => Command::CDUP,
        "LIST" => Command::LIST(arg.clone()),
        "NLST" => Command::NLST(arg.clone()),
        "RETR" => Command::RETR(required()),
        "STOR" => Command::STOR(required()),
        "SIZE" => Command::SIZE(required()),
        "TYPE" => Command::TYPE(required()),
        "PASV" => Command::PASV,
        "EPSV" => Command::EPSV(arg.clone()),
        "PORT" => Command::PORT(required()),
        "EPRT" => Command::EPRT(required()),
        other => return Err(ProtocolError::NotImplemented(other.to_string())),
    };
    Ok(command)
}

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub reply: Reply,
}

impl CommandResult {
    pub fn success(reply: Reply) -> Self {
        CommandResult {
            status: CommandStatus::Success,
            reply,
        }
    }

    pub fn close(reply: Reply) -> Self {
        CommandResult {
            status: CommandStatus::CloseConnection,
            reply,
        }
    }

    pub fn closes_connection(&self) -> bool {
        self.status == CommandStatus::CloseConnection
    }
}
