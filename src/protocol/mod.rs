//! FTP Protocol implementation
//!
//! Handles FTP command parsing, dispatch, and response generation.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Access, Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;
pub use responses::{Reply, ReplyCode};
