//! Client management system
//!
//! Per-connection session state, control connection I/O and the command
//! loop that drives a session.

pub mod handler;
pub mod session;
pub mod state;

pub use handler::{SessionEnd, handle_client};
pub use session::{ControlLine, ControlReader, ControlWriter};
pub use state::{AuthState, Session};
