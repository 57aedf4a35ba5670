//! Server core functionality
//!
//! The control listener, session supervision and the shared context handed
//! to every session.

pub mod context;
pub mod core;

pub use context::ServerContext;
pub use self::core::Server;
