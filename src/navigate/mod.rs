//! Navigate module
//!
//! Handles directory navigation operations for FTP clients,
//! including changing directories and moving to the parent.

mod operations;

// Re-export public types and functions
pub use operations::{change_directory, change_to_parent};
