//! Transfer module for FTP server
//!
//! Handles data channel setup, transfer modes and the byte movement of file
//! transfers and directory listings.

pub mod data_channel;
pub mod file_ops;
pub mod modes;
pub mod operations;
pub mod results;

// Re-export key types and functions
pub use data_channel::DataChannel;
pub use file_ops::{ListFormat, receive_file, send_file, send_listing};
pub use modes::TransferType;
pub use operations::{
    advertised_ipv4, check_epsv_argument, format_epsv_reply, format_pasv_reply,
    parse_eprt_argument, parse_port_argument, setup_active_mode, setup_passive_mode,
};
pub use results::{ActiveModeResult, PassiveModeResult};
