//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use std::net::SocketAddr;

use crate::transfer::data_channel::DataChannel;

/// Result of setting up passive mode
#[derive(Debug)]
pub struct PassiveModeResult {
    pub data_socket: SocketAddr,
    pub channel: DataChannel,
}

/// Result of setting up active mode (PORT / EPRT command)
#[derive(Debug)]
pub struct ActiveModeResult {
    pub data_socket: SocketAddr,
    pub channel: DataChannel,
}
