//! Module `data_channel`
//!
//! The single pending data channel descriptor of a session and the code that
//! turns it into a connected stream when a transfer command arrives.

use log::{debug, info, warn};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout, timeout_at};

use crate::error::TransferError;

/// How the next data connection will be established.
///
/// A descriptor is consumed by exactly one transfer; dropping it closes any
/// listener it holds.
#[derive(Debug)]
pub enum DataChannel {
    /// Server listens, client connects (PASV / EPSV)
    Passive {
        listener: TcpListener,
        local: SocketAddr,
    },
    /// Server connects to the client (PORT / EPRT)
    Active { target: SocketAddr },
}

impl DataChannel {
    pub fn passive(listener: TcpListener) -> Result<Self, TransferError> {
        let local = listener.local_addr()?;
        Ok(DataChannel::Passive { listener, local })
    }

    pub fn active(target: SocketAddr) -> Self {
        DataChannel::Active { target }
    }

    pub fn is_passive(&self) -> bool {
        matches!(self, DataChannel::Passive { .. })
    }

    /// Address the data connection will use on the remote or local side
    pub fn address(&self) -> SocketAddr {
        match self {
            DataChannel::Passive { local, .. } => *local,
            DataChannel::Active { target } => *target,
        }
    }

    /// Establish the data connection.
    ///
    /// Passive channels accept one connection from `peer_ip` within
    /// `accept_timeout`; connections from other hosts are dropped. Active
    /// channels dial the target within `connect_timeout`.
    pub async fn connect(
        self,
        peer_ip: IpAddr,
        accept_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<TcpStream, TransferError> {
        match self {
            DataChannel::Passive { listener, local } => {
                let deadline = Instant::now() + accept_timeout;
                loop {
                    match timeout_at(deadline, listener.accept()).await {
                        Ok(Ok((stream, remote))) => {
                            if same_host(remote.ip(), peer_ip) {
                                info!("Accepted data connection from {} on {}", remote, local);
                                return Ok(stream);
                            }
                            warn!(
                                "Rejected data connection from {} on {}: expected {}",
                                remote, local, peer_ip
                            );
                        }
                        Ok(Err(e)) => return Err(TransferError::DataConnectionRefused(local, e)),
                        Err(_) => return Err(TransferError::DataConnectionTimeout(local)),
                    }
                }
            }
            DataChannel::Active { target } => {
                debug!("Connecting to {} for data transfer", target);
                match timeout(connect_timeout, TcpStream::connect(target)).await {
                    Ok(Ok(stream)) => {
                        info!("Opened data connection to {}", target);
                        Ok(stream)
                    }
                    Ok(Err(e)) => Err(TransferError::DataConnectionRefused(target, e)),
                    Err(_) => Err(TransferError::DataConnectionTimeout(target)),
                }
            }
        }
    }
}

/// Compares addresses treating IPv4-mapped IPv6 as IPv4
pub(crate) fn same_host(a: IpAddr, b: IpAddr) -> bool {
    a.to_canonical() == b.to_canonical()
}
