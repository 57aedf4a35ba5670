//! Transfer operations
//!
//! Data channel setup for passive (PASV, EPSV) and active (PORT, EPRT) modes,
//! plus the address formats those commands exchange.

use log::{debug, info};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use tokio::net::TcpListener;

use crate::error::TransferError;
use crate::transfer::data_channel::{DataChannel, same_host};
use crate::transfer::results::{ActiveModeResult, PassiveModeResult};

/// Lowest port accepted as an active-mode target
const MIN_ACTIVE_PORT: u16 = 1024;

/// Bind a passive listener on `bind_ip`.
///
/// Ports in `ports` are tried in order; a range of `0..=0` lets the OS pick an
/// ephemeral port.
pub async fn setup_passive_mode(
    bind_ip: IpAddr,
    ports: RangeInclusive<u16>,
) -> Result<PassiveModeResult, TransferError> {
    for port in ports {
        match TcpListener::bind(SocketAddr::new(bind_ip, port)).await {
            Ok(listener) => {
                let channel = DataChannel::passive(listener)?;
                let data_socket = channel.address();
                info!("Listening for passive data connection on {}", data_socket);
                return Ok(PassiveModeResult {
                    data_socket,
                    channel,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!("Passive port {} in use", port);
            }
            Err(e) => return Err(TransferError::Io(e)),
        }
    }
    Err(TransferError::NoAvailablePort)
}

/// Validate an active-mode target for a client connected from `peer_ip`.
pub fn setup_active_mode(
    peer_ip: IpAddr,
    target: SocketAddr,
    allow_foreign_target: bool,
) -> Result<ActiveModeResult, TransferError> {
    if !allow_foreign_target && !same_host(target.ip(), peer_ip) {
        return Err(TransferError::IpMismatch {
            expected: peer_ip.to_string(),
            provided: target.ip().to_string(),
        });
    }
    if target.port() < MIN_ACTIVE_PORT {
        return Err(TransferError::InvalidPortCommand(format!(
            "port {} is reserved",
            target.port()
        )));
    }
    info!("Active data connection target set to {}", target);
    Ok(ActiveModeResult {
        data_socket: target,
        channel: DataChannel::active(target),
    })
}

/// Parse the `h1,h2,h3,h4,p1,p2` argument of PORT.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddr, TransferError> {
    let invalid = || TransferError::InvalidPortCommand(arg.to_string());
    let fields = arg
        .split(',')
        .map(|f| f.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let [h1, h2, h3, h4, p1, p2] = fields[..] else {
        return Err(invalid());
    };
    let port = u16::from(p1) << 8 | u16::from(p2);
    Ok(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::new(h1, h2, h3, h4)),
        port,
    ))
}

/// Parse the `<d><af><d><addr><d><port><d>` argument of EPRT.
pub fn parse_eprt_argument(arg: &str) -> Result<SocketAddr, TransferError> {
    let invalid = || TransferError::InvalidPortCommand(arg.to_string());
    let delimiter = arg.chars().next().ok_or_else(invalid)?;
    if !(33..=126).contains(&(delimiter as u32)) {
        return Err(invalid());
    }
    let fields: Vec<&str> = arg.split(delimiter).collect();
    let [_, family, address, port, rest] = fields[..] else {
        return Err(invalid());
    };
    if !rest.is_empty() {
        return Err(invalid());
    }
    let ip: IpAddr = match family {
        "1" => IpAddr::V4(address.parse().map_err(|_| invalid())?),
        "2" => IpAddr::V6(address.parse().map_err(|_| invalid())?),
        _ => return Err(TransferError::UnsupportedAddressFamily),
    };
    let port: u16 = port.parse().map_err(|_| invalid())?;
    Ok(SocketAddr::new(ip, port))
}

/// Check the optional EPSV argument. `ALL` and the protocol numbers 1 and 2
/// are accepted.
pub fn check_epsv_argument(arg: Option<&str>) -> Result<(), TransferError> {
    match arg.map(str::trim) {
        None | Some("") | Some("1") | Some("2") => Ok(()),
        Some(a) if a.eq_ignore_ascii_case("ALL") => Ok(()),
        Some(_) => Err(TransferError::UnsupportedAddressFamily),
    }
}

/// IPv4 address advertised in a 227 reply
pub fn advertised_ipv4(public_ip: Option<Ipv4Addr>, local: IpAddr) -> Result<Ipv4Addr, TransferError> {
    if let Some(ip) = public_ip {
        return Ok(ip);
    }
    match local.to_canonical() {
        IpAddr::V4(v4) => Ok(v4),
        IpAddr::V6(_) => Err(TransferError::UnsupportedAddressFamily),
    }
}

/// Text of the 227 reply
pub fn format_pasv_reply(ip: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = ip.octets();
    format!(
        "Entering Passive Mode ({},{},{},{},{},{})",
        h1,
        h2,
        h3,
        h4,
        port >> 8,
        port & 0xff
    )
}

/// Text of the 229 reply
pub fn format_epsv_reply(port: u16) -> String {
    format!("Entering Extended Passive Mode (|||{}|)", port)
}
