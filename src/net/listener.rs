//! Listener construction and address resolution.
//!
//! # Responsibilities
//! - Resolve the configured address/port pair into a socket address
//! - Reject malformed addresses before any socket syscall
//! - Bind and record the real bound address (resolves port 0)

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

use crate::error::ServerError;

/// Resolve `address`/`port` into a [`SocketAddr`] without touching the
/// network. An empty address means all interfaces; anything else must be an
/// IP literal.
pub(crate) fn resolve_addr(address: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let ip = if address.is_empty() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        address
            .parse::<IpAddr>()
            .map_err(|e| ServerError::InvalidAddress {
                address: format!("{address}:{port}"),
                reason: e.to_string(),
            })?
    };
    Ok(SocketAddr::new(ip, port))
}

/// Bind a nonblocking listener and return it with its bound address.
///
/// The returned address is meaningful even when `port` was 0: it carries the
/// OS-assigned ephemeral port.
pub(crate) fn bind(address: &str, port: u16) -> Result<(TcpListener, SocketAddr), ServerError> {
    let addr = resolve_addr(address, port)?;

    let bind_err = |e: std::io::Error| ServerError::InvalidAddress {
        address: addr.to_string(),
        reason: e.to_string(),
    };
    let listener = TcpListener::bind(addr).map_err(bind_err)?;
    listener.set_nonblocking(true).map_err(bind_err)?;
    let bound = listener.local_addr().map_err(bind_err)?;

    tracing::info!(address = %bound, "listener bound");
    Ok((listener, bound))
}
