//! Listener setup: bind address resolution and IPv6-only TCP sockets.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};

use nix::sys::socket::{
    self, sockopt, AddressFamily, Backlog, SockFlag, SockProtocol, SockType, SockaddrIn,
    SockaddrIn6,
};

use crate::config::WebConfig;
use crate::error::{AppError, Result};

/// Distinct bind IPs from config, `bind_addresses` first, else `bind_address`
pub fn resolve_bind_addresses(web: &WebConfig) -> Result<Vec<IpAddr>> {
    let raw_addrs = if web.bind_addresses.is_empty() {
        std::slice::from_ref(&web.bind_address)
    } else {
        web.bind_addresses.as_slice()
    };

    let mut seen = HashSet::new();
    let mut addrs = Vec::with_capacity(raw_addrs.len());
    for raw in raw_addrs {
        let ip: IpAddr = raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid bind address: {}", raw)))?;
        if seen.insert(ip) {
            addrs.push(ip);
        }
    }

    Ok(addrs)
}

/// Bind a non-blocking TCP listener; IPv6 sockets are made v6-only so
/// `0.0.0.0` and `::` can be bound side by side.
pub fn bind_tcp_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let family = match addr {
        SocketAddr::V4(_) => AddressFamily::Inet,
        SocketAddr::V6(_) => AddressFamily::Inet6,
    };
    let fd = socket::socket(family, SockType::Stream, SockFlag::SOCK_CLOEXEC, SockProtocol::Tcp)?;

    socket::setsockopt(&fd, sockopt::ReuseAddr, &true)?;

    match addr {
        SocketAddr::V4(v4) => {
            socket::bind(fd.as_raw_fd(), &SockaddrIn::from(v4))?;
        }
        SocketAddr::V6(v6) => {
            socket::setsockopt(&fd, sockopt::Ipv6V6Only, &true)?;
            socket::bind(fd.as_raw_fd(), &SockaddrIn6::from(v6))?;
        }
    }
    socket::listen(&fd, Backlog::MAXCONN)?;

    // SAFETY: fd is a freshly created, listening socket owned by nobody else
    let listener = unsafe { TcpListener::from_raw_fd(fd.into_raw_fd()) };
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Bind every address on `port`, skipping the ones that fail.
///
/// Errors only when nothing could be bound.
pub fn bind_tcp_listeners(addrs: &[IpAddr], port: u16) -> Result<Vec<TcpListener>> {
    let mut listeners = Vec::new();
    for ip in addrs {
        let addr = SocketAddr::new(*ip, port);
        match bind_tcp_listener(addr) {
            Ok(listener) => listeners.push(listener),
            Err(e) => tracing::warn!("Failed to bind {}: {}", addr, e),
        }
    }

    if listeners.is_empty() {
        return Err(AppError::Internal(format!(
            "Failed to bind any address on port {}",
            port
        )));
    }
    Ok(listeners)
}
