//! Small utilities used across the core crate.
//!
//! - `Cancellable` — cooperative cancellation for the reconnect loop
//! - `CancellationFlag` — shareable `Cancellable` backed by an atomic
//! - `resolve_ipv4` — resolves a host name or literal to an IPv4 socket address
//! - `raw_handle_id` — numeric OS identity of a socket, for diagnostics
use crate::error::{SocketError, SocketErrorKind};
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait Cancellable {
    fn cancel(&mut self);
    fn is_cancelled(&self) -> bool;
}

/// Clones observe the same flag, so another thread can stop an endpoint
/// that is stuck reconnecting.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arms the flag after a cancellation was observed.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Cancellable for CancellationFlag {
    fn cancel(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn resolve_ipv4(host: &str, port: u16) -> Result<SocketAddrV4, SocketError> {
    let addrs = (host, port).to_socket_addrs().map_err(|e| {
        SocketError::new(
            SocketErrorKind::ResolutionError,
            format!("Error getting host info for {host}: {e}").as_str(),
        )
    })?;
    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| {
            SocketError::new(
                SocketErrorKind::ResolutionError,
                format!("No IPv4 address found for {host}").as_str(),
            )
        })
}

#[cfg(unix)]
pub fn raw_handle_id<T: std::os::fd::AsRawFd>(handle: &T) -> u64 {
    handle.as_raw_fd() as u64
}

#[cfg(windows)]
pub fn raw_handle_id<T: std::os::windows::io::AsRawSocket>(handle: &T) -> u64 {
    handle.as_raw_socket()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn resolves_ipv4_literal() {
        let addr = resolve_ipv4("127.0.0.1", 9000).unwrap();
        assert_eq!(*addr.ip(), Ipv4Addr::LOCALHOST);
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn resolves_localhost_name() {
        let addr = resolve_ipv4("localhost", 80).unwrap();
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn ipv6_literal_has_no_ipv4_address() {
        let err = resolve_ipv4("::1", 80).unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::ResolutionError);
    }

    #[test]
    fn invalid_name_is_a_resolution_error() {
        let err = resolve_ipv4("no such host.invalid", 80).unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::ResolutionError);
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let mut remote = flag.clone();
        assert!(!flag.is_cancelled());
        remote.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!remote.is_cancelled());
    }
}
