//! A blocking TCP/UDP endpoint with reconnect-on-next-use.
//!
//! An [`Endpoint`] is either a host (binds a local port and, for TCP, accepts one
//! peer) or a client (resolves a remote IPv4 address and, for TCP, connects to
//! it). Role and transport are fixed at construction; the four combinations are
//! separate variants so no operation has to re-check them.
//!
//! Every [`Endpoint::send`] and [`Endpoint::recv`] first makes sure the endpoint
//! is connected: while it is not, the calling thread sleeps for the configured
//! retry interval and tries [`Endpoint::connect`] again. With the default
//! [`EndpointConfig`] this loop never gives up, so a peer that never shows up
//! blocks the caller forever. Set `max_retries` or cancel through
//! [`Endpoint::cancellation`] to bound it.
//!
//! A failed transfer closes the handle immediately and returns the error; the
//! *next* transfer call reconnects. Nothing above the byte stream survives a
//! reconnect, so framing state must be reset by the caller.
use crate::config::EndpointConfig;
use crate::connection::{ClientTcp, ClientUdp, HostTcp, HostUdp, TcpLink};
use crate::error::{SocketError, SocketErrorKind};
use crate::utils::{Cancellable, CancellationFlag, resolve_ipv4};
use log::{debug, warn};
use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;
use std::thread::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Udp => write!(f, "udp"),
        }
    }
}

impl FromStr for Transport {
    type Err = SocketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "udp" => Ok(Transport::Udp),
            other => Err(SocketError::new(
                SocketErrorKind::ParseError,
                format!("Unknown protocol {other}, options are tcp or udp").as_str(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Host,
    Client,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Lifecycle stage of the endpoint's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No handle; the next connect recreates it.
    Closed,
    /// Handle allocated but neither bound nor connected.
    Unbound,
    Bound,
    Listening,
    Connected,
}

impl Display for LinkState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkState::Closed => "closed",
            LinkState::Unbound => "unbound",
            LinkState::Bound => "bound",
            LinkState::Listening => "listening",
            LinkState::Connected => "connected",
        };
        write!(f, "{s}")
    }
}

enum Variant {
    HostTcp(HostTcp),
    ClientTcp(ClientTcp),
    HostUdp(HostUdp),
    ClientUdp(ClientUdp),
}

/// One network participant owning at most one socket.
///
/// Not `Clone`: the handle has exactly one owner. Use [`Endpoint::take`] to move
/// the handle out while keeping the source usable.
pub struct Endpoint {
    variant: Variant,
    config: EndpointConfig,
    cancellation: CancellationFlag,
}

impl Endpoint {
    /// Host role: binds `0.0.0.0:port` right away.
    ///
    /// UDP hosts are connected on return. TCP hosts stay `Bound` until
    /// [`Endpoint::connect`] (or the first transfer) has accepted a peer.
    /// Port 0 picks a free port, which is kept for any later rebind.
    pub fn host(
        port: u16,
        transport: Transport,
        config: EndpointConfig,
    ) -> Result<Self, SocketError> {
        let variant = match transport {
            Transport::Tcp => Variant::HostTcp(HostTcp::bind(port)?),
            Transport::Udp => Variant::HostUdp(HostUdp::bind(port, &config)?),
        };
        let endpoint = Self {
            variant,
            config,
            cancellation: CancellationFlag::new(),
        };
        debug!("Created {endpoint}");
        Ok(endpoint)
    }

    /// Client role: resolves `host` to an IPv4 address and allocates the handle.
    /// The TCP connect itself is deferred to [`Endpoint::connect`] or the first transfer.
    pub fn client(
        host: &str,
        port: u16,
        transport: Transport,
        config: EndpointConfig,
    ) -> Result<Self, SocketError> {
        let remote = resolve_ipv4(host, port)?;
        let variant = match transport {
            Transport::Tcp => Variant::ClientTcp(ClientTcp::new(host, remote)?),
            Transport::Udp => Variant::ClientUdp(ClientUdp::new(host, remote, &config)?),
        };
        let endpoint = Self {
            variant,
            config,
            cancellation: CancellationFlag::new(),
        };
        debug!("Created {endpoint}");
        Ok(endpoint)
    }

    pub fn role(&self) -> Role {
        match self.variant {
            Variant::HostTcp(_) | Variant::HostUdp(_) => Role::Host,
            Variant::ClientTcp(_) | Variant::ClientUdp(_) => Role::Client,
        }
    }

    pub fn transport(&self) -> Transport {
        match self.variant {
            Variant::HostTcp(_) | Variant::ClientTcp(_) => Transport::Tcp,
            Variant::HostUdp(_) | Variant::ClientUdp(_) => Transport::Udp,
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        match &self.variant {
            Variant::HostTcp(h) => h.link.link_state(),
            Variant::ClientTcp(c) => c.link.link_state(),
            Variant::HostUdp(h) if h.link.is_open() => LinkState::Connected,
            Variant::ClientUdp(c) if c.link.is_open() => LinkState::Connected,
            Variant::HostUdp(_) | Variant::ClientUdp(_) => LinkState::Closed,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    pub fn is_not_connected(&self) -> bool {
        !self.is_connected()
    }

    /// OS identity of the current handle, `None` while there is none.
    pub fn handle_id(&self) -> Option<u64> {
        match &self.variant {
            Variant::HostTcp(h) => h.link.handle_id(),
            Variant::ClientTcp(c) => c.link.handle_id(),
            Variant::HostUdp(h) => h.link.handle_id(),
            Variant::ClientUdp(c) => c.link.handle_id(),
        }
    }

    /// Bound port for hosts; the ephemeral port of a live handle for clients.
    pub fn local_port(&self) -> Option<u16> {
        match &self.variant {
            Variant::HostTcp(h) => Some(h.port),
            Variant::HostUdp(h) => Some(h.port),
            Variant::ClientTcp(c) => c.local_port(),
            Variant::ClientUdp(c) => c.link.local_port(),
        }
    }

    /// Resolved remote address, clients only.
    pub fn remote_addr(&self) -> Option<SocketAddrV4> {
        match &self.variant {
            Variant::ClientTcp(c) => Some(c.remote),
            Variant::ClientUdp(c) => Some(c.remote),
            Variant::HostTcp(_) | Variant::HostUdp(_) => None,
        }
    }

    /// Host name or address the client was constructed with.
    pub fn remote_host(&self) -> Option<&str> {
        match &self.variant {
            Variant::ClientTcp(c) => Some(c.host.as_str()),
            Variant::ClientUdp(c) => Some(c.host.as_str()),
            Variant::HostTcp(_) | Variant::HostUdp(_) => None,
        }
    }

    /// Flag that stops a blocked reconnect loop on its next iteration.
    /// An accept that is already waiting is not interrupted.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Drives the lifecycle one step towards `Connected`.
    ///
    /// No-op when already connected. A missing handle is recreated (and rebound
    /// for hosts) first. TCP hosts block here until a peer is accepted; TCP
    /// clients make exactly one attempt.
    pub fn connect(&mut self) -> Result<(), SocketError> {
        if self.is_connected() {
            return Ok(());
        }
        let result = match &mut self.variant {
            Variant::HostTcp(h) => h.connect(&self.config),
            Variant::ClientTcp(c) => c.connect(&self.config),
            Variant::HostUdp(h) => h.connect(&self.config),
            Variant::ClientUdp(c) => c.connect(&self.config),
        };
        match &result {
            Ok(()) => debug!("Connected {self}"),
            Err(e) => debug!("Connect attempt failed: {e}"),
        }
        result
    }

    /// Closes the handle now; the next transfer reconnects.
    pub fn disconnect(&mut self) {
        match &mut self.variant {
            Variant::HostTcp(h) => h.link.teardown(),
            Variant::ClientTcp(c) => c.link.teardown(),
            Variant::HostUdp(h) => h.link.teardown(),
            Variant::ClientUdp(c) => c.link.teardown(),
        }
    }

    /// Moves the handle into a new endpoint with the same role, addressing and
    /// config. `self` is left `Closed` and reconnects on its next use without
    /// touching the returned endpoint's handle. The returned endpoint gets a
    /// fresh cancellation flag.
    pub fn take(&mut self) -> Endpoint {
        let variant = match &mut self.variant {
            Variant::HostTcp(h) => Variant::HostTcp(h.take()),
            Variant::ClientTcp(c) => Variant::ClientTcp(c.take()),
            Variant::HostUdp(h) => Variant::HostUdp(h.take()),
            Variant::ClientUdp(c) => Variant::ClientUdp(c.take()),
        };
        Endpoint {
            variant,
            config: self.config.clone(),
            cancellation: CancellationFlag::new(),
        }
    }

    fn ensure_connected(&mut self) -> Result<(), SocketError> {
        let mut attempts = 0;
        while self.is_not_connected() {
            if self.cancellation.is_cancelled() {
                return Err(SocketError::new(
                    SocketErrorKind::Cancelled,
                    "Reconnect cancelled",
                ));
            }
            if let Some(max_retries) = self.config.max_retries {
                if attempts >= max_retries {
                    return Err(SocketError::new(
                        SocketErrorKind::RetryExhausted,
                        format!("Giving up after {attempts} attempts").as_str(),
                    ));
                }
            }
            attempts += 1;
            sleep(self.config.retry_interval());
            if let Err(e) = self.connect() {
                match self.config.max_retries {
                    Some(max) => warn!("Reconnect attempt {attempts} of {max} failed: {e}"),
                    None => warn!("Reconnect attempt {attempts} failed: {e}"),
                }
            }
        }
        Ok(())
    }

    /// Performs one write once connected and returns the bytes written.
    ///
    /// Host UDP endpoints have no peer of their own: use [`Endpoint::send_to`].
    pub fn send(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        self.ensure_connected()?;
        match &mut self.variant {
            Variant::HostTcp(h) => h.link.write(buf),
            Variant::ClientTcp(c) => c.link.write(buf),
            Variant::ClientUdp(c) => c.send(buf),
            Variant::HostUdp(_) => Err(SocketError::new(
                SocketErrorKind::MissingDestination,
                "UDP host endpoints need an explicit destination, use send_to",
            )),
        }
    }

    /// Performs one read once connected and returns the bytes read, which may
    /// be fewer than `buf.len()`.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        self.recv_from(buf).map(|(n, _)| n)
    }

    /// Like [`Endpoint::recv`] and also reports where the bytes came from.
    pub fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        self.ensure_connected()?;
        match &mut self.variant {
            Variant::HostTcp(h) => Self::stream_read(&mut h.link, buf),
            Variant::ClientTcp(c) => Self::stream_read(&mut c.link, buf),
            Variant::HostUdp(h) => h.link.recv_from(buf),
            Variant::ClientUdp(c) => c.link.recv_from(buf),
        }
    }

    fn stream_read(link: &mut TcpLink, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        // a peer that already reset may have no address left while data is still buffered
        let peer = link
            .peer_addr()
            .unwrap_or(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));
        let n = link.read(buf)?;
        Ok((n, peer))
    }

    /// One datagram to an explicit destination. UDP endpoints only; TCP
    /// endpoints reject it without touching their connection.
    pub fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        let unsupported = || {
            SocketError::new(
                SocketErrorKind::UnsupportedOperation,
                "send_to is only available on UDP endpoints",
            )
        };
        if self.transport() == Transport::Tcp {
            return Err(unsupported());
        }
        self.ensure_connected()?;
        match &mut self.variant {
            Variant::HostUdp(h) => h.link.send_to(buf, target),
            Variant::ClientUdp(c) => c.link.send_to(buf, target),
            Variant::HostTcp(_) | Variant::ClientTcp(_) => Err(unsupported()),
        }
    }

    /// Repeats [`Endpoint::send`] until all of `buf` is written.
    ///
    /// A failure part way through returns the error; bytes already written are
    /// not resent after the reconnect.
    pub fn send_all(&mut self, buf: &[u8]) -> Result<(), SocketError> {
        let mut offset = 0;
        while offset < buf.len() {
            offset += self.send(&buf[offset..])?;
        }
        Ok(())
    }

    /// Repeats [`Endpoint::recv`] until `buf` is full.
    pub fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), SocketError> {
        let mut offset = 0;
        while offset < buf.len() {
            offset += self.recv(&mut buf[offset..])?;
        }
        Ok(())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} endpoint", self.role(), self.transport())?;
        match &self.variant {
            Variant::HostTcp(h) => write!(f, ", port: {}", h.port)?,
            Variant::HostUdp(h) => write!(f, ", port: {}", h.port)?,
            Variant::ClientTcp(c) => write!(f, ", host: {} ({})", c.host, c.remote)?,
            Variant::ClientUdp(c) => write!(f, ", host: {} ({})", c.host, c.remote)?,
        }
        match self.handle_id() {
            Some(id) => write!(f, ", handle: {id}")?,
            None => write!(f, ", handle: none")?,
        }
        write!(f, ", state: {}", self.state())
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Endpoint({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast() -> EndpointConfig {
        EndpointConfig::default().with_retry_interval(Duration::from_millis(5))
    }

    #[test]
    fn transport_parses_case_insensitively() {
        assert_eq!("tcp".parse::<Transport>().unwrap(), Transport::Tcp);
        assert_eq!("UDP".parse::<Transport>().unwrap(), Transport::Udp);
        let err = "sctp".parse::<Transport>().unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::ParseError);
    }

    #[test]
    fn udp_host_is_connected_after_construction() {
        let host = Endpoint::host(0, Transport::Udp, fast()).unwrap();
        assert!(host.is_connected());
        assert_eq!(host.role(), Role::Host);
        assert_eq!(host.transport(), Transport::Udp);
        assert_ne!(host.local_port(), Some(0));
        assert!(host.remote_addr().is_none());
    }

    #[test]
    fn tcp_host_is_bound_but_not_connected() {
        let host = Endpoint::host(0, Transport::Tcp, fast()).unwrap();
        assert!(host.is_not_connected());
        assert_eq!(host.state(), LinkState::Bound);
        assert!(host.handle_id().is_some());
    }

    #[test]
    fn tcp_client_defers_connect() {
        let client = Endpoint::client("127.0.0.1", 9, Transport::Tcp, fast()).unwrap();
        assert_eq!(client.state(), LinkState::Unbound);
        assert_eq!(client.role(), Role::Client);
        assert_eq!(client.remote_host(), Some("127.0.0.1"));
        assert_eq!(client.remote_addr().map(|a| a.port()), Some(9));
    }

    #[test]
    fn unresolvable_client_fails_construction() {
        let err = Endpoint::client("no such host.invalid", 9000, Transport::Tcp, fast())
            .unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::ResolutionError);
        assert!(err.is_fatal());
    }

    #[test]
    fn binding_a_taken_port_is_a_bind_error() {
        let first = Endpoint::host(0, Transport::Udp, fast()).unwrap();
        let port = first.local_port().unwrap();
        let err = Endpoint::host(port, Transport::Udp, fast()).unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::BindError);
    }

    #[test]
    fn udp_host_send_needs_destination() {
        let mut host = Endpoint::host(0, Transport::Udp, fast()).unwrap();
        let err = host.send(b"x").unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::MissingDestination);
        assert!(host.is_connected());
    }

    #[test]
    fn send_to_is_rejected_on_tcp() {
        let mut client = Endpoint::client("127.0.0.1", 9, Transport::Tcp, fast()).unwrap();
        let err = client
            .send_to(b"x", SocketAddr::from(([127, 0, 0, 1], 9)))
            .unwrap_err();
        assert_eq!(err.error_kind, SocketErrorKind::UnsupportedOperation);
        assert_eq!(client.state(), LinkState::Unbound);
    }

    #[test]
    fn display_names_role_transport_and_state() {
        let host = Endpoint::host(0, Transport::Tcp, fast()).unwrap();
        let text = host.to_string();
        assert!(text.starts_with("host tcp endpoint, port: "));
        assert!(text.ends_with("state: bound"));
        let client = Endpoint::client("localhost", 9000, Transport::Udp, fast()).unwrap();
        let text = client.to_string();
        assert!(text.contains("host: localhost (127.0.0.1:9000)"));
        assert!(text.ends_with("state: connected"));
    }

    #[test]
    fn disconnect_closes_the_handle() {
        let mut host = Endpoint::host(0, Transport::Udp, fast()).unwrap();
        host.disconnect();
        assert_eq!(host.state(), LinkState::Closed);
        assert_eq!(host.handle_id(), None);
        assert!(host.connect().is_ok());
        assert!(host.is_connected());
    }
}
