//! Per-variant connection lifecycle.
//!
//! Each of the four endpoint variants owns at most one OS socket. TCP variants
//! walk `Closed -> Unbound/Bound -> Listening -> Connected`, UDP variants are
//! usable as soon as their datagram socket exists.
use crate::config::EndpointConfig;
use crate::endpoint::{LinkState, Transport};
use crate::error::{SocketError, SocketErrorKind};
use crate::utils::raw_handle_id;
use log::{debug, error};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, UdpSocket};

pub(crate) fn create_socket(transport: Transport) -> Result<Socket, SocketError> {
    let (ty, protocol) = match transport {
        Transport::Tcp => (Type::STREAM, Protocol::TCP),
        Transport::Udp => (Type::DGRAM, Protocol::UDP),
    };
    Socket::new(Domain::IPV4, ty, Some(protocol)).map_err(|e| {
        SocketError::new(
            SocketErrorKind::AllocationError,
            format!("Failed to get a {transport} socket: {e}").as_str(),
        )
    })
}

/// Binds to `0.0.0.0:port` and returns the port actually bound.
pub(crate) fn bind_socket(socket: &Socket, port: u16, reuse: bool) -> Result<u16, SocketError> {
    let bind_error = |e: std::io::Error| {
        SocketError::new(
            SocketErrorKind::BindError,
            format!("Failed to bind port {port}: {e}").as_str(),
        )
    };
    if reuse {
        socket.set_reuse_address(true).map_err(bind_error)?;
    }
    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket.bind(&SockAddr::from(addr)).map_err(bind_error)?;
    let bound = socket
        .local_addr()
        .map_err(bind_error)?
        .as_socket()
        .map(|a| a.port())
        .unwrap_or(port);
    Ok(bound)
}

fn transfer_error(op: &str, err: std::io::Error) -> SocketError {
    SocketError::new(
        SocketErrorKind::TransferError,
        format!("Failed to {op}: {err}").as_str(),
    )
}

fn not_connected() -> SocketError {
    SocketError::new(SocketErrorKind::ConnectError, "Socket is not connected")
}

enum TcpState {
    Closed,
    Unbound(Socket),
    Bound(Socket),
    Listening(Socket),
    Connected(TcpStream),
}

/// The single TCP handle of an endpoint together with its lifecycle stage.
pub(crate) struct TcpLink {
    state: TcpState,
}

impl TcpLink {
    fn closed() -> Self {
        Self {
            state: TcpState::Closed,
        }
    }

    fn connected(stream: TcpStream, config: &EndpointConfig) -> Result<Self, std::io::Error> {
        stream.set_read_timeout(config.io_timeout())?;
        stream.set_write_timeout(config.io_timeout())?;
        Ok(Self {
            state: TcpState::Connected(stream),
        })
    }

    pub(crate) fn link_state(&self) -> LinkState {
        match self.state {
            TcpState::Closed => LinkState::Closed,
            TcpState::Unbound(_) => LinkState::Unbound,
            TcpState::Bound(_) => LinkState::Bound,
            TcpState::Listening(_) => LinkState::Listening,
            TcpState::Connected(_) => LinkState::Connected,
        }
    }

    pub(crate) fn handle_id(&self) -> Option<u64> {
        match &self.state {
            TcpState::Closed => None,
            TcpState::Unbound(s) | TcpState::Bound(s) | TcpState::Listening(s) => {
                Some(raw_handle_id(s))
            }
            TcpState::Connected(stream) => Some(raw_handle_id(stream)),
        }
    }

    pub(crate) fn teardown(&mut self) {
        if let Some(id) = self.handle_id() {
            debug!("Closing TCP handle {id}");
        }
        self.state = TcpState::Closed;
    }

    fn take(&mut self) -> Self {
        Self {
            state: std::mem::replace(&mut self.state, TcpState::Closed),
        }
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            TcpState::Connected(stream) => stream.peer_addr().ok(),
            _ => None,
        }
    }

    /// One stream write. Zero bytes written for a non-empty buffer counts as failure.
    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        let TcpState::Connected(stream) = &mut self.state else {
            return Err(not_connected());
        };
        match stream.write(buf) {
            Ok(0) if !buf.is_empty() => {
                error!("Failed to send: connection closed");
                self.teardown();
                Err(SocketError::new(
                    SocketErrorKind::TransferError,
                    "Failed to send: connection closed",
                ))
            }
            Ok(n) => Ok(n),
            Err(e) => {
                error!("Failed to send: {e}");
                self.teardown();
                Err(transfer_error("send", e))
            }
        }
    }

    /// One stream read. End of stream counts as failure.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, SocketError> {
        let TcpState::Connected(stream) = &mut self.state else {
            return Err(not_connected());
        };
        if buf.is_empty() {
            return Ok(0);
        }
        match stream.read(buf) {
            Ok(0) => {
                error!("Failed to read: peer closed the connection");
                self.teardown();
                Err(SocketError::new(
                    SocketErrorKind::TransferError,
                    "Failed to read: peer closed the connection",
                ))
            }
            Ok(n) => Ok(n),
            Err(e) => {
                error!("Failed to read: {e}");
                self.teardown();
                Err(transfer_error("read", e))
            }
        }
    }
}

pub(crate) struct HostTcp {
    pub(crate) port: u16,
    pub(crate) link: TcpLink,
}

impl HostTcp {
    /// Creates and binds the listening socket; listen/accept happen on connect.
    pub(crate) fn bind(port: u16) -> Result<Self, SocketError> {
        let mut host = Self {
            port,
            link: TcpLink::closed(),
        };
        host.create()?;
        Ok(host)
    }

    fn create(&mut self) -> Result<(), SocketError> {
        let socket = create_socket(Transport::Tcp)?;
        self.port = bind_socket(&socket, self.port, true)?;
        debug!("TCP host bound to port {}", self.port);
        self.link.state = TcpState::Bound(socket);
        Ok(())
    }

    pub(crate) fn connect(&mut self, config: &EndpointConfig) -> Result<(), SocketError> {
        loop {
            match std::mem::replace(&mut self.link.state, TcpState::Closed) {
                TcpState::Connected(stream) => {
                    self.link.state = TcpState::Connected(stream);
                    return Ok(());
                }
                TcpState::Closed | TcpState::Unbound(_) => self.create()?,
                TcpState::Bound(socket) => {
                    if let Err(e) = socket.listen(config.listen_backlog) {
                        self.link.state = TcpState::Bound(socket);
                        return Err(SocketError::new(
                            SocketErrorKind::ListenAcceptError,
                            format!("Listen failed: {e}").as_str(),
                        ));
                    }
                    debug!("TCP host listening on port {}", self.port);
                    self.link.state = TcpState::Listening(socket);
                }
                TcpState::Listening(listener) => {
                    let (accepted, peer) = match listener.accept() {
                        Ok(pair) => pair,
                        Err(e) => {
                            self.link.state = TcpState::Listening(listener);
                            return Err(SocketError::new(
                                SocketErrorKind::ListenAcceptError,
                                format!("Accept failed: {e}").as_str(),
                            ));
                        }
                    };
                    // the accepted stream replaces the listener as the only handle
                    drop(listener);
                    debug!(
                        "TCP host on port {} accepted {:?}",
                        self.port,
                        peer.as_socket()
                    );
                    self.link = TcpLink::connected(TcpStream::from(accepted), config)
                        .map_err(|e| {
                            SocketError::from_io(SocketErrorKind::ListenAcceptError, e)
                        })?;
                    return Ok(());
                }
            }
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        Self {
            port: self.port,
            link: self.link.take(),
        }
    }
}

pub(crate) struct ClientTcp {
    pub(crate) host: String,
    pub(crate) remote: SocketAddrV4,
    pub(crate) link: TcpLink,
}

impl ClientTcp {
    pub(crate) fn new(host: &str, remote: SocketAddrV4) -> Result<Self, SocketError> {
        let socket = create_socket(Transport::Tcp)?;
        Ok(Self {
            host: host.to_owned(),
            remote,
            link: TcpLink {
                state: TcpState::Unbound(socket),
            },
        })
    }

    /// A single connect attempt. A failed attempt discards the socket, the next
    /// one starts from a fresh handle.
    pub(crate) fn connect(&mut self, config: &EndpointConfig) -> Result<(), SocketError> {
        let socket = match std::mem::replace(&mut self.link.state, TcpState::Closed) {
            TcpState::Connected(stream) => {
                self.link.state = TcpState::Connected(stream);
                return Ok(());
            }
            TcpState::Unbound(socket) | TcpState::Bound(socket) | TcpState::Listening(socket) => {
                socket
            }
            TcpState::Closed => create_socket(Transport::Tcp)?,
        };
        if let Err(e) = socket.connect(&SockAddr::from(self.remote)) {
            return Err(SocketError::new(
                SocketErrorKind::ConnectError,
                format!("Connection to {} failed: {e}", self.remote).as_str(),
            ));
        }
        debug!("TCP client connected to {}", self.remote);
        self.link = TcpLink::connected(TcpStream::from(socket), config)
            .map_err(|e| SocketError::from_io(SocketErrorKind::ConnectError, e))?;
        Ok(())
    }

    pub(crate) fn local_port(&self) -> Option<u16> {
        match &self.link.state {
            TcpState::Connected(stream) => stream.local_addr().ok().map(|a| a.port()),
            _ => None,
        }
    }

    pub(crate) fn take(&mut self) -> Self {
        Self {
            host: self.host.clone(),
            remote: self.remote,
            link: self.link.take(),
        }
    }
}

/// The datagram handle of a UDP endpoint. Present means ready to transfer.
pub(crate) struct UdpLink {
    socket: Option<UdpSocket>,
}

impl UdpLink {
    fn open(port: u16, config: &EndpointConfig) -> Result<(Self, u16), SocketError> {
        let socket = create_socket(Transport::Udp)?;
        let bound = bind_socket(&socket, port, false)?;
        let socket = UdpSocket::from(socket);
        socket
            .set_read_timeout(config.io_timeout())
            .and_then(|_| socket.set_write_timeout(config.io_timeout()))
            .map_err(|e| SocketError::from_io(SocketErrorKind::AllocationError, e))?;
        Ok((
            Self {
                socket: Some(socket),
            },
            bound,
        ))
    }

    pub(crate) fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub(crate) fn handle_id(&self) -> Option<u64> {
        self.socket.as_ref().map(raw_handle_id)
    }

    pub(crate) fn teardown(&mut self) {
        if let Some(id) = self.handle_id() {
            debug!("Closing UDP handle {id}");
        }
        self.socket = None;
    }

    fn take(&mut self) -> Self {
        Self {
            socket: self.socket.take(),
        }
    }

    pub(crate) fn local_port(&self) -> Option<u16> {
        self.socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .map(|a| a.port())
    }

    /// One datagram write to `target`. Empty datagrams are legal.
    pub(crate) fn send_to(&mut self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        let Some(socket) = &self.socket else {
            return Err(not_connected());
        };
        match socket.send_to(buf, target) {
            Ok(n) => Ok(n),
            Err(e) => {
                error!("Failed to send to {target}: {e}");
                self.teardown();
                Err(transfer_error("send", e))
            }
        }
    }

    /// One datagram read; bytes beyond `buf.len()` of a longer datagram are dropped.
    pub(crate) fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        let Some(socket) = &self.socket else {
            return Err(not_connected());
        };
        match socket.recv_from(buf) {
            Ok(pair) => Ok(pair),
            Err(e) => {
                error!("Failed to read: {e}");
                self.teardown();
                Err(transfer_error("read", e))
            }
        }
    }
}

pub(crate) struct HostUdp {
    pub(crate) port: u16,
    pub(crate) link: UdpLink,
}

impl HostUdp {
    /// Binding alone makes a UDP host ready to transfer.
    pub(crate) fn bind(port: u16, config: &EndpointConfig) -> Result<Self, SocketError> {
        let (link, port) = UdpLink::open(port, config)?;
        debug!("UDP host bound to port {port}");
        Ok(Self { port, link })
    }

    pub(crate) fn connect(&mut self, config: &EndpointConfig) -> Result<(), SocketError> {
        if !self.link.is_open() {
            let (link, _) = UdpLink::open(self.port, config)?;
            debug!("UDP host rebound to port {}", self.port);
            self.link = link;
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Self {
        Self {
            port: self.port,
            link: self.link.take(),
        }
    }
}

pub(crate) struct ClientUdp {
    pub(crate) host: String,
    pub(crate) remote: SocketAddrV4,
    pub(crate) link: UdpLink,
}

impl ClientUdp {
    /// The client socket is bound to an ephemeral port so it can read replies
    /// before its first send.
    pub(crate) fn new(
        host: &str,
        remote: SocketAddrV4,
        config: &EndpointConfig,
    ) -> Result<Self, SocketError> {
        let (link, _) = UdpLink::open(0, config)?;
        Ok(Self {
            host: host.to_owned(),
            remote,
            link,
        })
    }

    pub(crate) fn connect(&mut self, config: &EndpointConfig) -> Result<(), SocketError> {
        if !self.link.is_open() {
            let (link, port) = UdpLink::open(0, config)?;
            debug!("UDP client reopened on port {port}");
            self.link = link;
        }
        Ok(())
    }

    pub(crate) fn send(&mut self, buf: &[u8]) -> Result<usize, SocketError> {
        self.link.send_to(buf, SocketAddr::V4(self.remote))
    }

    pub(crate) fn take(&mut self) -> Self {
        Self {
            host: self.host.clone(),
            remote: self.remote,
            link: self.link.take(),
        }
    }
}
