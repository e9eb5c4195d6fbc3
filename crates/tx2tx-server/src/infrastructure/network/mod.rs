//! Server TCP network: non-blocking listener, per-peer line framing, and
//! the client roster.
//!
//! The whole layer is poll-driven from the main loop: `connections_accept`
//! and `client_data_receive` never block (sockets are non-blocking, reads
//! stop at `WouldBlock`). Handshake bookkeeping lives here too: client
//! names are lowercased on registration, and a duplicate name evicts the
//! *older* connection so a restarted client can reclaim its slot before
//! its dead socket times out.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tx2tx_core::protocol::codec::{decode_line, encode_line, LineFramer, ProtocolError};
use tx2tx_core::protocol::messages::{HelloPayload, Message};

use crate::application::context_engine::ClientTransport;

/// Identifies one accepted connection for the lifetime of the process.
pub type ConnId = u64;

/// Errors that terminate server networking at startup.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The listen address did not parse.
    #[error("invalid listen address {addr:?}: {source}")]
    Address {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener socket could not be created or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that close one peer without affecting the server.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("connection closed by peer")]
    Closed,
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// One connected client: socket, parse buffer, and handshake metadata.
pub struct ClientConnection {
    id: ConnId,
    stream: TcpStream,
    addr: SocketAddr,
    framer: LineFramer,
    /// Lowercased name from the client's HELLO, once registered.
    pub name: Option<String>,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
}

impl ClientConnection {
    /// Drains the socket and returns all complete decoded messages.
    ///
    /// Unknown tags and malformed lines are logged and skipped; only EOF,
    /// socket errors, and buffer overflow are fatal for the peer.
    fn data_receive(&mut self) -> Result<Vec<Message>, PeerError> {
        let mut buf = [0u8; 4096];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(PeerError::Closed),
                Ok(n) => self.framer.push(&buf[..n])?,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(PeerError::Io(err)),
            }
        }

        let mut messages = Vec::new();
        for line in self.framer.take_lines() {
            match decode_line(&line) {
                Ok(message) => messages.push(message),
                Err(ProtocolError::UnknownMessageType(tag)) => {
                    debug!("ignoring unknown message type {tag:?} from {}", self.addr);
                }
                Err(err) => error!("failed to parse message from {}: {err}", self.addr),
            }
        }
        Ok(messages)
    }

    /// Writes one framed message.
    fn message_send(&mut self, message: &Message) -> Result<(), PeerError> {
        let line = encode_line(message)?;
        write_all_nonblocking(&mut self.stream, line.as_bytes())
    }
}

/// Writes a whole frame to a non-blocking socket. Frames are small (well
/// under the kernel send buffer), so a persistently full buffer means the
/// peer has stalled; after a few brief retries the write fails and the
/// caller closes the peer.
fn write_all_nonblocking(stream: &mut TcpStream, mut data: &[u8]) -> Result<(), PeerError> {
    let mut retries = 0;
    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => return Err(PeerError::Closed),
            Ok(n) => data = &data[n..],
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                retries += 1;
                if retries > 5 {
                    return Err(PeerError::Io(err));
                }
                thread::sleep(Duration::from_millis(1));
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(PeerError::Io(err)),
        }
    }
    Ok(())
}

/// The TCP server: accepts and manages client connections.
pub struct ServerNetwork {
    host: String,
    port: u16,
    max_clients: usize,
    buffer_limit: usize,
    hello_version: String,
    listener: Option<TcpListener>,
    clients: Vec<ClientConnection>,
    next_conn_id: ConnId,
}

impl ServerNetwork {
    /// Creates an unstarted server network.
    pub fn new(
        host: &str,
        port: u16,
        max_clients: usize,
        buffer_limit: usize,
        hello_version: &str,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            max_clients: max_clients.max(1),
            buffer_limit,
            hello_version: hello_version.to_string(),
            listener: None,
            clients: Vec::new(),
            next_conn_id: 1,
        }
    }

    /// Binds the listener: `SO_REUSEADDR`, backlog = `max_clients`,
    /// non-blocking.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when the address is invalid or the bind
    /// fails; both are fatal startup errors.
    pub fn start(&mut self) -> Result<(), NetworkError> {
        let addr_text = format!("{}:{}", self.host, self.port);
        let addr: SocketAddr = addr_text.parse().map_err(|source| NetworkError::Address {
            addr: addr_text.clone(),
            source,
        })?;

        let bind_err = |source| NetworkError::Bind {
            addr: addr_text.clone(),
            source,
        };
        let socket =
            Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP)).map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(self.max_clients as i32).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let listener: TcpListener = socket.into();
        info!("server listening on {}", listener.local_addr().map(|a| a.to_string()).unwrap_or(addr_text));
        self.listener = Some(listener);
        Ok(())
    }

    /// The bound address, once started. Useful when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Accepts all pending connections. Over-capacity connections are
    /// closed immediately; accepted peers get the server HELLO.
    pub fn connections_accept(&mut self) {
        loop {
            let accepted = match &self.listener {
                Some(listener) => listener.accept(),
                None => return,
            };
            match accepted {
                Ok((stream, addr)) => {
                    if self.clients.len() >= self.max_clients {
                        warn!("max clients reached, rejecting {addr}");
                        drop(stream);
                        continue;
                    }
                    if let Err(err) = stream.set_nonblocking(true) {
                        error!("cannot make accepted socket non-blocking: {err}");
                        continue;
                    }
                    let id = self.next_conn_id;
                    self.next_conn_id += 1;
                    let mut conn = ClientConnection {
                        id,
                        stream,
                        addr,
                        framer: LineFramer::new(self.buffer_limit),
                        name: None,
                        screen_width: None,
                        screen_height: None,
                    };
                    let hello = Message::hello(&self.hello_version, None, None);
                    if let Err(err) = conn.message_send(&hello) {
                        warn!("handshake to {addr} failed: {err}");
                        continue;
                    }
                    info!("client connected: {addr}");
                    self.clients.push(conn);
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    error!("error accepting connection: {err}");
                    break;
                }
            }
        }
    }

    /// Drains every peer and applies their messages (handshakes, geometry
    /// updates, keepalives). Failed peers are disconnected.
    pub fn client_data_receive(&mut self) {
        let mut inbound: Vec<(ConnId, Message)> = Vec::new();
        let mut failed: Vec<ConnId> = Vec::new();
        for conn in &mut self.clients {
            match conn.data_receive() {
                Ok(messages) => inbound.extend(messages.into_iter().map(|m| (conn.id, m))),
                Err(err) => {
                    warn!("client {} connection error: {err}", conn.addr);
                    failed.push(conn.id);
                }
            }
        }
        for id in failed {
            self.client_disconnect(id);
        }
        for (id, message) in inbound {
            self.client_message_handle(id, message);
        }
    }

    /// Closes and removes one peer.
    pub fn client_disconnect(&mut self, id: ConnId) {
        if let Some(index) = self.clients.iter().position(|c| c.id == id) {
            let conn = self.clients.remove(index);
            let _ = conn.stream.shutdown(std::net::Shutdown::Both);
            info!("client disconnected: {}", conn.addr);
        }
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Looks a client up by lowercased name.
    pub fn client_by_name(&self, name: &str) -> Option<&ClientConnection> {
        let lookup = name.to_lowercase();
        self.clients
            .iter()
            .find(|c| c.name.as_deref() == Some(lookup.as_str()))
    }

    /// Sends one message to every connected client; failing peers are
    /// closed.
    pub fn broadcast(&mut self, message: &Message) {
        let mut failed = Vec::new();
        for conn in &mut self.clients {
            if let Err(err) = conn.message_send(message) {
                error!("error sending to {}: {err}", conn.addr);
                failed.push(conn.id);
            }
        }
        for id in failed {
            self.client_disconnect(id);
        }
    }

    /// Closes every peer and the listener.
    pub fn shutdown(&mut self) {
        let ids: Vec<ConnId> = self.clients.iter().map(|c| c.id).collect();
        for id in ids {
            self.client_disconnect(id);
        }
        self.listener = None;
        info!("server stopped");
    }

    // ── Inbound message handling ──────────────────────────────────────────────

    fn client_message_handle(&mut self, id: ConnId, message: Message) {
        match message {
            Message::Hello(payload) => self.client_hello_register(id, payload),
            Message::ScreenInfo(payload) => {
                if let Some(conn) = self.client_by_id_mut(id) {
                    conn.screen_width = Some(payload.width);
                    conn.screen_height = Some(payload.height);
                    debug!("client {} screen updated: {}x{}", conn.addr, payload.width, payload.height);
                }
            }
            Message::Keepalive => debug!("keepalive received"),
            Message::ScreenEnter(_) | Message::ScreenLeave(_) => {
                warn!("received deprecated screen transition message from client (ignored)");
            }
            other => warn!("unexpected message type {:?} from client", other.msg_type()),
        }
    }

    /// Records a client handshake. A duplicate name evicts the *older*
    /// connection, resolving zombie clients after a client restart.
    fn client_hello_register(&mut self, id: ConnId, payload: HelloPayload) {
        if let Some(conn) = self.client_by_id_mut(id) {
            if let (Some(width), Some(height)) = (payload.screen_width, payload.screen_height) {
                conn.screen_width = Some(width);
                conn.screen_height = Some(height);
            }
        }

        if let Some(raw_name) = &payload.client_name {
            let name = raw_name.to_lowercase();
            let zombies: Vec<ConnId> = self
                .clients
                .iter()
                .filter(|c| c.id != id && c.name.as_deref() == Some(name.as_str()))
                .map(|c| c.id)
                .collect();
            for zombie in zombies {
                warn!("duplicate client name {name:?} detected, disconnecting old connection");
                self.client_disconnect(zombie);
            }
            if let Some(conn) = self.client_by_id_mut(id) {
                conn.name = Some(name);
            }
        }

        if let Some(conn) = self.clients.iter().find(|c| c.id == id) {
            info!(
                "client handshake: version={}, screen={:?}x{:?}, name={:?}",
                payload.version, conn.screen_width, conn.screen_height, conn.name
            );
        }
    }

    fn client_by_id_mut(&mut self, id: ConnId) -> Option<&mut ClientConnection> {
        self.clients.iter_mut().find(|c| c.id == id)
    }
}

impl ClientTransport for ServerNetwork {
    fn message_to_client_send(&mut self, name: &str, message: &Message) -> bool {
        let lookup = name.to_lowercase();
        let Some(index) = self
            .clients
            .iter()
            .position(|c| c.name.as_deref() == Some(lookup.as_str()))
        else {
            return false;
        };
        match self.clients[index].message_send(message) {
            Ok(()) => true,
            Err(err) => {
                error!("send to {name:?} failed: {err}");
                let id = self.clients[index].id;
                self.client_disconnect(id);
                false
            }
        }
    }

    fn client_connected_check(&self, name: &str) -> bool {
        self.client_by_name(name).is_some()
    }

    fn client_names(&self) -> Vec<String> {
        self.clients.iter().filter_map(|c| c.name.clone()).collect()
    }
}
