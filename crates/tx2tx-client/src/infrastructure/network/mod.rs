//! Client TCP connection to the tx2tx server.
//!
//! Dialing retries with a configurable attempt count and delay; once
//! connected the socket is non-blocking and `receive` drains complete
//! line-framed messages per call. `reconnect` is a single
//! close → reset-attempts → connect cycle used by the session loop after
//! a connection loss.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use tx2tx_core::config::ReconnectConfig;
use tx2tx_core::domain::geometry::Screen;
use tx2tx_core::protocol::codec::{decode_line, encode_line, LineFramer, ProtocolError};
use tx2tx_core::protocol::messages::Message;

/// Errors in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// The server address is not `host:port`.
    #[error("invalid server address {0:?} (expected host:port)")]
    Address(String),

    /// All connection attempts failed.
    #[error("failed to connect to {addr} after {attempts} attempt(s): {source}")]
    ConnectFailed {
        addr: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// An operation was attempted without an established connection.
    #[error("not connected to server")]
    NotConnected,

    /// The server closed the connection.
    #[error("connection closed by server")]
    Closed,

    /// An I/O error occurred on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The line buffer overflowed or a frame failed to encode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Parses a `host:port` server address. The split is on the last colon so
/// IPv6 literals keep their inner colons.
pub fn server_address_parse(address: &str) -> Result<(String, u16), ClientNetworkError> {
    let Some((host, port_text)) = address.rsplit_once(':') else {
        return Err(ClientNetworkError::Address(address.to_string()));
    };
    let port: u16 = port_text
        .parse()
        .map_err(|_| ClientNetworkError::Address(address.to_string()))?;
    if host.is_empty() {
        return Err(ClientNetworkError::Address(address.to_string()));
    }
    Ok((host.to_string(), port))
}

/// The TCP client connection.
pub struct ClientNetwork {
    host: String,
    port: u16,
    reconnect: ReconnectConfig,
    buffer_limit: usize,
    hello_version: String,
    screen: Option<Screen>,
    client_name: Option<String>,
    stream: Option<TcpStream>,
    framer: LineFramer,
    attempts: u32,
}

impl ClientNetwork {
    /// Creates an unconnected client network. `screen` and `client_name`
    /// are advertised in the HELLO on every (re)connect.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        host: &str,
        port: u16,
        reconnect: ReconnectConfig,
        buffer_limit: usize,
        hello_version: &str,
        screen: Option<Screen>,
        client_name: Option<&str>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port,
            reconnect,
            buffer_limit,
            hello_version: hello_version.to_string(),
            screen,
            client_name: client_name.map(str::to_string),
            stream: None,
            framer: LineFramer::new(buffer_limit),
            attempts: 0,
        }
    }

    /// `true` while a connection is established.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connects with bounded retry and sends the HELLO handshake carrying
    /// version, local geometry, and the client name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientNetworkError::ConnectFailed`] when every attempt
    /// fails. With reconnect disabled only one attempt is made.
    pub fn connect(&mut self) -> Result<(), ClientNetworkError> {
        let addr = format!("{}:{}", self.host, self.port);
        let max_attempts = self.reconnect.max_attempts.max(1);
        let mut last_error: Option<std::io::Error> = None;

        while self.attempts < max_attempts {
            self.attempts += 1;
            match TcpStream::connect(&addr) {
                Ok(stream) => {
                    stream.set_nonblocking(true)?;
                    self.stream = Some(stream);
                    self.framer = LineFramer::new(self.buffer_limit);
                    self.attempts = 0;
                    info!("connected to server {addr}");

                    let hello = Message::hello(
                        &self.hello_version,
                        self.screen,
                        self.client_name.as_deref(),
                    );
                    self.message_send(&hello)?;
                    return Ok(());
                }
                Err(err) => {
                    warn!(
                        "connection attempt {}/{} failed: {err}",
                        self.attempts, max_attempts
                    );
                    last_error = Some(err);
                    if !self.reconnect.enabled {
                        break;
                    }
                    if self.attempts < max_attempts {
                        thread::sleep(Duration::from_secs_f64(self.reconnect.delay_seconds));
                    }
                }
            }
        }

        Err(ClientNetworkError::ConnectFailed {
            addr,
            attempts: self.attempts,
            source: last_error
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "no attempts made")),
        })
    }

    /// Closes the connection. Safe when already closed.
    pub fn connection_close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            info!("connection closed");
        }
        self.framer = LineFramer::new(self.buffer_limit);
    }

    /// Sends one framed message.
    ///
    /// # Errors
    ///
    /// Returns [`ClientNetworkError::NotConnected`] without a connection;
    /// write failures close the connection and surface as errors.
    pub fn message_send(&mut self, message: &Message) -> Result<(), ClientNetworkError> {
        let line = encode_line(message)?;
        let result = {
            let Some(stream) = self.stream.as_mut() else {
                return Err(ClientNetworkError::NotConnected);
            };
            write_all_nonblocking(stream, line.as_bytes())
        };
        if let Err(err) = result {
            self.connection_close();
            return Err(err);
        }
        Ok(())
    }

    /// Non-blocking receive. Returns the batch of complete messages read
    /// this call; unknown tags and malformed lines are logged and skipped.
    ///
    /// # Errors
    ///
    /// A closed connection, socket error, or buffer overflow closes the
    /// connection and surfaces as a fatal error.
    pub fn receive(&mut self) -> Result<Vec<Message>, ClientNetworkError> {
        if self.stream.is_none() {
            return Err(ClientNetworkError::NotConnected);
        }

        let mut fatal: Option<ClientNetworkError> = None;
        {
            let stream = self.stream.as_mut().expect("checked above");
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => {
                        fatal = Some(ClientNetworkError::Closed);
                        break;
                    }
                    Ok(n) => {
                        if let Err(err) = self.framer.push(&buf[..n]) {
                            fatal = Some(err.into());
                            break;
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => break,
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        fatal = Some(ClientNetworkError::Io(err));
                        break;
                    }
                }
            }
        }
        if let Some(err) = fatal {
            self.connection_close();
            return Err(err);
        }

        let mut messages = Vec::new();
        for line in self.framer.take_lines() {
            match decode_line(&line) {
                Ok(message) => {
                    debug!("received from server: {}", message.msg_type());
                    messages.push(message);
                }
                Err(ProtocolError::UnknownMessageType(tag)) => {
                    debug!("ignoring unknown message type {tag:?}");
                }
                Err(err) => error!("failed to parse server message: {err}"),
            }
        }
        Ok(messages)
    }

    /// Single reconnect cycle: close, reset the attempt counter, connect.
    /// Returns `false` when reconnect is disabled or the dial fails.
    pub fn reconnect(&mut self) -> bool {
        if !self.reconnect.enabled {
            return false;
        }
        info!("attempting to reconnect");
        self.connection_close();
        self.attempts = 0;
        match self.connect() {
            Ok(()) => true,
            Err(err) => {
                error!("reconnection failed: {err}");
                false
            }
        }
    }
}

/// Writes a whole frame to the non-blocking socket, with brief retries on
/// a full send buffer.
fn write_all_nonblocking(
    stream: &mut TcpStream,
    mut data: &[u8],
) -> Result<(), ClientNetworkError> {
    let mut retries = 0;
    while !data.is_empty() {
        match stream.write(data) {
            Ok(0) => return Err(ClientNetworkError::Closed),
            Ok(n) => data = &data[n..],
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                retries += 1;
                if retries > 5 {
                    return Err(ClientNetworkError::Io(err));
                }
                thread::sleep(Duration::from_millis(1));
            }
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(ClientNetworkError::Io(err)),
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address_parse_splits_host_and_port() {
        assert_eq!(
            server_address_parse("192.168.1.100:24800").unwrap(),
            ("192.168.1.100".to_string(), 24800)
        );
    }

    #[test]
    fn test_server_address_parse_keeps_ipv6_colons() {
        assert_eq!(
            server_address_parse("::1:24800").unwrap(),
            ("::1".to_string(), 24800)
        );
    }

    #[test]
    fn test_server_address_parse_rejects_missing_port() {
        assert!(matches!(
            server_address_parse("hostname"),
            Err(ClientNetworkError::Address(_))
        ));
        assert!(matches!(
            server_address_parse("host:notaport"),
            Err(ClientNetworkError::Address(_))
        ));
    }

    #[test]
    fn test_receive_without_connection_is_not_connected() {
        let mut network = ClientNetwork::new(
            "127.0.0.1",
            24800,
            ReconnectConfig::default(),
            1024,
            "2.1",
            None,
            None,
        );
        assert!(matches!(
            network.receive(),
            Err(ClientNetworkError::NotConnected)
        ));
        assert!(!network.is_connected());
    }

    #[test]
    fn test_connect_with_reconnect_disabled_makes_one_attempt() {
        let reconnect = ReconnectConfig {
            enabled: false,
            max_attempts: 5,
            delay_seconds: 0.0,
        };
        // Port 1 refuses immediately on loopback.
        let mut network =
            ClientNetwork::new("127.0.0.1", 1, reconnect, 1024, "2.1", None, None);
        let result = network.connect();
        assert!(matches!(
            result,
            Err(ClientNetworkError::ConnectFailed { attempts: 1, .. })
        ));
    }
}
