//! Two-peer message channel
//!
//! TCP carrying one JSON object per line. The transport moves frames and
//! never looks inside them; decoding is up to the receiver.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

/// Frames longer than this are skipped up to the next newline without being
/// buffered
pub const MAX_FRAME_BYTES: usize = 4096;

#[derive(Debug)]
pub enum TransportError {
    /// Peer identifier is not `host:port`
    InvalidPeerId(String),
    Unreachable(String, std::io::Error),
    Timeout(String),
    Bind(String, std::io::Error),
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::InvalidPeerId(id) => {
                write!(f, "invalid peer id {id:?}: expected host:port")
            }
            TransportError::Unreachable(id, e) => write!(f, "peer {id} unreachable: {e}"),
            TransportError::Timeout(id) => write!(f, "timed out connecting to {id}"),
            TransportError::Bind(addr, e) => write!(f, "failed to listen on {addr}: {e}"),
            TransportError::Io(e) => write!(f, "connection error: {e}"),
            TransportError::Encode(e) => write!(f, "failed to encode message: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Unreachable(_, e) | TransportError::Bind(_, e) | TransportError::Io(e) => {
                Some(e)
            }
            TransportError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// An open channel to the other peer
#[derive(Debug)]
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    /// Bytes of the frame being read, kept across cancelled reads
    partial: Vec<u8>,
    /// Bytes skipped so far of an oversized frame
    skipped: Option<usize>,
}

/// Outcome of reading up to the next newline
enum LineRead {
    Frame(Vec<u8>),
    Oversized(usize),
    Eof,
}

impl Connection {
    fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (read, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer,
            peer,
            partial: Vec::new(),
            skipped: None,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send one message; there is no acknowledgement
    pub async fn send<M: Serialize>(&mut self, message: &M) -> Result<(), TransportError> {
        let mut frame = serde_json::to_string(message).map_err(TransportError::Encode)?;
        frame.push('\n');
        self.writer.write_all(frame.as_bytes()).await?;
        Ok(())
    }

    /// Next raw frame, or `None` once the peer has closed
    ///
    /// Blank, oversized and non-UTF-8 frames are dropped here; only I/O
    /// failures come back as errors. Cancel safe, so it can sit in a
    /// `select!` next to a tick timer.
    pub async fn recv_frame(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let bytes = match self.read_line().await? {
                LineRead::Eof => return Ok(None),
                LineRead::Oversized(len) => {
                    log::warn!("Dropping {len}-byte frame from {}", self.peer);
                    continue;
                }
                LineRead::Frame(bytes) => bytes,
            };
            let Ok(line) = String::from_utf8(bytes) else {
                log::debug!("Dropping non-UTF-8 frame from {}", self.peer);
                continue;
            };
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Read through the next newline, holding at most `MAX_FRAME_BYTES`
    ///
    /// Progress lives in `partial`/`skipped`, and the only await is
    /// `fill_buf`, so dropping this future loses nothing.
    async fn read_line(&mut self) -> std::io::Result<LineRead> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if let Some(len) = self.skipped.take() {
                    return Ok(LineRead::Oversized(len));
                }
                if self.partial.is_empty() {
                    return Ok(LineRead::Eof);
                }
                return Ok(LineRead::Frame(std::mem::take(&mut self.partial)));
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];
            if let Some(len) = self.skipped.as_mut() {
                *len += chunk.len();
            } else if self.partial.len() + chunk.len() > MAX_FRAME_BYTES {
                self.skipped = Some(self.partial.len() + chunk.len());
                self.partial = Vec::new();
            } else {
                self.partial.extend_from_slice(chunk);
            }
            let used = newline.map_or(available.len(), |i| i + 1);
            self.reader.consume(used);

            if newline.is_some() {
                if let Some(len) = self.skipped.take() {
                    return Ok(LineRead::Oversized(len));
                }
                return Ok(LineRead::Frame(std::mem::take(&mut self.partial)));
            }
        }
    }

    /// Flush and close the sending side
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            log::debug!("Shutdown of connection to {} failed: {e}", self.peer);
        }
    }
}

/// Check that `peer_id` looks like `host:port`
pub fn validate_peer_id(peer_id: &str) -> Result<(), TransportError> {
    let invalid = || TransportError::InvalidPeerId(peer_id.to_string());
    let (host, port) = peer_id.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid());
    }
    port.parse::<u16>().map_err(|_| invalid())?;
    Ok(())
}

/// Controller side: open a connection to the host named by `peer_id`
pub async fn connect(peer_id: &str, timeout: Duration) -> Result<Connection, TransportError> {
    validate_peer_id(peer_id)?;
    let stream = tokio::time::timeout(timeout, TcpStream::connect(peer_id))
        .await
        .map_err(|_| TransportError::Timeout(peer_id.to_string()))?
        .map_err(|e| TransportError::Unreachable(peer_id.to_string(), e))?;
    let conn = Connection::from_stream(stream)?;
    log::info!("Connected to host {}", conn.peer);
    Ok(conn)
}

/// Host side: accepts controller connections
#[derive(Debug)]
pub struct HostListener {
    listener: TcpListener,
    local: SocketAddr,
}

impl HostListener {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Bind(addr.to_string(), e))?;
        let local = listener.local_addr()?;
        log::info!("Listening for a controller on {local}");
        Ok(Self { listener, local })
    }

    /// Identifier a controller passes to [`connect`]
    pub fn session_id(&self) -> String {
        self.local.to_string()
    }

    /// Wait for the next incoming connection (cancel safe)
    pub async fn accept(&self) -> Result<Connection, TransportError> {
        let (stream, _) = self.listener.accept().await?;
        Connection::from_stream(stream)
    }
}
