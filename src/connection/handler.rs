//! Connection Handler
//!
//! Each client gets its own handler task that runs in a loop, reading one
//! request frame at a time and writing back its reply.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  Read until a frame is whole │◄──┐
//!    │  Decode request              │   │
//!    │  Execute command             │   │
//!    │  Write reply                 │───┘
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / malformed frame / I/O error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream, so a frame may arrive over several reads. Bytes
//! accumulate in a `BytesMut` until the parser reports a complete frame.
//! The buffer is capped at `max_frame_size`; a client that exceeds it is
//! disconnected rather than buffered without bound.

use crate::commands::CommandHandler;
use crate::protocol::{ParseError, Reply, Request, RespParser};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Default cap on the bytes buffered for a single frame (64 KB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections closed because of a malformed frame
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the stream so the same loop runs on a `TcpStream` or on a
/// scripted mock in tests.
pub struct ConnectionHandler<S> {
    /// The client stream, buffered for writes
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet parsed
    buffer: BytesMut,

    /// Largest frame we are willing to buffer
    max_frame_size: usize,

    /// The command handler (shares the storage engine)
    command_handler: CommandHandler,

    parser: RespParser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    /// * `max_frame_size` - Cap on bytes buffered for one frame
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        max_frame_size: usize,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE.min(max_frame_size)),
            max_frame_size,
            command_handler,
            parser: RespParser::with_max_bulk_size(max_frame_size),
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Reads requests, executes them, and sends back replies until the
    /// client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Closing connection"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-execute-respond loop. One request is in flight at a time.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(request) = self.try_parse_request()? {
                let reply = self.command_handler.execute(&request);
                self.stats.command_processed();
                trace!(client = %self.addr, reply = %reply, "Executed command");

                self.send_reply(&reply).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Attempts to parse one request from the front of the buffer.
    fn try_parse_request(&mut self) -> Result<Option<Request>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((request, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    command = %request.command_name(),
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request"
                );
                Ok(Some(request))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete frame, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                // No reply is defined for garbage; the caller closes the socket
                self.stats.protocol_error();
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_frame_size {
            return Err(ConnectionError::FrameTooLarge {
                size: self.buffer.len(),
                max: self.max_frame_size,
            });
        }

        // Never read past the frame cap
        let room = self.max_frame_size - self.buffer.len();
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE.min(room));
        }

        let n = self
            .stream
            .get_mut()
            .take(room as u64)
            .read_buf(&mut self.buffer)
            .await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a reply to the client.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed request frame
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected between requests
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client disconnected in the middle of a frame
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// A single frame outgrew the buffer cap
    #[error("Frame too large: {size} bytes buffered (max: {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Handles a client connection.
///
/// Creates a ConnectionHandler and runs it to completion. Errors only ever
/// end this connection.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    max_frame_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, max_frame_size);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}
