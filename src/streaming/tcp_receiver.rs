//! TCP command server for waypoint list operations
//!
//! Each connected client gets a [`TcpReceiver`] thread. Requests are forwarded
//! to the dispatcher and answered on the same connection in order.
//!
//! # Wire Format
//!
//! ```text
//! client ──▶ [len][Request]  ──▶ daemon
//! client ◀── [len][Response] ◀── daemon
//! ```
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to the command port
//! 2. Server spawns a TcpReceiver thread for this client
//! 3. Receiver loop answers requests until disconnect or shutdown
//! ```
//!
//! Unlike telemetry, any number of command clients may be connected; the
//! dispatcher serializes their requests.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::dispatch::SequencerHandle;
use crate::error::{Error, Result};
use crate::streaming::messages::{Request, Response};
use crate::streaming::wire::{Serializer, read_frame, write_frame};

/// Initial capacity for request read buffer (typical request size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Read timeout so receivers can observe shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a receiver waits for the dispatcher to answer
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Handles requests from one connected client
pub struct TcpReceiver {
    serializer: Serializer,
    sequencer: SequencerHandle,
    /// Global running flag (daemon shutdown)
    running: Arc<AtomicBool>,
    /// Reusable buffer for request payloads
    read_buffer: Vec<u8>,
    /// Reusable buffer for response frames
    write_buffer: Vec<u8>,
}

impl TcpReceiver {
    pub fn new(
        serializer: Serializer,
        sequencer: SequencerHandle,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            serializer,
            sequencer,
            running,
            read_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
            write_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Run the receiver loop for a connected client
    pub fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            log::warn!("Failed to set read timeout: {}", e);
        }

        while self.running.load(Ordering::Relaxed) {
            match read_frame(&mut stream, &mut self.read_buffer) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(Error::Io(ref io_err))
                    if io_err.kind() == std::io::ErrorKind::UnexpectedEof
                        || io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    log::debug!("Client closed connection");
                    return Ok(());
                }
                Err(e) => {
                    let _ = stream.shutdown(std::net::Shutdown::Both);
                    return Err(e);
                }
            }

            let response = match self.serializer.deserialize::<Request>(&self.read_buffer) {
                Ok(request) => {
                    log::info!("Received request: {:?}", request);
                    self.dispatch(request)
                }
                Err(e) => {
                    // Malformed payload: report it, keep the connection
                    log::warn!("Failed to decode request: {}", e);
                    Response::from_error(&e)
                }
            };

            self.serializer
                .encode_frame(&response, &mut self.write_buffer)?;
            write_frame(&mut stream, &self.write_buffer)?;
        }

        let _ = stream.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    fn dispatch(&self, request: Request) -> Response {
        match self.sequencer.request(request, REQUEST_TIMEOUT) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Sequencer did not answer: {}", e);
                Response::from_error(&e)
            }
        }
    }
}

/// Accepts command connections and spawns a receiver per client
pub struct CommandServer {
    listener: TcpListener,
    serializer: Serializer,
    sequencer: SequencerHandle,
    running: Arc<AtomicBool>,
}

impl CommandServer {
    /// Bind the command listener (non-blocking accept).
    pub fn bind(
        bind_addr: &str,
        serializer: Serializer,
        sequencer: SequencerHandle,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_addr, e)))?;
        listener.set_nonblocking(true)?;
        log::info!("Command server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            serializer,
            sequencer,
            running,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop; returns when the running flag clears.
    pub fn run(self) {
        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.spawn_receiver(stream, addr),
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No connection pending
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }
        log::info!("Command server stopped");
    }

    fn spawn_receiver(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            log::error!("Failed to set socket to blocking mode: {}", e);
            return;
        }

        let mut receiver = TcpReceiver::new(
            self.serializer,
            self.sequencer.clone(),
            Arc::clone(&self.running),
        );
        let spawned = thread::Builder::new()
            .name("tcp-receiver".to_string())
            .spawn(move || {
                log::info!("Command client connected: {}", addr);
                if let Err(e) = receiver.run(stream) {
                    log::error!("TCP receiver error: {}", e);
                }
                log::info!("Command client disconnected: {}", addr);
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn receiver for {}: {}", addr, e);
        }
    }
}
