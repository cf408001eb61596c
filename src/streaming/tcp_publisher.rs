//! Latched telemetry publisher over TCP.
//!
//! A dedicated thread owns the listener and the client list. It subscribes
//! to both latched topics once; every publish is broadcast to all clients.
//! A newly accepted client is first sent the last target and relative pose
//! this thread broadcast, so late joiners never wait for the next advance.
//!
//! Client sockets carry a write timeout. A subscriber that stops reading is
//! dropped once its socket buffer fills, and never stalls the others.
//!
//! Frame format: `[4-byte length (big-endian)][Telemetry payload]`

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::types::{RelativePose, TargetCommand};
use crate::error::Result;
use crate::publish::{Subscription, Topics};
use crate::streaming::messages::Telemetry;
use crate::streaming::wire::Serializer;

/// Max messages drained per topic per iteration
const BATCH_LIMIT: usize = 50;

/// Idle sleep when nothing was published
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Longest a single client write may block the publisher thread
const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Telemetry publisher streaming latched topics to TCP subscribers
pub struct TcpPublisher {
    local_addr: SocketAddr,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    client_count: Arc<AtomicUsize>,
}

impl TcpPublisher {
    /// Bind the listener and spawn the publisher thread.
    pub fn start(bind_address: &str, serializer: Serializer, topics: Arc<Topics>) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        // Subscribe before the thread starts so nothing published in between is lost
        let target_rx = topics.target.subscribe();
        let pose_rx = topics.relative_pose.subscribe();

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);
        let client_count = Arc::new(AtomicUsize::new(0));
        let client_count_clone = Arc::clone(&client_count);

        let publisher_thread = thread::Builder::new()
            .name("tcp-publisher".to_string())
            .spawn(move || {
                let mut worker = PublisherLoop {
                    listener,
                    serializer,
                    target_rx,
                    pose_rx,
                    last_target: None,
                    last_pose: None,
                    clients: Vec::new(),
                    client_count: client_count_clone,
                    buffer: Vec::with_capacity(256),
                    published: 0,
                };
                worker.run(&shutdown_clone);
            })?;

        log::info!("Telemetry publisher listening on {}", local_addr);

        Ok(Self {
            local_addr,
            publisher_thread: Some(publisher_thread),
            shutdown,
            client_count,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connected telemetry clients
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// Stop the publisher
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.stop();

        if let Some(thread) = self.publisher_thread.take() {
            let _ = thread.join();
        }
    }
}

struct PublisherLoop {
    listener: TcpListener,
    serializer: Serializer,
    target_rx: Subscription<TargetCommand>,
    pose_rx: Subscription<RelativePose>,
    /// Last values broadcast, replayed to new clients
    last_target: Option<TargetCommand>,
    last_pose: Option<RelativePose>,
    clients: Vec<TcpStream>,
    client_count: Arc<AtomicUsize>,
    buffer: Vec<u8>,
    published: u64,
}

impl PublisherLoop {
    fn run(&mut self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            let mut sent = 0;
            for _ in 0..BATCH_LIMIT {
                let Some(command) = self.target_rx.try_recv() else {
                    break;
                };
                self.last_target = Some(command);
                self.broadcast(&Telemetry::Target(command));
                sent += 1;
            }
            for _ in 0..BATCH_LIMIT {
                let Some(pose) = self.pose_rx.try_recv() else {
                    break;
                };
                self.last_pose = Some(pose);
                self.broadcast(&Telemetry::RelativePose(pose));
                sent += 1;
            }

            // Replay comes from the values drained above; anything still
            // queued is newer and reaches the new client exactly once
            self.accept_clients();

            if sent == 0 {
                thread::sleep(IDLE_SLEEP);
            }
        }

        log::info!(
            "Telemetry publisher stopped ({} messages published)",
            self.published
        );
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream
                        .set_nonblocking(false)
                        .and_then(|()| stream.set_write_timeout(Some(CLIENT_WRITE_TIMEOUT)))
                    {
                        log::warn!("Failed to configure telemetry client {}: {}", addr, e);
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    self.admit(stream, addr);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    log::error!("Error accepting telemetry client: {}", e);
                    return;
                }
            }
        }
    }

    /// Send latched values to a new client, then add it to the broadcast list.
    fn admit(&mut self, mut stream: TcpStream, addr: SocketAddr) {
        let mut latched = Vec::with_capacity(2);
        if let Some(command) = self.last_target {
            latched.push(Telemetry::Target(command));
        }
        if let Some(pose) = self.last_pose {
            latched.push(Telemetry::RelativePose(pose));
        }

        for message in &latched {
            if let Err(e) = self.serializer.encode_frame(message, &mut self.buffer) {
                log::error!("Failed to encode latched {}: {}", message.topic(), e);
                continue;
            }
            if let Err(e) = stream.write_all(&self.buffer) {
                log::debug!("Client {} dropped during latch replay: {}", addr, e);
                return;
            }
        }

        log::info!(
            "Telemetry client connected: {} ({} latched messages replayed)",
            addr,
            latched.len()
        );
        self.clients.push(stream);
        self.client_count.store(self.clients.len(), Ordering::Relaxed);
    }

    fn broadcast(&mut self, message: &Telemetry) {
        if let Err(e) = self.serializer.encode_frame(message, &mut self.buffer) {
            log::error!("Failed to encode {}: {}", message.topic(), e);
            return;
        }
        self.published += 1;

        // A timed-out write may leave a partial frame; the client is dropped
        let buffer = &self.buffer;
        self.clients.retain_mut(|client| match client.write_all(buffer) {
            Ok(_) => true,
            Err(e) => {
                if let Ok(addr) = client.peer_addr() {
                    log::info!("Telemetry client {} dropped: {}", addr, e);
                }
                false
            }
        });
        self.client_count.store(self.clients.len(), Ordering::Relaxed);
    }
}
