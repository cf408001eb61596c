//! UDP intake for vehicle state samples.
//!
//! Receives length-prefixed [`VehicleState`] datagrams from the pose
//! estimator and hands them to the dispatcher. Samples that arrive while the
//! dispatcher queue is full are dropped; a newer sample will follow.
//!
//! # Wire Protocol
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ VehicleState payload     │
//! │ Big-endian u32   │ JSON or Postcard         │
//! └──────────────────┴──────────────────────────┘
//! ```

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::types::VehicleState;
use crate::dispatch::SequencerHandle;
use crate::error::Result;
use crate::streaming::wire::{Serializer, datagram_payload};

/// Maximum UDP datagram size
const MAX_DATAGRAM_SIZE: usize = 65536;

/// Read timeout so the loop can observe shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// UDP receiver for vehicle state samples
pub struct UdpStateReceiver {
    socket: UdpSocket,
    serializer: Serializer,
    sequencer: SequencerHandle,
    running: Arc<AtomicBool>,
}

impl UdpStateReceiver {
    /// Bind the intake socket.
    pub fn bind(
        bind_addr: &str,
        serializer: Serializer,
        sequencer: SequencerHandle,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        log::info!("UDP state intake bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            serializer,
            sequencer,
            running,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Run the receiver loop (blocking).
    pub fn run(self) {
        log::info!("UDP state receiver started");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut received = 0u64;
        let mut dropped = 0u64;

        while self.running.load(Ordering::Relaxed) {
            let (len, src) = match self.socket.recv_from(&mut buffer) {
                Ok(result) => result,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                    continue;
                }
            };

            let Some(payload) = datagram_payload(&buffer[..len]) else {
                continue;
            };

            let state: VehicleState = match self.serializer.deserialize(payload) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Failed to decode vehicle state from {}: {}", src, e);
                    continue;
                }
            };

            received += 1;
            if !self.sequencer.submit_state(state) {
                dropped += 1;
                if dropped % 100 == 1 {
                    log::warn!("Dropped {} vehicle samples so far", dropped);
                }
            }
        }

        log::info!(
            "UDP state receiver stopped ({} samples, {} dropped)",
            received,
            dropped
        );
    }
}
