//! Single-threaded dispatcher that owns the sequencer.
//!
//! Vehicle samples and command requests from every network thread are funneled
//! through one bounded channel into the dispatcher thread. The sequencer is
//! only ever touched from that thread, so list edits and arrival checks never
//! interleave.
//!
//! ```text
//! UDP intake ──try_send──┐
//!                        ├──▶ [SequencerEvent channel] ──▶ dispatcher ──▶ WaypointSequencer
//! TCP receivers ──send───┘                                    │
//!        ▲                                                    │
//!        └──────────────── Response (per-request channel) ◀───┘
//! ```
//!
//! Samples are offered with `try_send` and dropped when the channel is full;
//! a stale sample is worthless once a newer one exists. Requests block until
//! queued and then wait for their reply with a timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};

use crate::core::types::{VehicleState, Waypoint};
use crate::error::{Error, Result};
use crate::publish::PosePublisher;
use crate::sequencer::WaypointSequencer;
use crate::streaming::messages::{Request, Response, StatusReport};

/// Event queue depth shared by samples and requests.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How often the dispatcher checks the running flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Request with a reply channel.
pub struct RequestWithResponse {
    pub request: Request,
    pub response_tx: Sender<Response>,
}

impl std::fmt::Debug for RequestWithResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestWithResponse")
            .field("request", &self.request)
            .field("response_tx", &"...")
            .finish()
    }
}

/// Events serialized through the dispatcher.
#[derive(Debug)]
pub enum SequencerEvent {
    VehicleState(VehicleState),
    Request(RequestWithResponse),
}

/// Cloneable handle used by network threads to reach the dispatcher.
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    tx: Sender<SequencerEvent>,
}

impl SequencerHandle {
    /// Offer a vehicle sample; returns `false` if it was dropped.
    pub fn submit_state(&self, state: VehicleState) -> bool {
        match self.tx.try_send(SequencerEvent::VehicleState(state)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Event queue full, dropping vehicle sample");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Send a request and wait for its response.
    pub fn request(&self, request: Request, timeout: Duration) -> Result<Response> {
        let (response_tx, response_rx) = bounded(1);
        self.tx
            .send(SequencerEvent::Request(RequestWithResponse {
                request,
                response_tx,
            }))
            .map_err(|_| Error::ChannelClosed)?;

        response_rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => Error::Timeout,
            RecvTimeoutError::Disconnected => Error::ChannelClosed,
        })
    }
}

/// Create the event channel pair.
pub fn create_event_channel() -> (SequencerHandle, Receiver<SequencerEvent>) {
    let (tx, rx) = bounded(EVENT_CHANNEL_CAPACITY);
    (SequencerHandle { tx }, rx)
}

/// Dispatcher loop owning the sequencer.
pub struct DispatcherThread<P: PosePublisher> {
    sequencer: WaypointSequencer<P>,
    events: Receiver<SequencerEvent>,
    running: Arc<AtomicBool>,
    samples: u64,
    advances: u64,
}

impl<P: PosePublisher> DispatcherThread<P> {
    pub fn new(
        sequencer: WaypointSequencer<P>,
        events: Receiver<SequencerEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sequencer,
            events,
            running,
            samples: 0,
            advances: 0,
        }
    }

    /// Run until the running flag clears or every handle is dropped.
    ///
    /// Returns the sequencer so callers can inspect final state.
    pub fn run(mut self) -> WaypointSequencer<P> {
        log::info!("Dispatcher started");

        while self.running.load(Ordering::Relaxed) {
            match self.events.recv_timeout(POLL_INTERVAL) {
                Ok(event) => self.handle_event(event),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("All sequencer handles dropped");
                    break;
                }
            }
        }

        log::info!(
            "Dispatcher stopped ({} samples, {} waypoints reached)",
            self.samples,
            self.advances
        );
        self.sequencer
    }

    fn handle_event(&mut self, event: SequencerEvent) {
        match event {
            SequencerEvent::VehicleState(state) => {
                self.samples += 1;
                if self.sequencer.on_vehicle_state(&state) {
                    self.advances += 1;
                }
            }
            SequencerEvent::Request(RequestWithResponse {
                request,
                response_tx,
            }) => {
                log::debug!("Handling request: {:?}", request);
                let response = handle_request(&mut self.sequencer, request);
                if response_tx.send(response).is_err() {
                    log::warn!("Requester went away before response was sent");
                }
            }
        }
    }
}

/// Apply one request to the sequencer.
pub fn handle_request<P: PosePublisher>(
    sequencer: &mut WaypointSequencer<P>,
    request: Request,
) -> Response {
    let result = match request {
        Request::AddWaypoint {
            x,
            y,
            z,
            yaw,
            index,
        } => sequencer
            .add_waypoint(Waypoint::new(x, y, z, yaw), index)
            .map(waypoint_count),
        Request::RemoveWaypoint { index } => {
            sequencer.remove_waypoint(index).map(waypoint_count)
        }
        Request::SetWaypointsFromFile { path } => sequencer
            .set_waypoints_from_file(&path)
            .map(|()| waypoint_count(sequencer.len())),
        Request::ListWaypoints => Ok(Response::Waypoints {
            waypoints: sequencer.list_waypoints(),
        }),
        Request::Status => Ok(Response::Status(StatusReport::from(&sequencer.status()))),
    };
    result.unwrap_or_else(|e| Response::from_error(&e))
}

fn waypoint_count(count: usize) -> Response {
    Response::WaypointCount {
        count: count as u32,
    }
}
