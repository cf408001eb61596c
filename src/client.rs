//! Blocking clients for the MargaNav daemon.
//!
//! - [`SequencerClient`]: request/response on the command port
//! - [`TelemetrySubscriber`]: latched target and relative pose stream
//! - [`StateSender`]: pushes vehicle state datagrams to the intake port

use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::core::types::{VehicleState, Waypoint};
use crate::error::{Error, Result};
use crate::sequencer::InsertPosition;
use crate::streaming::messages::{Request, Response, StatusReport, Telemetry};
use crate::streaming::wire::{Serializer, read_frame, write_frame};

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Config(format!("Invalid address: {}", addr)))
}

/// Command port client
pub struct SequencerClient {
    stream: TcpStream,
    serializer: Serializer,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
}

impl SequencerClient {
    /// Connect with timeout; the same timeout bounds each reply.
    pub fn connect(addr: &str, serializer: Serializer, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&resolve(addr)?, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            serializer,
            read_buffer: Vec::with_capacity(256),
            write_buffer: Vec::with_capacity(256),
        })
    }

    /// Send one request and wait for its response.
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        self.serializer.encode_frame(request, &mut self.write_buffer)?;
        write_frame(&mut self.stream, &self.write_buffer)?;

        if !read_frame(&mut self.stream, &mut self.read_buffer)? {
            return Err(Error::Timeout);
        }
        self.serializer.deserialize(&self.read_buffer)
    }

    /// Insert a waypoint at `index` (`-1` appends). Returns the new length.
    pub fn add_waypoint(&mut self, waypoint: Waypoint, index: i64) -> Result<usize> {
        let response = self.request(&Request::AddWaypoint {
            x: waypoint.x,
            y: waypoint.y,
            z: waypoint.altitude,
            yaw: waypoint.yaw,
            index,
        })?;
        expect_count(response)
    }

    /// Append a waypoint. Returns the new length.
    pub fn append_waypoint(&mut self, waypoint: Waypoint) -> Result<usize> {
        self.add_waypoint(waypoint, InsertPosition::APPEND_SENTINEL)
    }

    /// Remove the waypoint at `index`. Returns the new length.
    pub fn remove_waypoint(&mut self, index: i64) -> Result<usize> {
        let response = self.request(&Request::RemoveWaypoint { index })?;
        expect_count(response)
    }

    pub fn set_waypoints_from_file(&mut self, path: &str) -> Result<usize> {
        let response = self.request(&Request::SetWaypointsFromFile {
            path: path.to_string(),
        })?;
        expect_count(response)
    }

    pub fn list_waypoints(&mut self) -> Result<Vec<Waypoint>> {
        match self.request(&Request::ListWaypoints)? {
            Response::Waypoints { waypoints } => Ok(waypoints),
            other => Err(unexpected(other)),
        }
    }

    pub fn status(&mut self) -> Result<StatusReport> {
        match self.request(&Request::Status)? {
            Response::Status(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }
}

fn expect_count(response: Response) -> Result<usize> {
    match response {
        Response::WaypointCount { count } => Ok(count as usize),
        other => Err(unexpected(other)),
    }
}

fn unexpected(response: Response) -> Error {
    match response {
        Response::Error { kind, message } => Error::Rejected { kind, message },
        other => Error::Other(format!("Unexpected response: {:?}", other)),
    }
}

/// Telemetry stream reader
pub struct TelemetrySubscriber {
    stream: TcpStream,
    serializer: Serializer,
    buffer: Vec<u8>,
}

impl TelemetrySubscriber {
    pub fn connect(addr: &str, serializer: Serializer, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&resolve(addr)?, timeout)?;
        stream.set_read_timeout(Some(timeout))?;

        Ok(Self {
            stream,
            serializer,
            buffer: Vec::with_capacity(256),
        })
    }

    /// Next telemetry message, or `None` if the read timed out.
    pub fn recv(&mut self) -> Result<Option<Telemetry>> {
        if !read_frame(&mut self.stream, &mut self.buffer)? {
            return Ok(None);
        }
        self.serializer.deserialize(&self.buffer).map(Some)
    }
}

/// Vehicle state datagram sender
pub struct StateSender {
    socket: UdpSocket,
    target: SocketAddr,
    serializer: Serializer,
    buffer: Vec<u8>,
}

impl StateSender {
    pub fn new(target: &str, serializer: Serializer) -> Result<Self> {
        let target = resolve(target)?;
        let bind = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind)?;

        Ok(Self {
            socket,
            target,
            serializer,
            buffer: Vec::with_capacity(128),
        })
    }

    pub fn send(&mut self, state: &VehicleState) -> Result<()> {
        self.serializer.encode_frame(state, &mut self.buffer)?;
        self.socket.send_to(&self.buffer, self.target)?;
        Ok(())
    }
}
