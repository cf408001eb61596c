//! Network surfaces for the waypoint sequencer

pub mod messages;
pub mod tcp_publisher;
pub mod tcp_receiver;
pub mod udp_receiver;
pub mod wire;

pub use messages::{ErrorKind, Request, Response, StatusReport, Telemetry};
pub use tcp_publisher::TcpPublisher;
pub use tcp_receiver::{CommandServer, TcpReceiver};
pub use udp_receiver::UdpStateReceiver;
pub use wire::{Serializer, WireFormat, create_serializer};
