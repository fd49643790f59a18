//! Detection transport.
//!
//! Serializes each frame set's detections into the line-oriented wire format
//! and sends them as a single UDP datagram to a configured endpoint.

mod udp;
pub mod wire;

pub use udp::{BroadcastStats, DetectionBroadcaster};
pub use wire::{decode_detections, encode_detections};
