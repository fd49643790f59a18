use serde::{Deserialize, Serialize};

/// Object centre in the engine's output frame of reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Extents of the object's bounding volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f32,
    pub length: f32,
    pub height: f32,
}

/// Planar velocity estimate. Zero when the engine does not estimate motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

/// One object perceived in a frame set.
///
/// `class_id` and `confidence` are passed through as the engine reports them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub position: Position,
    pub size: BoxSize,
    pub velocity: Velocity,
    /// Rotation about the vertical axis, radians.
    pub heading: f32,
    pub class_id: i32,
    pub confidence: f32,
}
