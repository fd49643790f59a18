//! Detection broadcast wire format.
//!
//! One datagram per frame set; UTF-8 text, one line per detection:
//!
//! ```text
//! x y z width length height heading class_id confidence\n
//! ```
//!
//! No length prefix, checksum or version. An empty payload means the frame
//! set produced no detections. Velocity is not carried on the wire.

use std::fmt::Write as _;

use anyhow::{anyhow, Result};

use crate::engine::{BoxSize, Detection, Position, Velocity};

/// Number of space-separated fields per line.
pub const FIELDS_PER_LINE: usize = 9;

/// Serialize detections into one datagram payload.
pub fn encode_detections(detections: &[Detection]) -> String {
    let mut out = String::with_capacity(detections.len() * 64);
    for d in detections {
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {} {} {}",
            d.position.x,
            d.position.y,
            d.position.z,
            d.size.width,
            d.size.length,
            d.size.height,
            d.heading,
            d.class_id,
            d.confidence
        );
    }
    out
}

/// Parse a datagram payload back into detections.
///
/// Blank lines and surrounding whitespace are ignored. Velocity is always
/// zero in the result.
pub fn decode_detections(payload: &[u8]) -> Result<Vec<Detection>> {
    let text =
        std::str::from_utf8(payload).map_err(|e| anyhow!("payload is not UTF-8: {}", e))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| decode_line(line).map_err(|e| anyhow!("line {}: {}", index + 1, e)))
        .collect()
}

fn decode_line(line: &str) -> Result<Detection> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != FIELDS_PER_LINE {
        return Err(anyhow!(
            "expected {} fields, found {}",
            FIELDS_PER_LINE,
            fields.len()
        ));
    }
    let float = |i: usize| -> Result<f32> {
        fields[i]
            .parse::<f32>()
            .map_err(|e| anyhow!("field {} ('{}'): {}", i + 1, fields[i], e))
    };
    let class_id = fields[7]
        .parse::<i32>()
        .map_err(|e| anyhow!("class id ('{}'): {}", fields[7], e))?;

    Ok(Detection {
        position: Position {
            x: float(0)?,
            y: float(1)?,
            z: float(2)?,
        },
        size: BoxSize {
            width: float(3)?,
            length: float(4)?,
            height: float(5)?,
        },
        velocity: Velocity::default(),
        heading: float(6)?,
        class_id,
        confidence: float(8)?,
    })
}
