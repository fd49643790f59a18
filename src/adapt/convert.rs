use anyhow::{anyhow, Result};

use crate::frame::PixelFormat;

/// Convert a packed frame of `format` into tightly packed RGB24.
pub(crate) fn convert_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let expected = format
        .frame_len(width, height)
        .ok_or_else(|| anyhow!("{:?} frame dimensions overflow", format))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }

    match format {
        PixelFormat::Rgb24 => Ok(pixels.to_vec()),
        PixelFormat::Bgr24 => Ok(bgr_to_rgb(pixels)),
    }
}

fn bgr_to_rgb(pixels: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len());
    for px in pixels.chunks_exact(3) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    rgb
}
