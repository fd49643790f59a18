//! Still-image frame sets for the single-shot benchmark mode.
//!
//! One image per camera, named `<index>-<position>.jpg`, decoded in-memory to
//! RGB24. A file that is missing or cannot be decoded becomes an empty frame,
//! which the adapter reports as a missing camera.

use std::path::Path;

use anyhow::{Context, Result};
use image::GenericImageView;

use crate::frame::{FrameSet, PixelFormat, RawFrame};

/// Still-image file names, in engine camera order.
pub const STILL_IMAGE_NAMES: [&str; 6] = [
    "0-FRONT.jpg",
    "1-FRONT_RIGHT.jpg",
    "2-FRONT_LEFT.jpg",
    "3-BACK.jpg",
    "4-BACK_LEFT.jpg",
    "5-BACK_RIGHT.jpg",
];

/// Load one frame set from the still images in `dir`.
pub fn load_still_frame_set(dir: impl AsRef<Path>) -> FrameSet {
    let dir = dir.as_ref();
    let frames = STILL_IMAGE_NAMES
        .iter()
        .map(|name| {
            let path = dir.join(name);
            match decode_image(&path) {
                Ok(frame) => {
                    log::info!("loaded image {}", path.display());
                    frame
                }
                Err(e) => {
                    log::warn!("{:#}", e);
                    RawFrame::empty()
                }
            }
        })
        .collect();
    FrameSet::new(frames, 0)
}

fn decode_image(path: &Path) -> Result<RawFrame> {
    let image =
        image::open(path).with_context(|| format!("failed to load image {}", path.display()))?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok(RawFrame::new(rgb.into_raw(), width, height, PixelFormat::Rgb24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_images_become_empty_frames() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let image = image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]));
        image.save(dir.path().join("0-FRONT.jpg"))?;

        let set = load_still_frame_set(dir.path());
        assert_eq!(set.len(), 6);
        assert!(!set.frames()[0].is_empty());
        assert_eq!(set.frames()[0].width, 4);
        assert_eq!(set.frames()[0].format, PixelFormat::Rgb24);
        assert!(set.frames()[1..].iter().all(|f| f.is_empty()));
        Ok(())
    }
}
