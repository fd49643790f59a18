//! Detection persistence for benchmark runs.

use std::path::Path;

use anyhow::{Context, Result};

use crate::engine::Detection;
use crate::transport::encode_detections;

/// Write `detections` to `path` in the wire encoding, creating parent
/// directories. Failures are logged; returns whether the file was written.
pub fn save_detections(path: impl AsRef<Path>, detections: &[Detection]) -> bool {
    let path = path.as_ref();
    match write_detections(path, detections) {
        Ok(()) => {
            log::info!("saved {} detections to {}", detections.len(), path.display());
            true
        }
        Err(e) => {
            log::error!("{:#}", e);
            false
        }
    }
}

fn write_detections(path: &Path, detections: &[Detection]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, encode_detections(detections))
        .with_context(|| format!("failed to write results to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::decode_detections;

    #[test]
    fn writes_wire_encoding_and_creates_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model").join("resnet18").join("result.txt");
        let detection = Detection {
            class_id: 4,
            confidence: 0.5,
            ..Detection::default()
        };

        assert!(save_detections(&path, &[detection, detection]));
        let saved = std::fs::read(&path)?;
        assert_eq!(decode_detections(&saved)?.len(), 2);
        Ok(())
    }

    #[test]
    fn unwritable_path_is_reported_not_raised() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x")?;
        assert!(!save_detections(blocker.join("result.txt"), &[]));
        Ok(())
    }
}
