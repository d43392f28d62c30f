use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::frame_meta::FrameMeta;

/// Metadata corresponding to a processed video.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VideoMeta {
    /// Path to original input video file.
    pub input_file: PathBuf,
    /// Path to output video file, with inference overlays.
    pub output_file: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Per-frame detections; frames without any are omitted.
    pub frames: Vec<FrameMeta>,
}

impl VideoMeta {
    pub fn new(input_file: PathBuf, output_file: PathBuf, width: u32, height: u32) -> Self {
        Self {
            input_file,
            output_file,
            width,
            height,
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: FrameMeta) {
        self.frames.push(frame);
    }

    pub fn detection_count(&self) -> usize {
        self.frames.iter().map(|f| f.detections.len()).sum()
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::detection::Detection;

    #[test]
    fn test_write_json_roundtrip() {
        let mut meta = VideoMeta::new("in.mp4".into(), "in_tested.mp4".into(), 640, 360);
        meta.push(FrameMeta {
            frame_index: 1,
            detections: vec![Detection::new(BBox::new(10.0, 10.0, 50.0, 50.0), 0.9, "car")],
        });
        let path = std::env::temp_dir().join(format!("video_meta_{}.json", std::process::id()));
        meta.write_json(&path).unwrap();

        let loaded: VideoMeta =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(loaded.detection_count(), 1);

        std::fs::remove_file(&path).ok();
    }
}
