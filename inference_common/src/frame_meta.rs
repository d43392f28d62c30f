use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// Detections drawn on one output frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Zero-based index of the frame in the output video.
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}
