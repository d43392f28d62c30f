use serde::{Deserialize, Serialize};

use crate::bbox::BBox;

/// Longest class-name prefix kept in an on-frame label.
pub const LABEL_CLASS_CHARS: usize = 10;

/// One object found in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_name: String,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32, class_name: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class_name: class_name.into(),
        }
    }

    /// Abbreviated label, e.g. `person-0.87`.
    pub fn label(&self) -> String {
        let class: String = self.class_name.chars().take(LABEL_CLASS_CHARS).collect();
        format!("{class}-{:.2}", self.confidence)
    }
}
