use std::path::PathBuf;
use std::time::Duration;

use inference_common::annotate::DEFAULT_CONFIDENCE_THRESHOLD;
use inference_common::img_dimensions::ImgDimensions;

/// Extensions picked up from the input directory, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Settings for processing one video.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Directory receiving `<stem><suffix>.mp4` (created if missing).
    pub output_dir: PathBuf,
    pub output_suffix: String,
    /// Frames are scaled to fit inside this bound, keeping their aspect ratio.
    pub max_dims: ImgDimensions,
    pub output_fps: u32,
    /// Detections must score strictly above this to be drawn.
    pub confidence_threshold: f32,
    pub window_title: String,
    /// Also write `<stem><suffix>.json` with the drawn detections.
    pub save_meta: bool,
}

impl ProcessConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            output_suffix: "_tested".to_string(),
            max_dims: ImgDimensions::new(640, 480),
            output_fps: 30,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            window_title: "Video Processing".to_string(),
            save_meta: false,
        }
    }

    /// Output video path for an input named `stem`.
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}{}.mp4", self.output_suffix))
    }

    pub fn meta_path(&self, stem: &str) -> PathBuf {
        self.output_path(stem).with_extension("json")
    }
}

/// Settings for walking the input directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub extensions: Vec<String>,
    /// Sleep between two videos.
    pub pause: Duration,
}

impl BatchConfig {
    pub fn new(input_dir: PathBuf) -> Self {
        Self {
            input_dir,
            extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            pause: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let config = ProcessConfig::new(PathBuf::from("out"));
        assert_eq!(config.output_path("clip"), PathBuf::from("out/clip_tested.mp4"));
        assert_eq!(config.meta_path("clip"), PathBuf::from("out/clip_tested.json"));
    }

    #[test]
    fn test_output_path_keeps_dotted_stem() {
        let config = ProcessConfig::new(PathBuf::from("out"));
        assert_eq!(
            config.output_path("day.1"),
            PathBuf::from("out/day.1_tested.mp4")
        );
    }
}
