//! Capability traits for sequential video I/O.
//!
//! The processing loop only talks to these; `gstreamed_common` provides the
//! GStreamer-backed implementations.

use std::path::Path;

use image::RgbImage;

use crate::img_dimensions::ImgDimensions;

/// Properties of an opened input video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub dims: ImgDimensions,
    pub framerate: f64,
    /// Total number of frames, if the container reports enough to derive it.
    pub frame_count: Option<u64>,
}

/// Encoding parameters for an output video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSpec {
    pub dims: ImgDimensions,
    pub fps: u32,
}

/// Sequential reader of decoded RGB frames.
pub trait FrameSource {
    fn info(&self) -> SourceInfo;

    /// Next frame in presentation order, `None` at end of stream.
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>>;

    /// Stops decoding and releases the underlying resources.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Sequential writer of RGB frames into a video container.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()>;

    fn frames_written(&self) -> u64;

    /// Flushes and finalizes the container. The file is playable afterwards.
    fn finish(&mut self) -> anyhow::Result<()>;
}

/// On-screen preview of the annotated frames.
pub trait PreviewSurface {
    fn show(&mut self, frame: &RgbImage) -> anyhow::Result<()>;

    fn close(&mut self) -> anyhow::Result<()>;
}

/// Factory for sources, sinks and previews.
pub trait MediaBackend {
    fn open_source(&mut self, path: &Path) -> anyhow::Result<Box<dyn FrameSource>>;

    fn open_sink(&mut self, path: &Path, spec: SinkSpec) -> anyhow::Result<Box<dyn FrameSink>>;

    /// `Ok(None)` when running without a display.
    fn open_preview(
        &mut self,
        title: &str,
        dims: ImgDimensions,
    ) -> anyhow::Result<Option<Box<dyn PreviewSurface>>>;
}
