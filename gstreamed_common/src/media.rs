use std::path::Path;

use gstreamer as gst;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::media::{FrameSink, FrameSource, MediaBackend, PreviewSurface, SinkSpec};

use crate::discovery;
use crate::preview::GstPreview;
use crate::sink::GstFrameSink;
use crate::source::GstFrameSource;

/// GStreamer-backed [`MediaBackend`].
pub struct GstMedia {
    headless: bool,
}

impl GstMedia {
    /// Initializes GStreamer. With `headless`, no preview windows are opened.
    pub fn new(headless: bool) -> anyhow::Result<Self> {
        gst::init()?;
        Ok(Self { headless })
    }
}

impl MediaBackend for GstMedia {
    fn open_source(&mut self, path: &Path) -> anyhow::Result<Box<dyn FrameSource>> {
        log::debug!("Discovering media properties of {path:?}");
        let media = discovery::discover(path)?;
        log::debug!("{media:?}");
        Ok(Box::new(GstFrameSource::open(path, media)?))
    }

    fn open_sink(&mut self, path: &Path, spec: SinkSpec) -> anyhow::Result<Box<dyn FrameSink>> {
        Ok(Box::new(GstFrameSink::create(path, spec)?))
    }

    fn open_preview(
        &mut self,
        title: &str,
        dims: ImgDimensions,
    ) -> anyhow::Result<Option<Box<dyn PreviewSurface>>> {
        if self.headless {
            return Ok(None);
        }
        Ok(Some(Box::new(GstPreview::open(title, dims)?)))
    }
}
