use std::path::Path;

use anyhow::Context;
use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use image::RgbImage;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::media::{FrameSource, SourceInfo};

use crate::discovery::MediaInfo;
use crate::pipeline;

const PREROLL_TIMEOUT_SECS: u64 = 10;

// Bounded appsink queue: decoding stalls instead of buffering the whole file.
const SOURCE_PIPELINE: &str = "filesrc name=src ! decodebin ! videoconvert ! \
     video/x-raw,format=RGB ! appsink name=sink sync=false max-buffers=4";

/// Decodes a video file into RGB frames, one pull at a time.
pub struct GstFrameSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    info: SourceInfo,
    closed: bool,
}

impl GstFrameSource {
    /// Builds and prerolls the decode pipeline. Unreadable or undecodable
    /// files fail here.
    pub fn open(path: &Path, media: MediaInfo) -> anyhow::Result<Self> {
        let pipeline = pipeline::launch(SOURCE_PIPELINE)?;
        let location = path.to_string_lossy();
        pipeline::element(&pipeline, "src")?.set_property("location", &*location);
        let appsink = pipeline::app_sink(&pipeline, "sink")?;

        pipeline::preroll(&pipeline, gst::ClockTime::from_seconds(PREROLL_TIMEOUT_SECS))
            .with_context(|| format!("opening {}", path.display()))?;
        pipeline::play(&pipeline)
            .with_context(|| format!("starting decode of {}", path.display()))?;

        Ok(Self {
            pipeline,
            appsink,
            info: SourceInfo {
                dims: ImgDimensions::new(media.width, media.height),
                framerate: media.framerate,
                frame_count: media.frame_count(),
            },
            closed: false,
        })
    }
}

impl FrameSource for GstFrameSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        match self.appsink.pull_sample() {
            Ok(sample) => pipeline::sample_to_image(&sample).map(Some),
            Err(_) if self.appsink.is_eos() => Ok(None),
            Err(err) => Err(pipeline::pop_error(&self.pipeline)
                .unwrap_or_else(|| anyhow::Error::new(err).context("pulling decoded frame"))),
        }
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pipeline
            .set_state(gst::State::Null)
            .context("stopping decode pipeline")?;
        Ok(())
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("{err:#}");
        }
    }
}
