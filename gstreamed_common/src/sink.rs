use std::path::Path;

use anyhow::Context;
use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use inference_common::media::{FrameSink, SinkSpec};

use crate::pipeline;

/// Upper bound on how long the muxer may take to flush after end-of-stream.
const FINALIZE_TIMEOUT_SECS: u64 = 30;

// MPEG-4 Part 2 video ("mp4v") in an MP4 container.
const SINK_PIPELINE: &str = "appsrc name=src format=time block=true ! videoconvert ! \
     avenc_mpeg4 bitrate=2000000 ! mp4mux ! filesink name=out";

/// Encodes RGB frames into an `.mp4` file at a fixed framerate.
pub struct GstFrameSink {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    info: gst_video::VideoInfo,
    fps: u64,
    frames_written: u64,
    finished: bool,
}

impl GstFrameSink {
    pub fn create(path: &Path, spec: SinkSpec) -> anyhow::Result<Self> {
        let info = pipeline::rgb_info(spec.dims, Some(spec.fps))?;
        let caps = info.to_caps().context("building sink caps")?;

        let pipeline = pipeline::launch(SINK_PIPELINE)?;
        let location = path.to_string_lossy();
        pipeline::element(&pipeline, "out")?.set_property("location", &*location);
        let appsrc = pipeline::app_src(&pipeline, "src")?;
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        pipeline::play(&pipeline)
            .with_context(|| format!("starting encoder for {}", path.display()))?;

        Ok(Self {
            pipeline,
            appsrc,
            info,
            fps: spec.fps.max(1) as u64,
            frames_written: 0,
            finished: false,
        })
    }
}

impl FrameSink for GstFrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        if let Some(err) = pipeline::pop_error(&self.pipeline) {
            return Err(err);
        }
        let mut buffer = pipeline::image_to_buffer(frame, &self.info)?;
        {
            let buffer = buffer.get_mut().context("frame buffer is shared")?;
            let pts = gst::ClockTime::from_nseconds(self.frames_written * 1_000_000_000 / self.fps);
            buffer.set_pts(Some(pts));
            buffer.set_duration(Some(gst::ClockTime::from_nseconds(1_000_000_000 / self.fps)));
        }
        self.appsrc
            .push_buffer(buffer)
            .with_context(|| format!("pushing frame {}", self.frames_written))?;
        self.frames_written += 1;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let flushed = self
            .appsrc
            .end_of_stream()
            .map_err(anyhow::Error::from)
            .and_then(|_| {
                pipeline::wait_for_eos(
                    &self.pipeline,
                    gst::ClockTime::from_seconds(FINALIZE_TIMEOUT_SECS),
                )
            });
        let stopped = self.pipeline.set_state(gst::State::Null);
        flushed.context("finalizing output video")?;
        stopped.context("stopping encode pipeline")?;
        Ok(())
    }
}

impl Drop for GstFrameSink {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            log::warn!("{err:#}");
        }
    }
}
