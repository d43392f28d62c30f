use anyhow::Context;
use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::media::PreviewSurface;

use crate::pipeline;

const PREVIEW_PIPELINE: &str = "appsrc name=src format=time is-live=true do-timestamp=true ! \
     videoconvert ! autovideosink sync=false";

/// Live window showing each annotated frame as soon as it is ready.
pub struct GstPreview {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    info: gst_video::VideoInfo,
    title: String,
    titled: bool,
    closed: bool,
}

impl GstPreview {
    pub fn open(title: &str, dims: ImgDimensions) -> anyhow::Result<Self> {
        let info = pipeline::rgb_info(dims, None)?;
        let caps = info.to_caps().context("building preview caps")?;

        let pipeline = pipeline::launch(PREVIEW_PIPELINE)?;
        let appsrc = pipeline::app_src(&pipeline, "src")?;
        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gst::Format::Time);

        pipeline::play(&pipeline).context("starting preview window")?;

        Ok(Self {
            pipeline,
            appsrc,
            info,
            title: title.to_string(),
            titled: false,
            closed: false,
        })
    }

    /// X11 video sinks name their window after the stream's title tag.
    fn send_title(&mut self) {
        let mut tags = gst::TagList::new();
        if let Some(tags) = tags.get_mut() {
            tags.add::<gst::tags::Title>(&self.title.as_str(), gst::TagMergeMode::Replace);
        }
        if !self.appsrc.send_event(gst::event::Tag::new(tags)) {
            log::debug!("Preview sink ignored the window title");
        }
        self.titled = true;
    }
}

impl PreviewSurface for GstPreview {
    fn show(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        if let Some(err) = pipeline::pop_error(&self.pipeline) {
            return Err(err.context("preview window failed"));
        }
        let buffer = pipeline::image_to_buffer(frame, &self.info)?;
        self.appsrc
            .push_buffer(buffer)
            .context("pushing frame to preview")?;
        if !self.titled {
            self.send_title();
        }
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pipeline
            .set_state(gst::State::Null)
            .context("closing preview window")?;
        Ok(())
    }
}

impl Drop for GstPreview {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("{err:#}");
        }
    }
}
