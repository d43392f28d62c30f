//! Small helpers shared by the appsrc/appsink based pipelines.

use anyhow::{bail, Context};
use gstreamer::{self as gst, prelude::*, MessageView};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use inference_common::img_dimensions::ImgDimensions;

/// Parses a `gst-launch` style description into a pipeline.
pub fn launch(description: &str) -> anyhow::Result<gst::Pipeline> {
    gst::parse::launch(description)
        .with_context(|| format!("parsing pipeline `{description}`"))?
        .downcast::<gst::Pipeline>()
        .map_err(|_| anyhow::anyhow!("`{description}` is not a pipeline"))
}

pub fn element(pipeline: &gst::Pipeline, name: &str) -> anyhow::Result<gst::Element> {
    pipeline
        .by_name(name)
        .with_context(|| format!("pipeline has no element named {name}"))
}

pub fn app_src(pipeline: &gst::Pipeline, name: &str) -> anyhow::Result<gst_app::AppSrc> {
    element(pipeline, name)?
        .dynamic_cast::<gst_app::AppSrc>()
        .map_err(|_| anyhow::anyhow!("element {name} is not an appsrc"))
}

pub fn app_sink(pipeline: &gst::Pipeline, name: &str) -> anyhow::Result<gst_app::AppSink> {
    element(pipeline, name)?
        .dynamic_cast::<gst_app::AppSink>()
        .map_err(|_| anyhow::anyhow!("element {name} is not an appsink"))
}

/// Packed RGB video info, optionally with a fixed framerate.
pub fn rgb_info(dims: ImgDimensions, fps: Option<u32>) -> anyhow::Result<gst_video::VideoInfo> {
    let builder = gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgb, dims.width, dims.height);
    let builder = match fps {
        Some(fps) => builder.fps(gst::Fraction::new(fps as i32, 1)),
        None => builder,
    };
    builder
        .build()
        .with_context(|| format!("building RGB video info for {dims}"))
}

/// Takes the first error posted on the bus, if any.
pub fn pop_error(pipeline: &gst::Pipeline) -> Option<anyhow::Error> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
    match msg.view() {
        MessageView::Error(err) => Some(anyhow::anyhow!(
            "error from element {:?}: {} ({:?})",
            err.src().map(|s| s.path_string()),
            err.error(),
            err.debug()
        )),
        _ => None,
    }
}

/// Blocks until end-of-stream, an error, or the timeout.
pub fn wait_for_eos(pipeline: &gst::Pipeline, timeout: gst::ClockTime) -> anyhow::Result<()> {
    let bus = pipeline.bus().context("pipeline has no bus")?;
    let msg = bus
        .timed_pop_filtered(timeout, &[gst::MessageType::Eos, gst::MessageType::Error])
        .with_context(|| format!("no end of stream within {timeout}"))?;
    match msg.view() {
        MessageView::Error(err) => bail!(
            "error from element {:?}: {} ({:?})",
            err.src().map(|s| s.path_string()),
            err.error(),
            err.debug()
        ),
        _ => Ok(()),
    }
}

/// Brings a pipeline to `Paused` and waits for preroll, surfacing the bus
/// error if it fails.
pub fn preroll(pipeline: &gst::Pipeline, timeout: gst::ClockTime) -> anyhow::Result<()> {
    let started = pipeline.set_state(gst::State::Paused);
    let (result, _, _) = pipeline.state(timeout);
    if started.is_err() || result.is_err() {
        let err = pop_error(pipeline)
            .unwrap_or_else(|| anyhow::anyhow!("pipeline failed to preroll"));
        // Tear down whatever got allocated before failing.
        let _ = pipeline.set_state(gst::State::Null);
        return Err(err);
    }
    Ok(())
}

/// Sets the pipeline playing. On failure it is torn down to `Null` and the
/// bus error, if any, is returned.
pub fn play(pipeline: &gst::Pipeline) -> anyhow::Result<()> {
    if let Err(err) = pipeline.set_state(gst::State::Playing) {
        let err = pop_error(pipeline).unwrap_or_else(|| err.into());
        let _ = pipeline.set_state(gst::State::Null);
        return Err(err);
    }
    Ok(())
}

/// Copies a sample's RGB payload into an image, dropping row padding.
pub fn sample_to_image(sample: &gst::Sample) -> anyhow::Result<RgbImage> {
    let caps = sample.caps().context("sample has no caps")?;
    let info = gst_video::VideoInfo::from_caps(caps).context("sample caps are not raw video")?;
    if info.format() != gst_video::VideoFormat::Rgb {
        bail!("expected RGB frames, got {:?}", info.format());
    }
    let buffer = sample.buffer().context("sample has no buffer")?;
    let map = buffer.map_readable().context("mapping frame buffer")?;

    let (width, height) = (info.width(), info.height());
    let row = width as usize * 3;
    let stride = info.stride()[0] as usize;
    let offset = info.offset()[0];
    let data = map.as_slice();

    let mut pixels = Vec::with_capacity(row * height as usize);
    for y in 0..height as usize {
        let start = offset + y * stride;
        let line = data
            .get(start..start + row)
            .with_context(|| format!("frame buffer too short for row {y}"))?;
        pixels.extend_from_slice(line);
    }
    RgbImage::from_raw(width, height, pixels).context("frame size mismatch")
}

/// Copies an image into a buffer laid out as `info` expects.
pub fn image_to_buffer(frame: &RgbImage, info: &gst_video::VideoInfo) -> anyhow::Result<gst::Buffer> {
    if frame.width() != info.width() || frame.height() != info.height() {
        bail!(
            "frame is {}x{}, stream expects {}x{}",
            frame.width(),
            frame.height(),
            info.width(),
            info.height()
        );
    }
    let row = frame.width() as usize * 3;
    let stride = info.stride()[0] as usize;
    let offset = info.offset()[0];

    let data = if stride == row && offset == 0 {
        frame.as_raw().clone()
    } else {
        let mut data = vec![0u8; info.size()];
        for (y, line) in frame.as_raw().chunks_exact(row).enumerate() {
            let start = offset + y * stride;
            data[start..start + row].copy_from_slice(line);
        }
        data
    };
    Ok(gst::Buffer::from_mut_slice(data))
}
