mod batch;
mod cancel;
mod config;
mod error;
mod process_video;
mod term_writer;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gstreamed_common::media::GstMedia;
use inference_common::annotate::{FontRenderer, FrameAnnotator};
use inference_common::img_dimensions::ImgDimensions;
use ort::execution_providers::CPUExecutionProvider;
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::builder::SessionBuilder;
use ort_common::yolov8::{YoloParams, YoloV8};
use tracing_subscriber::prelude::*;

use crate::cancel::KeyboardCancel;
use crate::config::{BatchConfig, ProcessConfig};
use crate::process_video::VideoProcessor;

#[derive(Debug, Parser)]
#[command(version, about = "Annotates every video in a directory with YOLOv8 detections")]
pub struct Args {
    /// Directory with the input videos (.mp4/.avi/.mov/.mkv).
    input_dir: PathBuf,
    /// Where annotated videos are written, `<input_dir>/annotated` if unset.
    #[arg(long, short)]
    output_dir: Option<PathBuf>,
    /// Whether to attempt to use `cuda` hw acceleration.
    /// This may silently fail and fallback to cpu acceleration presently.
    #[arg(long, action, default_value = "false")]
    cuda: bool,
    /// Yolov8 onnx model file to use.
    #[arg(long, short, default_value = "_models/yolov8s.onnx")]
    model: String,
    /// Only detections scoring above this are drawn.
    #[arg(long, default_value = "0.25")]
    conf_threshold: f32,
    #[arg(long, default_value = "0.45")]
    nms_threshold: f32,
    /// Output frames are scaled to fit within max-width x max-height.
    #[arg(long, default_value = "640")]
    max_width: u32,
    #[arg(long, default_value = "480")]
    max_height: u32,
    /// TTF/OTF font for labels. Defaults to the first common system font found.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Don't open a preview window.
    #[arg(long, action, default_value = "false")]
    headless: bool,
    /// Also write the drawn detections of each video to `<stem>_tested.json`.
    #[arg(long, action, default_value = "false")]
    save_meta: bool,
    /// Pause between two videos, in milliseconds.
    #[arg(long, default_value = "1000")]
    pause_ms: u64,
}

impl Args {
    fn process_config(&self) -> ProcessConfig {
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("annotated"));
        ProcessConfig {
            max_dims: ImgDimensions::new(self.max_width.max(1), self.max_height.max(1)),
            confidence_threshold: self.conf_threshold,
            save_meta: self.save_meta,
            ..ProcessConfig::new(output_dir)
        }
    }

    fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            pause: Duration::from_millis(self.pause_ms),
            ..BatchConfig::new(self.input_dir.clone())
        }
    }
}

/// Lists the input videos, `None` when there is nothing to do.
fn videos_to_process(batch_config: &BatchConfig) -> anyhow::Result<Option<Vec<PathBuf>>> {
    let videos = batch::find_videos(batch_config)?;
    if batch::nothing_to_do(batch_config, &videos) {
        return Ok(None);
    }
    Ok(Some(videos))
}

fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,video_annotator=info,gstreamed_common=info,ort_common=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(term_writer::terminal_line))
        .init();

    let args = Args::parse();
    let process_config = args.process_config();
    let batch_config = args.batch_config();

    // Fail on a bad input dir, or finish on an empty one, before paying for
    // font and model load.
    let Some(videos) = videos_to_process(&batch_config)? else {
        return Ok(());
    };

    let font_path = args
        .font
        .clone()
        .or_else(FontRenderer::find_system_font)
        .context("no usable system font found, pass one with --font")?;
    let glyphs = FontRenderer::from_file(&font_path)?;
    log::info!("Using font {font_path:?}");

    // Load model into ort.
    let (ep, ep_name) = if args.cuda {
        (CUDAExecutionProvider::default().build(), "cuda")
    } else {
        (CPUExecutionProvider::default().build(), "cpu")
    };
    ort::init().with_execution_providers([ep]).commit()?;

    let session = SessionBuilder::new()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(&args.model)
        .with_context(|| format!("loading model {}", args.model))?;
    log::debug!("{session:?}");
    log::info!(
        "Prepared ort {ep_name} session with model: {:?}",
        args.model
    );

    let detector = YoloV8::new(
        session,
        YoloParams {
            conf_threshold: args.conf_threshold,
            nms_threshold: args.nms_threshold,
            ..YoloParams::default()
        },
    );
    let media = GstMedia::new(args.headless)?;
    let mut processor = VideoProcessor::new(
        process_config,
        media,
        detector,
        FrameAnnotator::new(glyphs),
        KeyboardCancel::new(),
    );
    log::info!("Writing annotated videos to {:?}", processor.config().output_dir);

    let summary = batch::run_batch(&batch_config, &videos, |path| processor.process(path));
    log::info!(
        "{} of {} videos completed, {} failed",
        summary.completed,
        summary.found,
        summary.failed
    );

    Ok(())
}
