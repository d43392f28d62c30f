//! Runs one video through detection and annotation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::RgbImage;
use inference_common::annotate::FrameAnnotator;
use inference_common::detector::Detector;
use inference_common::frame_meta::FrameMeta;
use inference_common::frame_times::{AggregatedTimes, FrameTimes};
use inference_common::img_dimensions::ImgDimensions;
use inference_common::media::{
    FrameSink, FrameSource, MediaBackend, PreviewSurface, SinkSpec, SourceInfo,
};
use inference_common::progress::{overlay_text, ProgressTracker, REPORT_INTERVAL};
use inference_common::resize::FrameResizer;
use inference_common::video_meta::VideoMeta;

use crate::cancel::CancelSignal;
use crate::config::ProcessConfig;
use crate::error::ProcessError;

/// Fixed facts about one input video, known once its source is open.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoJob {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// File stem, used in logs, the overlay and output names.
    pub name: String,
    pub source_dims: ImgDimensions,
    pub target_dims: ImgDimensions,
    pub total_frames: Option<u64>,
}

impl VideoJob {
    pub fn new(source_path: &Path, info: &SourceInfo, config: &ProcessConfig) -> Self {
        let name = video_name(source_path);
        Self {
            source_path: source_path.to_path_buf(),
            output_path: config.output_path(&name),
            source_dims: info.dims,
            target_dims: info.dims.fit_within(config.max_dims),
            total_frames: info.frame_count,
            name,
        }
    }
}

pub fn video_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

/// How a video that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOutcome {
    /// Every frame was written.
    Completed { frames: u64 },
    /// The user asked to stop; `frames` were written before that.
    Cancelled { frames: u64 },
}

enum LoopEnd {
    Exhausted,
    Cancelled,
}

/// Detects, annotates and re-encodes videos one at a time.
pub struct VideoProcessor<M, D, C> {
    config: ProcessConfig,
    media: M,
    detector: D,
    annotator: FrameAnnotator,
    cancel: C,
    resizer: FrameResizer,
}

impl<M: MediaBackend, D: Detector, C: CancelSignal> VideoProcessor<M, D, C> {
    pub fn new(
        config: ProcessConfig,
        media: M,
        detector: D,
        annotator: FrameAnnotator,
        cancel: C,
    ) -> Self {
        Self {
            config,
            media,
            detector,
            annotator,
            cancel,
            resizer: FrameResizer::default(),
        }
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Processes `path` to the end, or until the cancel signal fires.
    ///
    /// Source, sink and preview are released on every path out of here; the
    /// output file is finalized even when the video fails halfway.
    pub fn process(&mut self, path: &Path) -> Result<VideoOutcome, ProcessError> {
        let name = video_name(path);
        let _span = tracing::info_span!("video", %name).entered();

        let mut source = self
            .media
            .open_source(path)
            .map_err(|source| ProcessError::SourceOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let info = source.info();
        let job = VideoJob::new(path, &info, &self.config);

        let mut sink = match self.open_sink(&job) {
            Ok(sink) => sink,
            Err(err) => {
                close_source(source.as_mut());
                return Err(err);
            }
        };
        let mut preview = match self
            .media
            .open_preview(&self.config.window_title, job.target_dims)
        {
            Ok(preview) => preview,
            Err(err) => {
                log::warn!("Preview window unavailable, continuing without it: {err:#}");
                None
            }
        };

        log::info!("Processing: {}", job.name);
        match job.total_frames {
            Some(total) => log::info!("Total frames: {total}"),
            None => log::info!("Total frames: unknown"),
        }
        log::debug!(
            "Source {} @ {:.2} fps, output {} @ {} fps",
            job.source_dims,
            info.framerate,
            job.target_dims,
            self.config.output_fps
        );

        let mut meta = self.config.save_meta.then(|| {
            VideoMeta::new(
                job.source_path.clone(),
                job.output_path.clone(),
                job.target_dims.width,
                job.target_dims.height,
            )
        });
        let mut progress = ProgressTracker::new(job.total_frames);
        let mut times = AggregatedTimes::default();

        let result = self.run_frames(
            &job,
            source.as_mut(),
            sink.as_mut(),
            &mut preview,
            &mut meta,
            &mut progress,
            &mut times,
        );
        if progress.frames() >= REPORT_INTERVAL {
            // End the in-place progress line; the terminal may be in raw mode.
            print!("\r\n");
            let _ = std::io::stdout().flush();
        }

        close_source(source.as_mut());
        if let Some(mut preview) = preview.take() {
            close_preview(preview.as_mut());
        }
        let finished = sink.finish().map_err(|source| ProcessError::Finalize {
            path: job.output_path.clone(),
            source,
        });

        let end = match (result, finished) {
            (Ok(end), Ok(())) => end,
            // The user still asked to stop; the batch must not move on.
            (Ok(LoopEnd::Cancelled), Err(err)) => {
                log::warn!("{err}");
                LoopEnd::Cancelled
            }
            (Ok(LoopEnd::Exhausted), Err(err)) => return Err(err),
            (Err(err), finished) => {
                if let Err(finish_err) = finished {
                    log::warn!("{finish_err}");
                }
                return Err(err);
            }
        };

        log_times(&times);
        if let Some(meta) = meta {
            let meta_path = self.config.meta_path(&job.name);
            log::info!(
                "Writing {} detections over {} frames to {meta_path:?}",
                meta.detection_count(),
                meta.frames.len()
            );
            if let Err(err) = meta.write_json(&meta_path) {
                log::warn!("Could not save detections: {err:#}");
            }
        }

        let frames = sink.frames_written();
        Ok(match end {
            LoopEnd::Exhausted => {
                log::info!("{} processed!", job.name);
                VideoOutcome::Completed { frames }
            }
            LoopEnd::Cancelled => VideoOutcome::Cancelled { frames },
        })
    }

    fn open_sink(&mut self, job: &VideoJob) -> Result<Box<dyn FrameSink>, ProcessError> {
        let sink_err = |source| ProcessError::SinkOpen {
            path: job.output_path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|err| {
                sink_err(anyhow::Error::new(err).context(format!(
                    "creating output directory {}",
                    self.config.output_dir.display()
                )))
            })?;
        let spec = SinkSpec {
            dims: job.target_dims,
            fps: self.config.output_fps,
        };
        self.media.open_sink(&job.output_path, spec).map_err(sink_err)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_frames(
        &mut self,
        job: &VideoJob,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        preview: &mut Option<Box<dyn PreviewSurface>>,
        meta: &mut Option<VideoMeta>,
        progress: &mut ProgressTracker,
        times: &mut AggregatedTimes,
    ) -> Result<LoopEnd, ProcessError> {
        let threshold = self.config.confidence_threshold;
        loop {
            let frame_no = progress.frames() + 1;
            let mut frame_times = FrameTimes::default();

            let start = Instant::now();
            let frame = source
                .read_frame()
                .map_err(|source| ProcessError::Read {
                    frame: frame_no,
                    source,
                })?;
            let Some(frame) = frame else {
                return Ok(LoopEnd::Exhausted);
            };
            frame_times.read = start.elapsed();

            if let Some(report) = progress.tick() {
                print!("\r{report}");
                let _ = std::io::stdout().flush();
                log::debug!("{report}");
            }

            let start = Instant::now();
            let mut frame = self
                .scale(frame, job.target_dims)
                .map_err(|source| ProcessError::Resize {
                    frame: frame_no,
                    source,
                })?;
            frame_times.resize = start.elapsed();

            let start = Instant::now();
            let detections = self
                .detector
                .detect(&frame)
                .map_err(|source| ProcessError::Detect {
                    frame: frame_no,
                    source,
                })?;
            frame_times.detect = start.elapsed();

            let start = Instant::now();
            let drawn = self.annotator.annotate(&mut frame, &detections, threshold);
            let overlay = overlay_text(&job.name, progress.frames(), job.total_frames);
            self.annotator.draw_progress(&mut frame, &overlay);
            frame_times.annotate = start.elapsed();
            log::trace!("frame {frame_no}: {} detections, {drawn} drawn", detections.len());

            if let Some(meta) = meta.as_mut().filter(|_| drawn > 0) {
                meta.push(FrameMeta {
                    frame_index: frame_no - 1,
                    detections: detections
                        .into_iter()
                        .filter(|d| d.confidence > threshold)
                        .collect(),
                });
            }

            let start = Instant::now();
            sink.write_frame(&frame)
                .map_err(|source| ProcessError::Write {
                    frame: frame_no,
                    source,
                })?;
            frame_times.write = start.elapsed();

            let shown = preview.as_mut().map(|surface| surface.show(&frame));
            if let Some(Err(err)) = shown {
                log::warn!("Preview failed, continuing without it: {err:#}");
                if let Some(mut surface) = preview.take() {
                    close_preview(surface.as_mut());
                }
            }

            log::trace!("{frame_times:?}");
            times.push(frame_times);

            if self.cancel.cancel_requested() {
                return Ok(LoopEnd::Cancelled);
            }
        }
    }

    fn scale(&mut self, frame: RgbImage, target: ImgDimensions) -> anyhow::Result<RgbImage> {
        if frame.dimensions() == (target.width, target.height) {
            return Ok(frame);
        }
        self.resizer.resize(&frame, target)
    }
}

fn close_source(source: &mut dyn FrameSource) {
    if let Err(err) = source.close() {
        log::warn!("Failed to release video source: {err:#}");
    }
}

fn close_preview(preview: &mut dyn PreviewSurface) {
    if let Err(err) = preview.close() {
        log::debug!("Failed to close preview: {err:#}");
    }
}

fn log_times(times: &AggregatedTimes) {
    if times.len() < 2 {
        return;
    }
    log::info!("Average frame times: {:?}", times.avg(true));
    log::info!("Min frame times: {:?}", times.min(true));
    log::info!("Max frame times: {:?}", times.max(true));
}
