//! Walks an input directory and feeds each video to the processor.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::BatchConfig;
use crate::error::ProcessError;
use crate::process_video::VideoOutcome;

/// What happened to a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub found: usize,
    pub completed: usize,
    pub failed: usize,
    /// The user stopped the batch; remaining videos were not attempted.
    pub cancelled: bool,
}

/// Video files directly inside the input directory, sorted by file name.
pub fn find_videos(config: &BatchConfig) -> anyhow::Result<Vec<PathBuf>> {
    let dir = &config.input_dir;
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?;

    let mut videos = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("listing {}", dir.display()))?
            .path();
        if path.is_file() && has_extension(&path, &config.extensions) {
            videos.push(path);
        }
    }
    videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(videos)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Warns and returns `true` when `videos` is empty.
pub fn nothing_to_do(config: &BatchConfig, videos: &[PathBuf]) -> bool {
    if videos.is_empty() {
        log::warn!("No videos found in {}!", config.input_dir.display());
    }
    videos.is_empty()
}

/// Runs `process` on every video in order. Failures are logged and skipped;
/// a cancelled video ends the batch.
pub fn run_batch(
    config: &BatchConfig,
    videos: &[PathBuf],
    mut process: impl FnMut(&Path) -> Result<VideoOutcome, ProcessError>,
) -> BatchSummary {
    let mut summary = BatchSummary {
        found: videos.len(),
        ..Default::default()
    };
    if nothing_to_do(config, videos) {
        return summary;
    }
    log::info!("Found {} videos.", videos.len());

    for (idx, path) in videos.iter().enumerate() {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("[{}/{}] Processing video: {file}", idx + 1, videos.len());

        match process(path) {
            Ok(VideoOutcome::Completed { frames }) => {
                log::debug!("{file}: {frames} frames written");
                summary.completed += 1;
            }
            Ok(VideoOutcome::Cancelled { frames }) => {
                log::info!("Process stopped by user.");
                log::debug!("{file}: {frames} frames written before stopping");
                summary.cancelled = true;
                break;
            }
            Err(err) => {
                log::error!("Skipping {file}: {err}");
                summary.failed += 1;
            }
        }

        if idx + 1 < videos.len() && !config.pause.is_zero() {
            std::thread::sleep(config.pause);
        }
    }

    if !summary.cancelled {
        log::info!("All videos processed!");
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use inference_common::annotate::FrameAnnotator;

    use crate::config::ProcessConfig;
    use crate::process_video::VideoProcessor;
    use crate::test_support::*;

    fn batch_config(input_dir: PathBuf) -> BatchConfig {
        BatchConfig {
            pause: Duration::ZERO,
            ..BatchConfig::new(input_dir)
        }
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    fn processor(
        media: FakeMedia,
        cancel: ScriptedCancel,
        output_dir: PathBuf,
    ) -> VideoProcessor<FakeMedia, ScriptedDetector, ScriptedCancel> {
        VideoProcessor::new(
            ProcessConfig::new(output_dir),
            media,
            ScriptedDetector::default(),
            FrameAnnotator::new(BlockGlyphs),
            cancel,
        )
    }

    #[test]
    fn test_find_videos_filters_and_sorts() {
        let dir = scratch_dir("find_videos");
        for name in ["b.MKV", "a.mp4", "notes.txt", "c.Mov", "d.avi", "README"] {
            touch(&dir.join(name));
        }
        std::fs::create_dir(dir.join("nested.mp4")).unwrap();

        let videos = find_videos(&batch_config(dir.clone())).unwrap();
        let names: Vec<_> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.MKV", "c.Mov", "d.avi"]);
    }

    #[test]
    fn test_find_videos_missing_dir() {
        let dir = std::env::temp_dir().join("video_annotator_does_not_exist");
        assert!(find_videos(&batch_config(dir)).is_err());
    }

    #[test]
    fn test_batch_processes_only_supported_files() {
        let dir = scratch_dir("batch_supported");
        for name in ["one.mp4", "two.avi", "three.txt"] {
            touch(&dir.join(name));
        }
        let config = batch_config(dir.clone());
        let videos = find_videos(&config).unwrap();

        let media = FakeMedia::new()
            .with_video(dir.join("one.mp4"), grey_frames(2, 64, 48))
            .with_video(dir.join("two.avi"), grey_frames(3, 64, 48));
        let log = media.log();
        let mut processor = processor(media, ScriptedCancel::never(), dir.join("annotated"));

        let summary = run_batch(&config, &videos, |path| processor.process(path));
        assert_eq!(
            summary,
            BatchSummary {
                found: 2,
                completed: 2,
                failed: 0,
                cancelled: false
            }
        );
        let log = log.borrow();
        assert_eq!(log.opened.len(), 2);
        assert!(log.outputs.iter().all(|o| o.finished));
    }

    #[test]
    fn test_batch_continues_after_open_failure() {
        let config = batch_config(PathBuf::from("in"));
        let videos = vec![PathBuf::from("in/corrupt.mp4"), PathBuf::from("in/good.mp4")];
        let media = FakeMedia::new().with_video("in/good.mp4", grey_frames(2, 64, 48));
        let log = media.log();
        let mut processor = processor(
            media,
            ScriptedCancel::never(),
            scratch_dir("batch_open_failure"),
        );

        let summary = run_batch(&config, &videos, |path| processor.process(path));
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed, 1);
        assert!(!summary.cancelled);
        assert_eq!(log.borrow().opened, videos);
    }

    #[test]
    fn test_cancel_stops_the_batch() {
        let config = batch_config(PathBuf::from("in"));
        let videos = vec![PathBuf::from("in/a.mp4"), PathBuf::from("in/b.mp4")];
        let media = FakeMedia::new()
            .with_video("in/a.mp4", grey_frames(10, 64, 48))
            .with_video("in/b.mp4", grey_frames(10, 64, 48));
        let log = media.log();
        let mut processor = processor(
            media,
            ScriptedCancel::on_poll(1),
            scratch_dir("batch_cancel"),
        );

        let summary = run_batch(&config, &videos, |path| processor.process(path));
        assert!(summary.cancelled);
        assert_eq!(summary.completed, 0);

        let log = log.borrow();
        assert_eq!(log.opened, vec![PathBuf::from("in/a.mp4")]);
        assert_eq!(log.outputs[0].frames.len(), 1);
    }

    #[test]
    fn test_cancel_stops_the_batch_even_if_finalize_fails() {
        let config = batch_config(PathBuf::from("in"));
        let videos = vec![PathBuf::from("in/a.mp4"), PathBuf::from("in/b.mp4")];
        let mut media = FakeMedia::new()
            .with_video("in/a.mp4", grey_frames(10, 64, 48))
            .with_video("in/b.mp4", grey_frames(10, 64, 48));
        media.failing_finish = true;
        let log = media.log();
        let mut processor = processor(
            media,
            ScriptedCancel::on_poll(1),
            scratch_dir("batch_cancel_finalize"),
        );

        let summary = run_batch(&config, &videos, |path| processor.process(path));
        assert!(summary.cancelled);
        assert_eq!(summary.failed, 0);
        assert_eq!(log.borrow().opened, vec![PathBuf::from("in/a.mp4")]);
    }

    #[test]
    fn test_empty_batch() {
        let config = batch_config(PathBuf::from("empty"));
        let mut calls = 0;
        let summary = run_batch(&config, &[], |_| {
            calls += 1;
            Ok(VideoOutcome::Completed { frames: 0 })
        });
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(calls, 0);
    }
}
