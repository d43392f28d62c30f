//! In-memory stand-ins for the media, detector, glyph and cancel capabilities.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::bail;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use inference_common::annotate::GlyphRenderer;
use inference_common::detection::Detection;
use inference_common::detector::Detector;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::media::{
    FrameSink, FrameSource, MediaBackend, PreviewSurface, SinkSpec, SourceInfo,
};

use crate::cancel::CancelSignal;

pub const GLYPH_W: u32 = 6;
pub const GLYPH_H: u32 = 10;
pub const GREY: Rgb<u8> = Rgb([90, 90, 90]);

/// Every character is a solid `GLYPH_W` x `GLYPH_H` block.
pub struct BlockGlyphs;

impl GlyphRenderer for BlockGlyphs {
    fn text_size(&self, _scale: f32, text: &str) -> (u32, u32) {
        (text.chars().count() as u32 * GLYPH_W, GLYPH_H)
    }

    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        let (w, h) = self.text_size(scale, text);
        if w > 0 {
            draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
        }
    }
}

pub fn grey_frames(count: usize, width: u32, height: u32) -> Vec<RgbImage> {
    vec![RgbImage::from_pixel(width, height, GREY); count]
}

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("video_annotator_{name}_{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// One video written through a [`FakeMedia`] sink.
#[derive(Debug)]
pub struct Output {
    pub path: PathBuf,
    pub spec: SinkSpec,
    pub frames: Vec<RgbImage>,
    pub finished: bool,
}

/// Everything the fakes observed.
#[derive(Debug, Default)]
pub struct MediaLog {
    pub opened: Vec<PathBuf>,
    pub sources_closed: usize,
    pub outputs: Vec<Output>,
    pub previews_shown: usize,
    pub previews_closed: usize,
}

/// Serves pre-decoded frames for registered paths; anything else fails to open.
#[derive(Default)]
pub struct FakeMedia {
    videos: HashMap<PathBuf, Vec<RgbImage>>,
    log: Rc<RefCell<MediaLog>>,
    pub with_preview: bool,
    pub failing_preview: bool,
    pub failing_sink: bool,
    /// Sinks accept frames but cannot finalize the container.
    pub failing_finish: bool,
    /// Reported instead of the real frame count when set.
    pub unknown_length: bool,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, frames: Vec<RgbImage>) -> Self {
        self.videos.insert(path.into(), frames);
        self
    }

    pub fn log(&self) -> Rc<RefCell<MediaLog>> {
        Rc::clone(&self.log)
    }
}

impl MediaBackend for FakeMedia {
    fn open_source(&mut self, path: &Path) -> anyhow::Result<Box<dyn FrameSource>> {
        self.log.borrow_mut().opened.push(path.to_path_buf());
        let Some(frames) = self.videos.get(path) else {
            bail!("no decoder for {}", path.display());
        };
        let dims = frames
            .first()
            .map(|f| ImgDimensions::new(f.width(), f.height()))
            .unwrap_or(ImgDimensions::new(1, 1));
        let info = SourceInfo {
            dims,
            framerate: 25.0,
            frame_count: (!self.unknown_length).then_some(frames.len() as u64),
        };
        Ok(Box::new(FakeSource {
            frames: frames.iter().cloned().collect(),
            info,
            log: Rc::clone(&self.log),
        }))
    }

    fn open_sink(&mut self, path: &Path, spec: SinkSpec) -> anyhow::Result<Box<dyn FrameSink>> {
        if self.failing_sink {
            bail!("encoder missing");
        }
        let mut log = self.log.borrow_mut();
        log.outputs.push(Output {
            path: path.to_path_buf(),
            spec,
            frames: Vec::new(),
            finished: false,
        });
        Ok(Box::new(FakeSink {
            index: log.outputs.len() - 1,
            failing_finish: self.failing_finish,
            log: Rc::clone(&self.log),
        }))
    }

    fn open_preview(
        &mut self,
        _title: &str,
        _dims: ImgDimensions,
    ) -> anyhow::Result<Option<Box<dyn PreviewSurface>>> {
        if !self.with_preview {
            return Ok(None);
        }
        Ok(Some(Box::new(FakePreview {
            failing: self.failing_preview,
            log: Rc::clone(&self.log),
        })))
    }
}

struct FakeSource {
    frames: VecDeque<RgbImage>,
    info: SourceInfo,
    log: Rc<RefCell<MediaLog>>,
}

impl FrameSource for FakeSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        Ok(self.frames.pop_front())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().sources_closed += 1;
        Ok(())
    }
}

struct FakeSink {
    index: usize,
    failing_finish: bool,
    log: Rc<RefCell<MediaLog>>,
}

impl FrameSink for FakeSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        self.log.borrow_mut().outputs[self.index].frames.push(frame.clone());
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.log.borrow().outputs[self.index].frames.len() as u64
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        if self.failing_finish {
            bail!("mux timeout");
        }
        self.log.borrow_mut().outputs[self.index].finished = true;
        Ok(())
    }
}

struct FakePreview {
    failing: bool,
    log: Rc<RefCell<MediaLog>>,
}

impl PreviewSurface for FakePreview {
    fn show(&mut self, _frame: &RgbImage) -> anyhow::Result<()> {
        if self.failing {
            bail!("display went away");
        }
        self.log.borrow_mut().previews_shown += 1;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().previews_closed += 1;
        Ok(())
    }
}

/// Returns scripted results call by call, then no detections.
#[derive(Default)]
pub struct ScriptedDetector {
    script: VecDeque<anyhow::Result<Vec<Detection>>>,
    /// Dimensions of every frame it was asked about.
    pub seen: Rc<RefCell<Vec<ImgDimensions>>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<anyhow::Result<Vec<Detection>>>) -> Self {
        Self {
            script: script.into(),
            seen: Rc::default(),
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        self.seen
            .borrow_mut()
            .push(ImgDimensions::new(frame.width(), frame.height()));
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Fires on the n-th poll (1-based) and on every poll after it.
#[derive(Debug, Default)]
pub struct ScriptedCancel {
    fire_on: Option<usize>,
    polls: usize,
}

impl ScriptedCancel {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn on_poll(n: usize) -> Self {
        Self {
            fire_on: Some(n),
            polls: 0,
        }
    }
}

impl CancelSignal for ScriptedCancel {
    fn cancel_requested(&mut self) -> bool {
        self.polls += 1;
        self.fire_on.is_some_and(|n| self.polls >= n)
    }
}
