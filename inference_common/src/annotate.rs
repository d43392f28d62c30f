//! Drawing of detection boxes, labels and the progress line onto frames.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detection::Detection;

/// Detections at or below this confidence are not drawn.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Fonts tried, in order, when no font is given explicitly.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Measures and draws text.
pub trait GlyphRenderer {
    /// Rendered `(width, height)` of `text` at `scale` pixels.
    fn text_size(&self, scale: f32, text: &str) -> (u32, u32);

    /// Draws `text` with the top-left corner of its extent at `(x, y)`.
    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str);
}

/// [`GlyphRenderer`] backed by a TrueType/OpenType font.
pub struct FontRenderer {
    font: FontVec,
}

impl FontRenderer {
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let font = FontVec::try_from_vec(bytes).context("invalid font data")?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("loading font {}", path.display()))
    }

    /// First entry of [`SYSTEM_FONT_CANDIDATES`] that exists on this machine.
    pub fn find_system_font() -> Option<PathBuf> {
        SYSTEM_FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }
}

impl GlyphRenderer for FontRenderer {
    fn text_size(&self, scale: f32, text: &str) -> (u32, u32) {
        text_size(PxScale::from(scale), &self.font, text)
    }

    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(scale), &self.font, text);
    }
}

/// Colours and sizes used when annotating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    /// Box outline and label background.
    pub box_color: Rgb<u8>,
    pub box_thickness: u32,
    pub label_color: Rgb<u8>,
    pub label_scale: f32,
    /// Gap between the label background and the box / text.
    pub label_padding: i32,
    pub progress_color: Rgb<u8>,
    pub progress_scale: f32,
    /// Left end of the progress line's baseline.
    pub progress_origin: (i32, i32),
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([0, 255, 0]),
            box_thickness: 2,
            label_color: Rgb([0, 0, 0]),
            label_scale: 14.0,
            label_padding: 3,
            progress_color: Rgb([0, 255, 0]),
            progress_scale: 20.0,
            progress_origin: (10, 30),
        }
    }
}

/// Where a label and its background go, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    /// Left edge of the text and of its background.
    pub x: i32,
    /// Bottom of the text line.
    pub baseline: i32,
    /// Background rows, both inclusive.
    pub background_top: i32,
    pub background_bottom: i32,
    pub text_width: u32,
    pub text_height: u32,
}

impl LabelLayout {
    /// Places a `text_width` x `text_height` label next to the box
    /// `(x1, y1, x2, y2)`.
    ///
    /// The label sits above the box, left-aligned with it. It is pushed left
    /// so its right edge meets the frame edge when it would overflow, and
    /// moves below the box when there is not enough room above.
    pub fn place(
        (x1, y1, _x2, y2): (i32, i32, i32, i32),
        (text_width, text_height): (u32, u32),
        frame_width: u32,
        padding: i32,
    ) -> Self {
        let (w, h) = (text_width as i32, text_height as i32);

        let x = if x1 + w > frame_width as i32 {
            frame_width as i32 - w
        } else {
            x1
        };

        let (baseline, background_top, background_bottom) = if y1 < h + 5 {
            (y2 + h + padding, y2 + padding, y2 + h + 2 * padding)
        } else {
            (y1 - padding, y1 - h - 2 * padding, y1 - padding)
        };

        Self {
            x,
            baseline,
            background_top,
            background_bottom,
            text_width,
            text_height,
        }
    }

    pub fn is_below(&self, box_bottom: i32) -> bool {
        self.background_top > box_bottom
    }

    pub fn right_edge(&self) -> i32 {
        self.x + self.text_width as i32
    }

    fn background(&self) -> Option<Rect> {
        let height = self.background_bottom - self.background_top + 1;
        (height > 0).then(|| {
            Rect::at(self.x, self.background_top).of_size(self.text_width + 1, height as u32)
        })
    }
}

/// Draws detections onto frames.
pub struct FrameAnnotator {
    style: AnnotationStyle,
    glyphs: Box<dyn GlyphRenderer + Send + Sync>,
}

impl FrameAnnotator {
    pub fn new(glyphs: impl GlyphRenderer + Send + Sync + 'static) -> Self {
        Self {
            style: AnnotationStyle::default(),
            glyphs: Box::new(glyphs),
        }
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    /// Computes where the label of `detection` would go on `frame_width`.
    pub fn label_layout(&self, detection: &Detection, frame_width: u32) -> LabelLayout {
        let label = detection.label();
        let size = self.glyphs.text_size(self.style.label_scale, &label);
        LabelLayout::place(
            detection.bbox.corners(),
            size,
            frame_width,
            self.style.label_padding,
        )
    }

    /// Draws a box and label for every detection above `confidence_threshold`.
    /// Returns how many were drawn.
    ///
    /// Coordinates are not validated; anything outside the frame is clipped.
    pub fn annotate(
        &self,
        frame: &mut RgbImage,
        detections: &[Detection],
        confidence_threshold: f32,
    ) -> usize {
        let mut drawn = 0;
        for detection in detections.iter().filter(|d| d.confidence > confidence_threshold) {
            self.draw_detection(frame, detection);
            drawn += 1;
        }
        drawn
    }

    fn draw_detection(&self, frame: &mut RgbImage, detection: &Detection) {
        let style = &self.style;
        let corners = detection.bbox.corners();
        draw_box(frame, corners, style.box_color, style.box_thickness);

        let label = detection.label();
        let layout = self.label_layout(detection, frame.width());
        if let Some(background) = layout.background() {
            draw_filled_rect_mut(frame, background, style.box_color);
        }
        self.glyphs.draw_text(
            frame,
            style.label_color,
            layout.x,
            layout.baseline - layout.text_height as i32,
            style.label_scale,
            &label,
        );
    }

    /// Draws the running progress line in the top-left corner.
    pub fn draw_progress(&self, frame: &mut RgbImage, text: &str) {
        let style = &self.style;
        let (_, h) = self.glyphs.text_size(style.progress_scale, text);
        let (x, baseline) = style.progress_origin;
        self.glyphs.draw_text(
            frame,
            style.progress_color,
            x,
            baseline - h as i32,
            style.progress_scale,
            text,
        );
    }
}

/// Outline of `thickness` pixels growing inward from `(x1, y1)-(x2, y2)`.
/// The stroke never extends outside the box, unlike a stroke centred on the
/// edge. Degenerate boxes draw nothing.
fn draw_box(frame: &mut RgbImage, (x1, y1, x2, y2): (i32, i32, i32, i32), color: Rgb<u8>, thickness: u32) {
    for inset in 0..thickness as i32 {
        let width = x2 - x1 + 1 - 2 * inset;
        let height = y2 - y1 + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, color);
    }
}
