use anyhow::Context;
use fast_image_resize as fr;
use image::RgbImage;

use crate::img_dimensions::ImgDimensions;

/// Reusable SIMD resizer for packed RGB frames.
pub struct FrameResizer {
    resizer: fr::Resizer,
    options: fr::ResizeOptions,
}

impl Default for FrameResizer {
    fn default() -> Self {
        Self {
            resizer: fr::Resizer::new(),
            options: fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        }
    }
}

impl FrameResizer {
    /// Resizes `frame` to `dims`. Returns a copy when the size already matches.
    pub fn resize(&mut self, frame: &RgbImage, dims: ImgDimensions) -> anyhow::Result<RgbImage> {
        if frame.width() == dims.width && frame.height() == dims.height {
            return Ok(frame.clone());
        }
        let src = fr::images::ImageRef::new(
            frame.width(),
            frame.height(),
            frame.as_raw(),
            fr::PixelType::U8x3,
        )
        .context("source frame does not match its dimensions")?;
        let mut dst = fr::images::Image::new(dims.width, dims.height, fr::PixelType::U8x3);
        self.resizer
            .resize(&src, &mut dst, Some(&self.options))
            .with_context(|| format!("resizing {}x{} to {dims}", frame.width(), frame.height()))?;
        RgbImage::from_raw(dims.width, dims.height, dst.into_vec())
            .context("resized buffer has unexpected length")
    }
}
