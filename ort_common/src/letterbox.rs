use image::{Rgb, RgbImage, imageops};
use inference_common::bbox::BBox;
use inference_common::img_dimensions::ImgDimensions;
use inference_common::resize::FrameResizer;
use ndarray::Array4;

/// Padding colour used by Ultralytics when letterboxing.
const PAD_VALUE: u8 = 114;

/// Aspect-preserving fit of a frame into a square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub input_size: u32,
    pub scale: f32,
    pub scaled: ImgDimensions,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(frame: ImgDimensions, input_size: u32) -> Self {
        let scale = (input_size as f32 / frame.width.max(1) as f32)
            .min(input_size as f32 / frame.height.max(1) as f32);
        let scaled = ImgDimensions::new(
            ((frame.width as f32 * scale).round() as u32).clamp(1, input_size),
            ((frame.height as f32 * scale).round() as u32).clamp(1, input_size),
        );
        Self {
            input_size,
            scale,
            scaled,
            pad_x: (input_size - scaled.width) / 2,
            pad_y: (input_size - scaled.height) / 2,
        }
    }

    /// NCHW `[1, 3, S, S]` tensor in `[0, 1]`.
    pub fn tensor(&self, frame: &RgbImage, resizer: &mut FrameResizer) -> anyhow::Result<Array4<f32>> {
        let resized = resizer.resize(frame, self.scaled)?;
        let mut canvas = RgbImage::from_pixel(self.input_size, self.input_size, Rgb([PAD_VALUE; 3]));
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);

        let size = self.input_size as usize;
        Ok(Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        }))
    }

    /// Maps a box from model-input space back onto the original frame.
    pub fn unmap(&self, bbox: BBox) -> BBox {
        let (px, py) = (self.pad_x as f32, self.pad_y as f32);
        BBox::new(
            (bbox.xmin - px) / self.scale,
            (bbox.ymin - py) / self.scale,
            (bbox.xmax - px) / self.scale,
            (bbox.ymax - py) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_pads_vertically() {
        let lb = Letterbox::new(ImgDimensions::new(1280, 720), 640);
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.scaled, ImgDimensions::new(640, 360));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 140));
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox::new(ImgDimensions::new(1280, 720), 640);
        let model_space = BBox::new(100.0, 190.0, 200.0, 240.0);
        assert_eq!(lb.unmap(model_space), BBox::new(200.0, 100.0, 400.0, 200.0));
    }

    #[test]
    fn test_tensor_layout_and_padding() {
        let lb = Letterbox::new(ImgDimensions::new(64, 32), 32);
        let frame = RgbImage::from_pixel(64, 32, Rgb([255, 0, 51]));
        let t = lb.tensor(&frame, &mut FrameResizer::default()).unwrap();
        assert_eq!(t.shape(), &[1, 3, 32, 32]);
        // Row 0 is padding, row 16 is image content.
        assert!((t[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
        assert!((t[[0, 0, 16, 16]] - 1.0).abs() < 1e-6);
        assert!(t[[0, 1, 16, 16]].abs() < 1e-6);
        assert!((t[[0, 2, 16, 16]] - 0.2).abs() < 1e-6);
    }
}
