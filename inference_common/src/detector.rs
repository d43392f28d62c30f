use image::RgbImage;

use crate::detection::Detection;

/// Anything that can find objects in a frame.
///
/// Boxes are returned in pixel coordinates of the frame that was passed in.
pub trait Detector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}
