/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImgDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImgDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Uniform scale factor that fits `self` inside `bound`.
    pub fn fit_scale(&self, bound: ImgDimensions) -> f64 {
        let sx = bound.width as f64 / self.width.max(1) as f64;
        let sy = bound.height as f64 / self.height.max(1) as f64;
        sx.min(sy)
    }

    /// Scales `self` by [`Self::fit_scale`], flooring the free side and never
    /// going below a single pixel.
    ///
    /// Integer arithmetic, so the limiting side lands exactly on the bound.
    pub fn fit_within(&self, bound: ImgDimensions) -> ImgDimensions {
        let (w, h) = (self.width.max(1) as u64, self.height.max(1) as u64);
        let (bw, bh) = (bound.width as u64, bound.height as u64);
        let (width, height) = if bw * h <= bh * w {
            (bw, h * bw / w)
        } else {
            (w * bh / h, bh)
        };
        ImgDimensions {
            width: (width as u32).max(1),
            height: (height as u32).max(1),
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

impl std::fmt::Display for ImgDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
