use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::foundation::core::{MediaTime, PixelSize};
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::math::scale_extent;
use crate::foundation::pixels::PixelBuffer;

/// Backing scale factor under which a side-by-side composite of two eye views matches the
/// `(eye width, eye height / 2)` output geometry.
pub const DEFAULT_BACKING_SCALE: f64 = 2.0;

/// Resampling filter used when scaling each eye view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    /// Catmull-Rom cubic.
    CatmullRom,
    /// Lanczos with window 3.
    Lanczos3,
}

impl ResizeFilter {
    fn as_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Pixel layout of one side-by-side composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SideBySideLayout {
    /// Width of the left half (drawn at `x = 0`).
    pub left_width: u32,
    /// Width of the right half (drawn at `x = left_width`).
    pub right_width: u32,
    /// Destination height of both halves.
    pub height: u32,
}

impl SideBySideLayout {
    /// Size of the composite canvas.
    pub fn canvas_size(self) -> PixelSize {
        PixelSize::new(self.left_width + self.right_width, self.height)
    }
}

/// A composite image tagged with the presentation time of the sample it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeFrame {
    /// Side-by-side image.
    pub image: RgbaImage,
    /// Presentation time of the source sample.
    pub presentation_time: MediaTime,
}

/// Joins a left/right pair into one side-by-side image.
///
/// Reported pixel sizes are divided by the backing scale factor before layout. The compositor
/// holds no per-frame state; `compose` is deterministic for identical inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Compositor {
    backing_scale: f64,
    filter: ResizeFilter,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            backing_scale: DEFAULT_BACKING_SCALE,
            filter: ResizeFilter::default(),
        }
    }
}

impl Compositor {
    /// Create a compositor for the given backing scale factor.
    pub fn new(backing_scale: f64) -> FlatviewResult<Self> {
        if !backing_scale.is_finite() || backing_scale <= 0.0 {
            return Err(FlatviewError::validation(format!(
                "backing scale factor must be finite and > 0, got {backing_scale}"
            )));
        }
        Ok(Self {
            backing_scale,
            filter: ResizeFilter::default(),
        })
    }

    /// Use `filter` for resampling.
    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Configured backing scale factor.
    pub fn backing_scale(&self) -> f64 {
        self.backing_scale
    }

    /// Compute the layout for a pair of the given sizes.
    pub fn layout(&self, left: PixelSize, right: PixelSize) -> FlatviewResult<SideBySideLayout> {
        if left.height != right.height {
            return Err(FlatviewError::validation(format!(
                "eye views differ in height: left {left}, right {right}"
            )));
        }
        let layout = SideBySideLayout {
            left_width: scale_extent(left.width, self.backing_scale),
            right_width: scale_extent(right.width, self.backing_scale),
            height: scale_extent(left.height, self.backing_scale),
        };
        if layout.left_width == 0 || layout.right_width == 0 || layout.height == 0 {
            return Err(FlatviewError::validation(format!(
                "eye views {left} / {right} collapse to an empty composite at scale {}",
                self.backing_scale
            )));
        }
        Ok(layout)
    }

    /// Draw `left` at the origin and `right` beside it, both at the destination height.
    pub fn compose(&self, left: &RgbaImage, right: &RgbaImage) -> FlatviewResult<RgbaImage> {
        let layout = self.layout(
            PixelSize::new(left.width(), left.height()),
            PixelSize::new(right.width(), right.height()),
        )?;
        let canvas = layout.canvas_size();
        let mut out = RgbaImage::new(canvas.width, canvas.height);

        let left = self.fit(left, layout.left_width, layout.height);
        imageops::replace(&mut out, &left, 0, 0);
        let right = self.fit(right, layout.right_width, layout.height);
        imageops::replace(&mut out, &right, i64::from(layout.left_width), 0);
        Ok(out)
    }

    /// Convert decoded buffers to images and compose them.
    pub fn compose_buffers(
        &self,
        left: &PixelBuffer,
        right: &PixelBuffer,
    ) -> FlatviewResult<RgbaImage> {
        // Reject mismatched pairs before paying for two conversions.
        self.layout(left.size(), right.size())?;
        self.compose(&left.to_rgba_image()?, &right.to_rgba_image()?)
    }

    fn fit(&self, img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if img.width() == width && img.height() == height {
            return img.clone();
        }
        imageops::resize(img, width, height, self.filter.as_image_filter())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
