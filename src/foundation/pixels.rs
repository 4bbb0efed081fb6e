use image::RgbaImage;

use crate::foundation::core::PixelSize;
use crate::foundation::error::{FlatviewError, FlatviewResult};

/// Byte layout of a 32-bit packed pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// `R, G, B, A` byte order (decoder output).
    Rgba8,
    /// `A, R, G, B` byte order (encoder input).
    Argb8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    /// The matching `ffmpeg` `-pix_fmt` name.
    pub const fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgba8 => "rgba",
            Self::Argb8 => "argb",
        }
    }
}

/// A single-plane 32-bit pixel buffer with an explicit row stride.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap tightly packed bytes (`stride = width * 4`).
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> FlatviewResult<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::with_stride(width, height, format, stride, data)
    }

    /// Wrap bytes whose rows are `stride` bytes apart.
    pub fn with_stride(
        width: u32,
        height: u32,
        format: PixelFormat,
        stride: usize,
        data: Vec<u8>,
    ) -> FlatviewResult<Self> {
        let row = width as usize * format.bytes_per_pixel();
        if stride < row {
            return Err(FlatviewError::validation(format!(
                "pixel buffer stride {stride} is smaller than a {width}px row"
            )));
        }
        let needed = stride * (height as usize).saturating_sub(1) + row;
        if height > 0 && data.len() < needed {
            return Err(FlatviewError::validation(format!(
                "pixel buffer {width}x{height} needs {needed} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            stride,
            data,
        })
    }

    /// Copy an RGBA image into a tightly packed [`PixelFormat::Rgba8`] buffer.
    pub fn from_rgba_image(img: &RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            format: PixelFormat::Rgba8,
            stride: img.width() as usize * 4,
            data: img.as_raw().clone(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel size.
    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Byte layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw bytes including any row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel bytes of row `y` without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.format.bytes_per_pixel()]
    }

    /// Convert to a straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> FlatviewResult<RgbaImage> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            let row = self.row(y);
            match self.format {
                PixelFormat::Rgba8 => out.extend_from_slice(row),
                PixelFormat::Argb8 => {
                    for px in row.chunks_exact(4) {
                        out.extend_from_slice(&[px[1], px[2], px[3], px[0]]);
                    }
                }
            }
        }
        RgbaImage::from_raw(self.width, self.height, out).ok_or_else(|| {
            FlatviewError::validation("pixel buffer did not convert into an rgba image")
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/pixels.rs"]
mod tests;
