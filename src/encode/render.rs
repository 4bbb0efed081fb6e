use image::RgbaImage;

use crate::encode::pool::PooledBuffer;
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::math::mul_div255_u8;
use crate::foundation::pixels::PixelFormat;

/// Renders composite images into encoder pixel buffers.
///
/// Construction builds a 64 KiB blend table, so build one context per conversion and reuse it for
/// every frame. Rendering takes `&mut self`; a context must not be shared between concurrent
/// renders.
pub struct RenderContext {
    target: PixelFormat,
    background: [u8; 3],
    // blend[c * 256 + a] = c * a / 255
    blend: Box<[u8]>,
    renders: u64,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("target", &self.target)
            .field("background", &self.background)
            .field("renders", &self.renders)
            .finish()
    }
}

impl RenderContext {
    /// Create a context rendering into `target` buffers, flattening alpha over `background`.
    pub fn new(target: PixelFormat, background: [u8; 3]) -> Self {
        let mut blend = vec![0u8; 256 * 256].into_boxed_slice();
        for c in 0..256u16 {
            for a in 0..256u16 {
                blend[usize::from(c) * 256 + usize::from(a)] = mul_div255_u8(c, a);
            }
        }
        Self {
            target,
            background,
            blend,
            renders: 0,
        }
    }

    /// Pixel format of the buffers this context renders into.
    pub fn target_format(&self) -> PixelFormat {
        self.target
    }

    /// Number of successful renders so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Render straight-alpha `image` into `dst` as opaque pixels.
    ///
    /// The buffer is locked only for the duration of the copy.
    pub fn render(&mut self, image: &RgbaImage, dst: &mut PooledBuffer) -> FlatviewResult<()> {
        let size = dst.size();
        if image.width() != size.width || image.height() != size.height {
            return Err(FlatviewError::validation(format!(
                "render size mismatch: image {}x{}, buffer {size}",
                image.width(),
                image.height()
            )));
        }
        if dst.format() != self.target {
            return Err(FlatviewError::validation(format!(
                "render format mismatch: context renders {:?}, buffer holds {:?}",
                self.target,
                dst.format()
            )));
        }

        let row_bytes = size.width as usize * 4;
        let src = image.as_raw();
        let mut px = dst.lock();
        for y in 0..size.height {
            let src_row = &src[y as usize * row_bytes..(y as usize + 1) * row_bytes];
            let dst_row = &mut px.row_mut(y)[..row_bytes];
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                let [r, g, b] = self.flatten(s);
                match self.target {
                    PixelFormat::Argb8 => d.copy_from_slice(&[255, r, g, b]),
                    PixelFormat::Rgba8 => d.copy_from_slice(&[r, g, b, 255]),
                }
            }
        }
        drop(px);

        self.renders += 1;
        Ok(())
    }

    fn flatten(&self, s: &[u8]) -> [u8; 3] {
        let a = s[3];
        if a == 255 {
            return [s[0], s[1], s[2]];
        }
        let inv = 255 - a;
        let mut out = [0u8; 3];
        for i in 0..3 {
            let fg = self.blend[usize::from(s[i]) * 256 + usize::from(a)];
            let bg = self.blend[usize::from(self.background[i]) * 256 + usize::from(inv)];
            out[i] = fg.saturating_add(bg);
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/render.rs"]
mod tests;
