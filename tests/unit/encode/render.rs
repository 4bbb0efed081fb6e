use image::Rgba;

use super::*;
use crate::encode::pool::{PixelBufferPool, PoolConfig};
use crate::foundation::core::PixelSize;

fn pool(w: u32, h: u32, format: PixelFormat) -> PixelBufferPool {
    PixelBufferPool::new(PoolConfig {
        size: PixelSize::new(w, h),
        format,
        max_buffers: 2,
    })
    .unwrap()
}

#[test]
fn opaque_pixels_are_reordered_to_argb() {
    let mut ctx = RenderContext::new(PixelFormat::Argb8, [0, 0, 0]);
    let p = pool(2, 1, PixelFormat::Argb8);
    let mut buf = p.try_acquire(PixelFormat::Argb8).unwrap();
    let img = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
    ctx.render(&img, &mut buf).unwrap();
    assert_eq!(buf.bytes(), &[255, 10, 20, 30, 255, 10, 20, 30]);
    assert_eq!(ctx.renders(), 1);
}

#[test]
fn transparent_pixels_become_background() {
    let mut ctx = RenderContext::new(PixelFormat::Argb8, [10, 20, 30]);
    let p = pool(1, 1, PixelFormat::Argb8);
    let mut buf = p.try_acquire(PixelFormat::Argb8).unwrap();
    let img = RgbaImage::from_pixel(1, 1, Rgba([200, 200, 200, 0]));
    ctx.render(&img, &mut buf).unwrap();
    assert_eq!(buf.bytes(), &[255, 10, 20, 30]);
}

#[test]
fn half_alpha_blends_over_black() {
    let mut ctx = RenderContext::new(PixelFormat::Rgba8, [0, 0, 0]);
    let p = pool(1, 1, PixelFormat::Rgba8);
    let mut buf = p.try_acquire(PixelFormat::Rgba8).unwrap();
    let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128]));
    ctx.render(&img, &mut buf).unwrap();
    assert_eq!(buf.bytes(), &[128, 0, 0, 255]);
}

#[test]
fn size_mismatch_is_an_error_and_buffer_still_returns() {
    let mut ctx = RenderContext::new(PixelFormat::Argb8, [0, 0, 0]);
    let p = pool(4, 4, PixelFormat::Argb8);
    let mut buf = p.try_acquire(PixelFormat::Argb8).unwrap();
    let img = RgbaImage::new(2, 2);
    assert!(ctx.render(&img, &mut buf).is_err());
    assert_eq!(ctx.renders(), 0);
    drop(buf);
    assert_eq!(p.stats().outstanding, 0);
}

#[test]
fn context_is_reused_across_frames() {
    let mut ctx = RenderContext::new(PixelFormat::Argb8, [0, 0, 0]);
    let p = pool(2, 2, PixelFormat::Argb8);
    let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
    for _ in 0..5 {
        let mut buf = p.try_acquire(PixelFormat::Argb8).unwrap();
        ctx.render(&img, &mut buf).unwrap();
    }
    assert_eq!(ctx.renders(), 5);
    assert_eq!(p.stats().allocated, 1);
}
