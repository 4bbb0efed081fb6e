use image::Rgba;

use super::*;
use crate::foundation::pixels::PixelFormat;

fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(px))
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn default_scale_halves_both_eyes() {
    let c = Compositor::default();
    let out = c.compose(&solid(64, 32, RED), &solid(64, 32, BLUE)).unwrap();
    assert_eq!((out.width(), out.height()), (64, 16));
}

#[test]
fn output_geometry_is_sum_of_scaled_halves() {
    for scale in [1.0, 2.0, 4.0] {
        let c = Compositor::new(scale).unwrap();
        let out = c.compose(&solid(40, 20, RED), &solid(24, 20, BLUE)).unwrap();
        let expected_w = scale_extent(40, scale) + scale_extent(24, scale);
        assert_eq!(out.width(), expected_w);
        assert_eq!(out.height(), scale_extent(20, scale));
    }
}

#[test]
fn left_is_drawn_left_and_right_is_drawn_right() {
    let c = Compositor::new(2.0).unwrap().with_filter(ResizeFilter::Nearest);
    let out = c.compose(&solid(16, 8, RED), &solid(16, 8, BLUE)).unwrap();
    assert_eq!(out.get_pixel(0, 0).0, RED);
    assert_eq!(out.get_pixel(7, 3).0, RED);
    assert_eq!(out.get_pixel(8, 0).0, BLUE);
    assert_eq!(out.get_pixel(15, 3).0, BLUE);
}

#[test]
fn unit_scale_is_a_plain_concatenation() {
    let c = Compositor::new(1.0).unwrap();
    let out = c.compose(&solid(3, 2, RED), &solid(3, 2, BLUE)).unwrap();
    assert_eq!((out.width(), out.height()), (6, 2));
    assert_eq!(out.get_pixel(2, 1).0, RED);
    assert_eq!(out.get_pixel(3, 1).0, BLUE);
}

#[test]
fn compose_is_deterministic() {
    let c = Compositor::default();
    let mut left = solid(32, 16, RED);
    left.put_pixel(5, 5, Rgba([1, 2, 3, 255]));
    let right = solid(32, 16, BLUE);
    let a = c.compose(&left, &right).unwrap();
    let b = c.compose(&left, &right).unwrap();
    assert_eq!(a, b);
}

#[test]
fn mismatched_heights_are_rejected() {
    let c = Compositor::default();
    assert!(matches!(
        c.compose(&solid(8, 8, RED), &solid(8, 6, BLUE)),
        Err(FlatviewError::Validation(_))
    ));
}

#[test]
fn invalid_scale_is_rejected() {
    assert!(Compositor::new(0.0).is_err());
    assert!(Compositor::new(-2.0).is_err());
    assert!(Compositor::new(f64::NAN).is_err());
}

#[test]
fn compose_buffers_accepts_decoder_buffers() {
    let c = Compositor::default();
    let l = PixelBuffer::new(4, 4, PixelFormat::Rgba8, vec![255; 64]).unwrap();
    let r = PixelBuffer::new(4, 4, PixelFormat::Rgba8, vec![0; 64]).unwrap();
    let out = c.compose_buffers(&l, &r).unwrap();
    assert_eq!((out.width(), out.height()), (4, 2));
}
