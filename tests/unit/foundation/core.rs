use super::*;

#[test]
fn media_time_orders_across_timescales() {
    let a = MediaTime::new(1, 30).unwrap();
    let b = MediaTime::new(1001, 30_000).unwrap();
    let c = MediaTime::from_millis(34);
    assert!(a < b);
    assert!(b < c);
    assert_eq!(MediaTime::new(2, 60).unwrap(), a);
    assert!(MediaTime::new(1, 0).is_err());
}

#[test]
fn media_time_from_secs_rounds_to_timescale() {
    let t = MediaTime::from_secs_f64(0.0333, 600).unwrap();
    assert_eq!(t.value, 20);
    assert!(MediaTime::from_secs_f64(f64::NAN, 600).is_err());
}

#[test]
fn fps_parse_ratio() {
    assert_eq!(Fps::parse_ratio("30000/1001").unwrap(), Fps::new(30000, 1001).unwrap());
    assert_eq!(Fps::parse_ratio("30").unwrap(), Fps::new(30, 1).unwrap());
    assert!(Fps::parse_ratio("0/0").is_err());
    assert!(Fps::parse_ratio("abc").is_err());
}

#[test]
fn fps_frame_time_is_exact() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frame_time(30), MediaTime::new(1, 1).unwrap());
}

#[test]
fn identity_orientation_keeps_size() {
    let g = TrackGeometry {
        orientation: Orientation::identity(),
        natural_size: PixelSize::new(3840, 1920),
    };
    assert_eq!(g.applied_size(), PixelSize::new(3840, 1920));
    assert_eq!(g.output_size(), PixelSize::new(3840, 960));
}

#[test]
fn rotated_orientation_swaps_dimensions_with_absolute_values() {
    for deg in [90.0, -90.0, 270.0] {
        let o = Orientation::from_display_rotation(deg);
        assert_eq!(
            o.apply_to_size(PixelSize::new(1920, 1080)),
            PixelSize::new(1080, 1920)
        );
    }
    let upside_down = Orientation::from_display_rotation(180.0);
    assert_eq!(
        upside_down.apply_to_size(PixelSize::new(1920, 1080)),
        PixelSize::new(1920, 1080)
    );
}

#[test]
fn rotation_degrees_round_trips() {
    assert_eq!(Orientation::from_display_rotation(90.0).rotation_degrees(), 90.0);
    assert_eq!(Orientation::from_display_rotation(-90.0).rotation_degrees(), -90.0);
    assert_eq!(Orientation::from_display_rotation(180.0).rotation_degrees(), 180.0);
    assert_eq!(Orientation::identity().rotation_degrees(), 0.0);
    assert!(!Orientation::identity().is_mirrored());
}

#[test]
fn pixel_size_predicates() {
    assert!(PixelSize::new(0, 10).is_empty());
    assert!(PixelSize::new(10, 10).is_even());
    assert!(!PixelSize::new(11, 10).is_even());
}
