use super::*;

#[test]
fn progress_is_clamped_and_monotonic() {
    let dur = MediaTime::new(10, 1).unwrap();
    let mut p = ProgressState::default();
    assert_eq!(p.advance(MediaTime::new(5, 1).unwrap(), dur), 0.5);
    // A late timestamp never moves progress backwards.
    assert_eq!(p.advance(MediaTime::new(4, 1).unwrap(), dur), 0.5);
    assert_eq!(p.advance(MediaTime::new(12, 1).unwrap(), dur), 1.0);
}

#[test]
fn zero_duration_keeps_ratio() {
    let mut p = ProgressState::default();
    assert_eq!(p.advance(MediaTime::from_millis(10), MediaTime::ZERO), 0.0);
    assert_eq!(p.complete(), 1.0);
}
