use image::Rgba;

use super::*;
use crate::encode::memory::InMemoryWriter;

fn cfg(w: u32, h: u32) -> SinkConfig {
    SinkConfig {
        size: PixelSize::new(w, h),
        orientation: Orientation::identity(),
        codec: OutputCodec::H264,
        frame_rate: Fps::new(30, 1).unwrap(),
        session_start: DEFAULT_SESSION_START,
        pool_buffers: 2,
        background: [0, 0, 0],
    }
}

fn frame(w: u32, h: u32, v: u8) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
}

#[test]
fn open_rejects_bad_geometry() {
    for c in [cfg(0, 4), cfg(5, 4)] {
        let err = EncodingSink::open(InMemoryWriter::new(), c).err().unwrap();
        assert!(matches!(err, FlatviewError::SinkOpen(_)));
    }
    let mut c = cfg(4, 4);
    c.session_start = MediaTime::from_millis(-5);
    assert!(EncodingSink::open(InMemoryWriter::new(), c).is_err());
    let mut c = cfg(4, 4);
    c.pool_buffers = 0;
    assert!(EncodingSink::open(InMemoryWriter::new(), c).is_err());
}

#[test]
fn open_maps_writer_refusal_to_sink_open() {
    let w = InMemoryWriter::new().failing_input("no such codec");
    let err = EncodingSink::open(w, cfg(4, 4)).err().unwrap();
    assert!(matches!(err, FlatviewError::SinkOpen(_)));
    assert!(err.to_string().contains("no such codec"));
}

#[test]
fn open_configures_writer_and_session() {
    let w = InMemoryWriter::new();
    let rec = w.recording();
    let sink = EncodingSink::open(w, cfg(8, 4)).unwrap();
    assert_eq!(sink.size(), PixelSize::new(8, 4));
    let rec = rec.lock().unwrap();
    let settings = rec.settings.as_ref().unwrap();
    assert_eq!(settings.size, PixelSize::new(8, 4));
    assert_eq!(settings.pixel_format, PixelFormat::Argb8);
    assert_eq!(rec.session_start, Some(DEFAULT_SESSION_START));
}

#[test]
fn not_ready_allocates_nothing() {
    let w = InMemoryWriter::new().with_readiness(|_| false);
    let mut sink = EncodingSink::open(w, cfg(4, 2)).unwrap();
    let out = sink.append_detailed(&frame(4, 2, 9), MediaTime::from_millis(1));
    assert_eq!(out, AppendOutcome::NotReady);
    assert!(out.is_transient());
    assert_eq!(sink.pool().stats().allocated, 0);
    assert_eq!(sink.last_accepted(), None);
}

#[test]
fn size_mismatch_is_rejected() {
    let mut sink = EncodingSink::open(InMemoryWriter::new(), cfg(4, 2)).unwrap();
    let out = sink.append_detailed(&frame(6, 2, 9), MediaTime::from_millis(1));
    assert_eq!(out, AppendOutcome::SizeMismatch);
    assert!(!out.is_transient());
}

#[test]
fn timestamps_must_not_go_backwards() {
    let w = InMemoryWriter::new();
    let rec = w.recording();
    let mut sink = EncodingSink::open(w, cfg(4, 2)).unwrap();
    assert!(sink.append(&frame(4, 2, 1), MediaTime::from_millis(100)));
    assert_eq!(sink.last_accepted(), Some(MediaTime::from_millis(100)));
    assert_eq!(
        sink.append_detailed(&frame(4, 2, 2), MediaTime::from_millis(50)),
        AppendOutcome::OutOfOrder
    );
    assert!(sink.append(&frame(4, 2, 3), MediaTime::from_millis(100)));
    assert_eq!(rec.lock().unwrap().frames.len(), 2);
}

#[test]
fn one_render_context_serves_every_append() {
    let w = InMemoryWriter::new();
    let rec = w.recording();
    let mut sink = EncodingSink::open(w, cfg(4, 2)).unwrap();
    for i in 0..5 {
        assert!(sink.append(&frame(4, 2, i as u8 * 10), MediaTime::from_millis(i * 33)));
    }
    assert_eq!(sink.render_context().renders(), 5);
    // Buffers come back to the pool after each append.
    assert_eq!(sink.pool().stats().outstanding, 0);
    assert!(sink.pool().stats().allocated <= 2);

    let rec = rec.lock().unwrap();
    let prints: Vec<u64> = rec.frames.iter().map(|f| f.fingerprint).collect();
    assert_ne!(prints[0], prints[1]);
}

#[tokio::test]
async fn finish_loads_output() {
    let mut sink = EncodingSink::open(InMemoryWriter::new(), cfg(4, 2)).unwrap();
    for i in 0..30 {
        let pts = MediaTime::new(1 + i * 1000 / 30, 1000).unwrap();
        assert!(sink.append(&frame(4, 2, 0), pts));
    }
    let out = sink.finish().await.unwrap();
    assert_eq!(out.frame_count, Some(30));
    assert_eq!(out.size, Some(PixelSize::new(4, 2)));
    assert!((out.duration.as_secs_f64() - 1.0).abs() < 1.0 / 30.0);
}

#[tokio::test]
async fn failed_writer_is_a_finalize_error() {
    let w = InMemoryWriter::new().failing_finish("disk full");
    let sink = EncodingSink::open(w, cfg(4, 2)).unwrap();
    let err = sink.finish().await.unwrap_err();
    assert!(matches!(err, FlatviewError::Finalize(_)));
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn cancel_tears_the_writer_down() {
    let w = InMemoryWriter::new();
    let rec = w.recording();
    let sink = EncodingSink::open(w, cfg(4, 2)).unwrap();
    sink.cancel();
    assert!(rec.lock().unwrap().cancelled);
}
