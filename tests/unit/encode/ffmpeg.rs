use super::*;
use crate::encode::pool::{PixelBufferPool, PoolConfig};
use crate::foundation::core::{Orientation, PixelSize};
use crate::foundation::pixels::PixelFormat;

fn settings(codec: OutputCodec, orientation: Orientation) -> VideoInputSettings {
    VideoInputSettings {
        size: PixelSize::new(64, 32),
        orientation,
        codec,
        frame_rate: Fps::new(30000, 1001).unwrap(),
        pixel_format: PixelFormat::Argb8,
    }
}

fn args_of(opts: &FfmpegWriterOpts, s: &VideoInputSettings) -> Vec<String> {
    encoder_args(opts, s)
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let i = args.iter().position(|a| a == flag)?;
    args.get(i + 1).map(String::as_str)
}

#[test]
fn slots_follow_presentation_time() {
    let fps = Fps::new(30, 1).unwrap();
    let start = MediaTime::from_millis(1);
    assert_eq!(presentation_slot(start, start, fps), 0);
    assert_eq!(presentation_slot(MediaTime::from_millis(34), start, fps), 1);
    assert_eq!(presentation_slot(MediaTime::new(10, 1).unwrap(), start, fps), 300);
    // Before the session start clamps to the first slot.
    assert_eq!(presentation_slot(MediaTime::ZERO, start, fps), 0);
}

#[test]
fn args_describe_raw_argb_input_and_h264_output() {
    let opts = FfmpegWriterOpts::new("target/out.mp4");
    let args = args_of(&opts, &settings(OutputCodec::H264, Orientation::identity()));
    assert_eq!(args.first().map(String::as_str), Some("-y"));
    assert_eq!(after(&args, "-pix_fmt"), Some("argb"));
    assert_eq!(after(&args, "-s"), Some("64x32"));
    assert_eq!(after(&args, "-r"), Some("30000/1001"));
    assert_eq!(after(&args, "-c:v"), Some("libx264"));
    assert!(!args.iter().any(|a| a.starts_with("-display_rotation")));
    assert!(!args.iter().any(|a| a == "-tag:v"));
    assert_eq!(args.last().map(String::as_str), Some("target/out.mp4"));
}

#[test]
fn args_carry_rotation_and_hevc_tag() {
    let mut opts = FfmpegWriterOpts::new("out.mov");
    opts.overwrite = false;
    let args = args_of(
        &opts,
        &settings(OutputCodec::Hevc, Orientation::from_display_rotation(90.0)),
    );
    assert_eq!(args.first().map(String::as_str), Some("-n"));
    assert_eq!(after(&args, "-display_rotation:v:0"), Some("90"));
    assert_eq!(after(&args, "-c:v"), Some("libx265"));
    assert_eq!(after(&args, "-tag:v"), Some("hvc1"));
    let rot = args.iter().position(|a| a == "-display_rotation:v:0").unwrap();
    let input = args.iter().position(|a| a == "-i").unwrap();
    assert!(rot < input);
}

#[test]
fn feed_repeats_gaps_and_replaces_duplicates() {
    let pool = PixelBufferPool::new(PoolConfig {
        size: PixelSize::new(1, 1),
        format: PixelFormat::Argb8,
        max_buffers: 8,
    })
    .unwrap();
    let in_flight = AtomicUsize::new(0);
    let (tx, rx) = mpsc::sync_channel(8);
    for (slot, v) in [(0u64, 1u8), (0, 2), (2, 3), (3, 4)] {
        let mut buffer = pool.try_acquire(PixelFormat::Argb8).unwrap();
        buffer.lock().row_mut(0).copy_from_slice(&[255, v, v, v]);
        in_flight.fetch_add(1, Ordering::AcqRel);
        tx.send(FeedMsg { slot, buffer }).unwrap();
    }
    drop(tx);

    let mut out = Vec::new();
    let written = feed_frames(&mut out, rx, &in_flight).unwrap();
    assert_eq!(written, 4);
    let firsts: Vec<u8> = out.chunks_exact(4).map(|px| px[1]).collect();
    assert_eq!(firsts, vec![2, 2, 3, 4]);
    assert_eq!(in_flight.load(Ordering::Acquire), 0);
    assert_eq!(pool.stats().outstanding, 0);
}

#[test]
fn writer_is_not_ready_before_start() {
    let w = FfmpegWriter::new(FfmpegWriterOpts::new("target/never.mp4"));
    assert!(!w.is_ready_for_more_media_data());
    assert_eq!(w.status(), WriterStatus::Unknown);
}

#[test]
fn odd_sizes_are_refused() {
    let mut w = FfmpegWriter::new(FfmpegWriterOpts::new("target/never.mp4"));
    let mut s = settings(OutputCodec::H264, Orientation::identity());
    s.size = PixelSize::new(63, 32);
    assert!(w.add_video_input(&s).is_err());
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn start_writing_requires_media_feature() {
    let out = std::path::PathBuf::from("target").join("ffmpeg_unit").join("disabled.mp4");
    let mut w = FfmpegWriter::new(FfmpegWriterOpts::new(out.clone()));
    w.add_video_input(&settings(OutputCodec::H264, Orientation::identity()))
        .unwrap();
    let err = w.start_writing().unwrap_err();
    assert!(matches!(err, FlatviewError::SinkOpen(_)));
    assert_eq!(w.status(), WriterStatus::Unknown);
    assert!(!out.exists());
}
