use super::*;

fn plan(times: Vec<MediaTime>) -> StereoDecodePlan {
    StereoDecodePlan {
        source_path: PathBuf::from("in.mov"),
        stream_index: 0,
        view_size: PixelSize::new(2, 1),
        presentation_times: times,
        frame_rate: Fps::new(30, 1).unwrap(),
    }
}

#[test]
fn stacked_frame_splits_top_left_bottom_right() {
    let p = plan(vec![MediaTime::new(3003, 90_000).unwrap()]);
    let bytes: Vec<u8> = (0..16).collect();
    let sample = p.split_frame(0, bytes).unwrap();
    assert_eq!(sample.presentation_time, MediaTime::new(3003, 90_000).unwrap());

    let (left, right) = crate::demux::demuxer::demux(&sample).unwrap();
    assert_eq!(left.data(), &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(right.data(), &[8, 9, 10, 11, 12, 13, 14, 15]);
    assert_eq!(left.size(), PixelSize::new(2, 1));
}

#[test]
fn short_frame_is_an_incomplete_sample() {
    let err = plan(Vec::new()).split_frame(4, vec![0; 10]).unwrap_err();
    assert!(err.is_per_sample());
}

#[test]
fn missing_timestamps_fall_back_to_frame_rate() {
    let p = plan(vec![MediaTime::ZERO]);
    assert_eq!(p.presentation_time(0), MediaTime::ZERO);
    assert_eq!(p.presentation_time(30), MediaTime::new(1, 1).unwrap());
}

#[test]
fn args_select_both_views_by_position() {
    let mut p = plan(Vec::new());
    p.stream_index = 1;
    let args: Vec<String> = p
        .ffmpeg_args()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let views = args.iter().position(|a| a == "-view_ids").unwrap();
    assert_eq!(args[views + 1], "-1");
    assert!(args.iter().any(|a| a.contains("[0:1:vpos:left][0:1:vpos:right]vstack")));
    assert!(args.iter().any(|a| a == "-noautorotate"));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
}

#[test]
fn read_frame_distinguishes_clean_and_truncated_eof() {
    let mut buf = [0u8; 4];
    let mut empty: &[u8] = &[];
    assert!(!read_frame(&mut empty, &mut buf).unwrap());

    let mut full: &[u8] = &[1, 2, 3, 4, 5];
    assert!(read_frame(&mut full, &mut buf).unwrap());
    assert_eq!(buf, [1, 2, 3, 4]);
    assert!(read_frame(&mut full, &mut buf).is_err());
}

#[cfg(feature = "media-ffmpeg")]
#[tokio::test(flavor = "current_thread")]
async fn unreadable_input_surfaces_decoder_failure() {
    if !crate::encode::ffmpeg::is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let mut p = plan(Vec::new());
    p.source_path = PathBuf::from("target").join("decode_unit").join("missing.mov");

    let mut source = FfmpegStereoSource::spawn(p.clone(), DEFAULT_DECODE_QUEUE).unwrap();
    let err = source.next_sample().await.unwrap_err();
    assert!(matches!(err, FlatviewError::InvalidVideo(_)), "{err}");
    drop(source);

    // Dropped while the decoder may still be running; teardown moves off the async thread.
    let running = FfmpegStereoSource::spawn(p, DEFAULT_DECODE_QUEUE).unwrap();
    drop(running);
}

#[cfg(not(feature = "media-ffmpeg"))]
#[test]
fn spawn_requires_media_feature() {
    let err = FfmpegStereoSource::spawn(plan(Vec::new()), DEFAULT_DECODE_QUEUE)
        .err()
        .unwrap();
    assert!(matches!(err, FlatviewError::InvalidVideo(_)));
}
