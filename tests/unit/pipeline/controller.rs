use std::collections::BTreeMap;

use super::*;
use crate::foundation::core::Orientation;

fn asset_with(track: VideoTrackInfo, secs: i64) -> SpatialVideoAsset {
    SpatialVideoAsset {
        source_path: PathBuf::from("in.mov"),
        duration: MediaTime::new(secs, 1).unwrap(),
        metadata: BTreeMap::new(),
        video_tracks: vec![track],
        presentation_times: Vec::new(),
    }
}

fn track(frame_rate: Option<Fps>, frame_count: Option<u64>) -> VideoTrackInfo {
    VideoTrackInfo {
        stream_index: 0,
        codec_name: Some("hevc".to_string()),
        natural_size: PixelSize::new(8, 8),
        orientation: Orientation::identity(),
        frame_rate,
        frame_count,
    }
}

#[test]
fn frame_rate_prefers_container_value() {
    let fps = Fps::new(30000, 1001).unwrap();
    let t = track(Some(fps), Some(10));
    assert_eq!(nominal_frame_rate(&asset_with(t.clone(), 10), &t).unwrap(), fps);
}

#[test]
fn frame_rate_falls_back_to_count_over_duration() {
    let t = track(None, Some(300));
    let fps = nominal_frame_rate(&asset_with(t.clone(), 10), &t).unwrap();
    assert_eq!(fps, Fps::new(30000, 1000).unwrap());
}

#[test]
fn frame_rate_unknown_is_invalid_video() {
    let t = track(None, None);
    let err = nominal_frame_rate(&asset_with(t.clone(), 10), &t).unwrap_err();
    assert!(matches!(err, FlatviewError::InvalidVideo(_)));
}

#[test]
fn new_pipeline_validates_options() {
    let opts = ConvertOpts {
        backing_scale: -1.0,
        ..ConvertOpts::default()
    };
    assert!(Pipeline::new(opts).is_err());
    let p = Pipeline::new(ConvertOpts::default()).unwrap();
    assert_eq!(p.state(), PipelineState::Idle);
    assert_eq!(p.stats(), ConvertStats::default());
}
