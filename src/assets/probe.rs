use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, MediaTime, Orientation, PixelSize};
use crate::foundation::error::{FlatviewError, FlatviewResult};

/// Timescale used for container durations reported in decimal seconds.
pub const DURATION_TIMESCALE: u32 = 1_000_000;

/// One video track of a probed source.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoTrackInfo {
    /// Container stream index.
    pub stream_index: u32,
    /// Codec short name (`hevc`, `h264`, ...).
    pub codec_name: Option<String>,
    /// Coded size of one view.
    pub natural_size: PixelSize,
    /// Preferred display transform.
    pub orientation: Orientation,
    /// Nominal frame rate, when the container advertises one.
    pub frame_rate: Option<Fps>,
    /// Frame count, when the container records it.
    pub frame_count: Option<u64>,
}

/// Read-only description of a (possibly) spatial source file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpatialVideoAsset {
    /// Source path.
    pub source_path: PathBuf,
    /// Container duration.
    pub duration: MediaTime,
    /// Container-level metadata items, keyed by identifier.
    pub metadata: BTreeMap<String, String>,
    /// Video tracks in container order.
    pub video_tracks: Vec<VideoTrackInfo>,
    /// Presentation timestamps of the first video track in presentation order. May be empty.
    pub presentation_times: Vec<MediaTime>,
}

impl SpatialVideoAsset {
    /// Look up a container-level metadata item by identifier.
    pub fn metadata_value(&self, identifier: &str) -> Option<&str> {
        self.metadata.get(identifier).map(String::as_str)
    }

    /// First video track, if any.
    pub fn first_video_track(&self) -> Option<&VideoTrackInfo> {
        self.video_tracks.first()
    }

    /// Probe `source_path` with `ffprobe`, including first-track packet timestamps.
    #[cfg(feature = "media-ffmpeg")]
    #[tracing::instrument]
    pub fn probe(source_path: &Path) -> FlatviewResult<Self> {
        let out = run_ffprobe(
            source_path,
            &[
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ],
        )?;
        let mut asset = parse_probe_json(source_path, &out)?;

        if let Some(track) = asset.first_video_track() {
            let selector = track.stream_index.to_string();
            let packets = run_ffprobe(
                source_path,
                &[
                    "-v",
                    "error",
                    "-select_streams",
                    &selector,
                    "-show_entries",
                    "stream=time_base:packet=pts",
                    "-print_format",
                    "json",
                ],
            )?;
            asset.presentation_times = parse_packet_times_json(&packets)?;
        }

        tracing::debug!(
            tracks = asset.video_tracks.len(),
            metadata_items = asset.metadata.len(),
            timestamps = asset.presentation_times.len(),
            "probed source"
        );
        Ok(asset)
    }

    /// Probe `source_path` with `ffprobe`.
    ///
    /// Returns an error when the `media-ffmpeg` feature is disabled.
    #[cfg(not(feature = "media-ffmpeg"))]
    pub fn probe(_source_path: &Path) -> FlatviewResult<Self> {
        Err(FlatviewError::validation(
            "probing media files requires the 'media-ffmpeg' feature",
        ))
    }
}

/// A finished output file as measured after writing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputAsset {
    /// Output path, when the writer produced a file.
    pub path: Option<PathBuf>,
    /// Measured duration.
    pub duration: MediaTime,
    /// Number of encoded frames, when measurable.
    pub frame_count: Option<u64>,
    /// Encoded frame size, when measurable.
    pub size: Option<PixelSize>,
}

/// Measure an encoded output file with `ffprobe`.
#[cfg(feature = "media-ffmpeg")]
pub fn probe_output(path: &Path) -> FlatviewResult<OutputAsset> {
    let out = run_ffprobe(
        path,
        &[
            "-v",
            "error",
            "-count_packets",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ],
    )?;
    let parsed: ProbeOut = serde_json::from_slice(&out)
        .map_err(|e| FlatviewError::finalize(format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| FlatviewError::finalize("output has no video stream"))?;

    let duration_secs = video
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    let frame_count = video
        .nb_read_packets
        .as_deref()
        .or(video.nb_frames.as_deref())
        .and_then(|n| n.parse::<u64>().ok());
    let size = match (video.width, video.height) {
        (Some(w), Some(h)) => Some(PixelSize::new(w, h)),
        _ => None,
    };

    Ok(OutputAsset {
        path: Some(path.to_path_buf()),
        duration: MediaTime::from_secs_f64(duration_secs, DURATION_TIMESCALE)?,
        frame_count,
        size,
    })
}

/// Measure an encoded output file with `ffprobe`.
///
/// Returns an error when the `media-ffmpeg` feature is disabled.
#[cfg(not(feature = "media-ffmpeg"))]
pub fn probe_output(_path: &Path) -> FlatviewResult<OutputAsset> {
    Err(FlatviewError::validation(
        "probing media files requires the 'media-ffmpeg' feature",
    ))
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    std::process::Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(feature = "media-ffmpeg")]
fn run_ffprobe(path: &Path, args: &[&str]) -> FlatviewResult<Vec<u8>> {
    let out = std::process::Command::new("ffprobe")
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| anyhow::anyhow!("failed to run ffprobe (is it installed and on PATH?): {e}"))?;
    if !out.status.success() {
        return Err(FlatviewError::invalid_video(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    side_data_type: Option<String>,
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    index: Option<u32>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    nb_read_packets: Option<String>,
    #[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
    duration: Option<String>,
    time_base: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Build a [`SpatialVideoAsset`] from `ffprobe -show_streams -show_format` JSON output.
///
/// Presentation timestamps are left empty; see [`parse_packet_times_json`].
pub fn parse_probe_json(source_path: &Path, json: &[u8]) -> FlatviewResult<SpatialVideoAsset> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| FlatviewError::invalid_video(format!("ffprobe json parse failed: {e}")))?;

    let (duration_secs, metadata) = match parsed.format {
        Some(f) => (
            f.duration.and_then(|d| d.parse::<f64>().ok()).unwrap_or(0.0),
            f.tags,
        ),
        None => (0.0, BTreeMap::new()),
    };

    let video_tracks = parsed
        .streams
        .iter()
        .enumerate()
        .filter(|(_, s)| s.codec_type.as_deref() == Some("video"))
        .map(|(pos, s)| VideoTrackInfo {
            stream_index: s.index.unwrap_or(pos as u32),
            codec_name: s.codec_name.clone(),
            natural_size: PixelSize::new(s.width.unwrap_or(0), s.height.unwrap_or(0)),
            orientation: stream_orientation(s),
            frame_rate: [s.avg_frame_rate.as_deref(), s.r_frame_rate.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|r| Fps::parse_ratio(r).ok()),
            frame_count: s.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        })
        .collect();

    Ok(SpatialVideoAsset {
        source_path: source_path.to_path_buf(),
        duration: MediaTime::from_secs_f64(duration_secs, DURATION_TIMESCALE)?,
        metadata,
        video_tracks,
        presentation_times: Vec::new(),
    })
}

fn stream_orientation(s: &ProbeStream) -> Orientation {
    let from_side_data = s
        .side_data_list
        .iter()
        .filter(|sd| sd.side_data_type.as_deref() == Some("Display Matrix"))
        .find_map(|sd| sd.rotation);
    if let Some(deg) = from_side_data {
        return Orientation::from_display_rotation(deg);
    }
    // Legacy `rotate` tag is clockwise; display matrices are counter-clockwise.
    match s.tags.get("rotate").and_then(|r| r.parse::<f64>().ok()) {
        Some(cw) => Orientation::from_display_rotation(-cw),
        None => Orientation::identity(),
    }
}

/// Parse `ffprobe -show_entries stream=time_base:packet=pts` JSON into sorted presentation times.
pub fn parse_packet_times_json(json: &[u8]) -> FlatviewResult<Vec<MediaTime>> {
    #[derive(serde::Deserialize)]
    struct Packet {
        pts: Option<i64>,
    }
    #[derive(serde::Deserialize)]
    struct PacketsOut {
        #[serde(default)]
        packets: Vec<Packet>,
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let parsed: PacketsOut = serde_json::from_slice(json)
        .map_err(|e| FlatviewError::invalid_video(format!("ffprobe json parse failed: {e}")))?;
    let (tb_num, tb_den) = parsed
        .streams
        .first()
        .and_then(|s| s.time_base.as_deref())
        .and_then(parse_time_base)
        .ok_or_else(|| FlatviewError::invalid_video("ffprobe did not report a stream time base"))?;

    let mut times = parsed
        .packets
        .iter()
        .filter_map(|p| p.pts)
        .map(|pts| MediaTime::new(pts.saturating_mul(i64::from(tb_num)), tb_den))
        .collect::<FlatviewResult<Vec<_>>>()?;
    // Packets arrive in decode order; decoded frames come out in presentation order.
    times.sort();
    Ok(times)
}

fn parse_time_base(s: &str) -> Option<(u32, u32)> {
    let (num, den) = s.split_once('/')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    (num > 0 && den > 0).then_some((num, den))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/probe.rs"]
mod tests;
