//! flatview converts stereoscopic ("spatial") MV-HEVC video into side-by-side flat video.
//!
//! A conversion runs as one async task:
//!
//! - Inspect the source for the spatial-format tag and its track geometry ([`inspect`])
//! - Pull decoded two-view samples from a [`SampleSource`]
//! - Split each sample into eyes, composite them side by side ([`Compositor`])
//! - Append the composite to an [`EncodingSink`] under writer back-pressure
//! - Finish the writer and measure the output ([`FinishedAsset`])
//!
//! [`convert_spatial_video`] wires the `ffmpeg`/`ffprobe` collaborators together; [`Pipeline`]
//! accepts any [`ConversionBackend`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod composite;
mod decode;
mod demux;
mod encode;
mod foundation;
mod inspect;
mod pipeline;

pub use crate::foundation::core::{
    Affine, Fps, MediaTime, Orientation, PixelSize, TrackGeometry, Vec2,
};
pub use crate::foundation::error::{FlatviewError, FlatviewResult};
pub use crate::foundation::pixels::{PixelBuffer, PixelFormat};

pub use crate::assets::probe::{
    DURATION_TIMESCALE, OutputAsset, SpatialVideoAsset, VideoTrackInfo, is_ffprobe_on_path,
    parse_packet_times_json, parse_probe_json, probe_output,
};
pub use crate::composite::compositor::{
    CompositeFrame, Compositor, DEFAULT_BACKING_SCALE, ResizeFilter, SideBySideLayout,
};
pub use crate::decode::ffmpeg::{DEFAULT_DECODE_QUEUE, FfmpegStereoSource, StereoDecodePlan};
pub use crate::decode::source::{SampleSource, VecSampleSource};
pub use crate::demux::demuxer::{demux, demux_checked};
pub use crate::demux::sample::{StereoSample, StereoView, TaggedBuffer};
pub use crate::encode::ffmpeg::{
    DEFAULT_MAX_IN_FLIGHT, FfmpegWriter, FfmpegWriterOpts, ensure_parent_dir, is_ffmpeg_on_path,
    presentation_slot,
};
pub use crate::encode::memory::{InMemoryWriter, RecordedFrame, Recording};
pub use crate::encode::pool::{
    AcquireError, LockedPixels, PixelBufferPool, PoolConfig, PoolStats, PooledBuffer,
};
pub use crate::encode::render::RenderContext;
pub use crate::encode::sink::{AppendOutcome, DEFAULT_SESSION_START, EncodingSink, SinkConfig};
pub use crate::encode::writer::{OutputCodec, VideoInputSettings, VideoWriter, WriterStatus};
pub use crate::inspect::inspector::{InspectOpts, Inspection, SPATIAL_FORMAT_IDENTIFIER, inspect};
pub use crate::pipeline::backend::{ConversionBackend, FfmpegBackend, PreparedBackend};
pub use crate::pipeline::controller::{
    ConvertStats, FinishedAsset, Pipeline, PipelineState, convert_spatial_video,
    nominal_frame_rate,
};
pub use crate::pipeline::opts::{AppendPolicy, ConvertOpts};
pub use crate::pipeline::progress::ProgressState;

pub use tokio_util::sync::CancellationToken;
