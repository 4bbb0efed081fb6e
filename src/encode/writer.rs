use std::future::Future;

use crate::assets::probe::OutputAsset;
use crate::encode::pool::PooledBuffer;
use crate::foundation::core::{Fps, MediaTime, Orientation, PixelSize};
use crate::foundation::error::FlatviewResult;
use crate::foundation::pixels::PixelFormat;

/// Output video codec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCodec {
    /// H.264 / AVC.
    #[default]
    H264,
    /// H.265 / HEVC.
    Hevc,
}

impl OutputCodec {
    /// `ffmpeg` encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
        }
    }
}

/// Settings of the writer's single video input.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoInputSettings {
    /// Encoded frame size.
    pub size: PixelSize,
    /// Display transform written to the output track.
    pub orientation: Orientation,
    /// Output codec.
    pub codec: OutputCodec,
    /// Nominal frame rate of the output track.
    pub frame_rate: Fps,
    /// Layout of the pixel buffers handed to `append`.
    pub pixel_format: PixelFormat,
}

/// Lifecycle status of a [`VideoWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterStatus {
    /// Not started.
    Unknown,
    /// Accepting data.
    Writing,
    /// Finished successfully; the output is usable.
    Completed,
    /// Failed; see [`VideoWriter::error`].
    Failed,
    /// Torn down by the caller.
    Cancelled,
}

/// Container writer with one video input, as seen by the encoding sink.
///
/// Call order: `add_video_input`, `start_writing`, `start_session`, any number of `append`,
/// `mark_as_finished`, `finish_writing`, then `load_output` when the status is `Completed`.
/// `cancel_writing` may be called at any point and must release every OS resource.
pub trait VideoWriter: Send {
    /// Configure the single video input. A second call is an error.
    fn add_video_input(&mut self, settings: &VideoInputSettings) -> FlatviewResult<()>;

    /// Create the output target and begin accepting data.
    fn start_writing(&mut self) -> FlatviewResult<()>;

    /// Fix the origin of the output timeline.
    fn start_session(&mut self, at: MediaTime) -> FlatviewResult<()>;

    /// Non-blocking readiness poll.
    fn is_ready_for_more_media_data(&self) -> bool;

    /// Submit one rendered buffer. Returns `false` when the writer refuses it; the buffer is
    /// returned to its pool either way.
    fn append(&mut self, buffer: PooledBuffer, presentation_time: MediaTime) -> bool;

    /// No more buffers will be appended.
    fn mark_as_finished(&mut self);

    /// Flush and close the output, resolving once the writer reached a terminal status.
    fn finish_writing(&mut self) -> impl Future<Output = ()> + Send;

    /// Current status.
    fn status(&self) -> WriterStatus;

    /// Error detail for a `Failed` status.
    fn error(&self) -> Option<String>;

    /// Abort writing and release resources.
    fn cancel_writing(&mut self);

    /// Load the finished output for verification.
    fn load_output(&mut self) -> impl Future<Output = FlatviewResult<OutputAsset>> + Send;
}
