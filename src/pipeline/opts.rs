use crate::composite::compositor::{DEFAULT_BACKING_SCALE, ResizeFilter};
use crate::decode::ffmpeg::DEFAULT_DECODE_QUEUE;
use crate::encode::ffmpeg::DEFAULT_MAX_IN_FLIGHT;
use crate::encode::sink::DEFAULT_SESSION_START;
use crate::encode::writer::OutputCodec;
use crate::foundation::core::MediaTime;
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::inspect::inspector::InspectOpts;

/// What the controller does with a frame the sink did not accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AppendPolicy {
    /// Count the frame as dropped and move on.
    Drop,
    /// Retry transient refusals (back-pressure, pool exhaustion) after a short sleep, then drop.
    Retry {
        /// Attempts after the first one.
        max_retries: u32,
        /// Sleep between attempts, in milliseconds.
        backoff_ms: u64,
    },
    /// Fail the run with [`FlatviewError::AppendRejected`].
    Abort,
}

impl Default for AppendPolicy {
    fn default() -> Self {
        Self::Retry {
            max_retries: 8,
            backoff_ms: 2,
        }
    }
}

impl AppendPolicy {
    /// Parse the CLI spelling (`drop`, `retry`, `abort`); `retry` uses the default budget.
    pub fn parse(s: &str) -> FlatviewResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "retry" => Ok(Self::default()),
            "abort" => Ok(Self::Abort),
            other => Err(FlatviewError::validation(format!(
                "unknown append policy '{other}' (expected drop, retry or abort)"
            ))),
        }
    }
}

/// Options of one conversion run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConvertOpts {
    /// Spatial tag lookup.
    pub inspect: InspectOpts,
    /// Output codec.
    pub codec: OutputCodec,
    /// Backing scale factor the compositor divides source extents by.
    pub backing_scale: f64,
    /// Resampling filter for the eye views.
    pub filter: ResizeFilter,
    /// Origin of the output timeline.
    pub session_start: MediaTime,
    /// Handling of refused appends.
    pub append_policy: AppendPolicy,
    /// Extra sleep after each sample, in milliseconds.
    pub pacing_ms: u64,
    /// Writer queue depth before back-pressure.
    pub max_in_flight: usize,
    /// Pixel buffers in the sink's pool. `0` picks `max_in_flight + 2`.
    pub pool_buffers: usize,
    /// Decoded samples buffered ahead of the controller.
    pub decode_queue: usize,
    /// Overwrite an existing output file.
    pub overwrite: bool,
    /// Background color used to flatten alpha.
    pub background: [u8; 3],
}

impl Default for ConvertOpts {
    fn default() -> Self {
        Self {
            inspect: InspectOpts::default(),
            codec: OutputCodec::default(),
            backing_scale: DEFAULT_BACKING_SCALE,
            filter: ResizeFilter::default(),
            session_start: DEFAULT_SESSION_START,
            append_policy: AppendPolicy::default(),
            pacing_ms: 0,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            pool_buffers: 0,
            decode_queue: DEFAULT_DECODE_QUEUE,
            overwrite: false,
            background: [0, 0, 0],
        }
    }
}

impl ConvertOpts {
    /// Validate user-provided values.
    pub fn validate(&self) -> FlatviewResult<()> {
        if !self.backing_scale.is_finite() || self.backing_scale <= 0.0 {
            return Err(FlatviewError::validation(format!(
                "backing_scale must be finite and > 0, got {}",
                self.backing_scale
            )));
        }
        if self.max_in_flight == 0 {
            return Err(FlatviewError::validation("max_in_flight must be >= 1"));
        }
        if self.decode_queue == 0 {
            return Err(FlatviewError::validation("decode_queue must be >= 1"));
        }
        if self.inspect.spatial_identifier.trim().is_empty() {
            return Err(FlatviewError::validation("spatial_identifier must be non-empty"));
        }
        Ok(())
    }

    /// Pool size after applying the `0 = auto` rule.
    pub fn effective_pool_buffers(&self) -> usize {
        if self.pool_buffers == 0 {
            self.max_in_flight + 2
        } else {
            self.pool_buffers
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/opts.rs"]
mod tests;
