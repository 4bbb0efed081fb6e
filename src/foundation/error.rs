/// Convenience result type used across flatview.
pub type FlatviewResult<T> = Result<T, FlatviewError>;

/// Top-level error taxonomy for a conversion run.
///
/// Inspection and sink-open failures abort before any sample is read. Per-sample variants
/// (`AppendRejected`, `IncompleteSample`) are normally handled locally by the pipeline and only
/// surface when the configured policy asks for it.
#[derive(thiserror::Error, Debug)]
pub enum FlatviewError {
    /// Source lacks the spatial-format metadata tag.
    #[error("not a spatial video: {0}")]
    NotSpatialVideo(String),

    /// Source has no usable video track.
    #[error("invalid video: {0}")]
    InvalidVideo(String),

    /// Output target or writer could not be created or configured.
    #[error("sink open failure: {0}")]
    SinkOpen(String),

    /// A frame append was refused by the encoding sink.
    #[error("append rejected: {0}")]
    AppendRejected(String),

    /// A decoded sample lacked one of the two eye buffers.
    #[error("incomplete sample: {0}")]
    IncompleteSample(String),

    /// The writer finished in a non-completed state.
    #[error("finalize failure: {0}")]
    Finalize(String),

    /// Invalid user-provided options or data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller cancelled the conversion.
    #[error("conversion cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlatviewError {
    /// Build a [`FlatviewError::NotSpatialVideo`] value.
    pub fn not_spatial(msg: impl Into<String>) -> Self {
        Self::NotSpatialVideo(msg.into())
    }

    /// Build a [`FlatviewError::InvalidVideo`] value.
    pub fn invalid_video(msg: impl Into<String>) -> Self {
        Self::InvalidVideo(msg.into())
    }

    /// Build a [`FlatviewError::SinkOpen`] value.
    pub fn sink_open(msg: impl Into<String>) -> Self {
        Self::SinkOpen(msg.into())
    }

    /// Build a [`FlatviewError::AppendRejected`] value.
    pub fn append_rejected(msg: impl Into<String>) -> Self {
        Self::AppendRejected(msg.into())
    }

    /// Build a [`FlatviewError::IncompleteSample`] value.
    pub fn incomplete_sample(msg: impl Into<String>) -> Self {
        Self::IncompleteSample(msg.into())
    }

    /// Build a [`FlatviewError::Finalize`] value.
    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::Finalize(msg.into())
    }

    /// Build a [`FlatviewError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Return `true` for errors that are local to one sample and never end a run by themselves.
    pub fn is_per_sample(&self) -> bool {
        matches!(self, Self::AppendRejected(_) | Self::IncompleteSample(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
