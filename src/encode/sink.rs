use image::RgbaImage;

use crate::assets::probe::OutputAsset;
use crate::encode::pool::{AcquireError, PixelBufferPool, PoolConfig};
use crate::encode::render::RenderContext;
use crate::encode::writer::{OutputCodec, VideoInputSettings, VideoWriter, WriterStatus};
use crate::foundation::core::{Fps, MediaTime, Orientation, PixelSize};
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::pixels::PixelFormat;

/// Default origin of the output timeline: a small positive offset rather than zero.
pub const DEFAULT_SESSION_START: MediaTime = MediaTime::from_millis(1);

/// Configuration of an [`EncodingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Fixed output frame size.
    pub size: PixelSize,
    /// Display transform copied from the source.
    pub orientation: Orientation,
    /// Output codec.
    pub codec: OutputCodec,
    /// Nominal output frame rate.
    pub frame_rate: Fps,
    /// Output timeline origin.
    pub session_start: MediaTime,
    /// Pixel buffers the pool may hold at once.
    pub pool_buffers: usize,
    /// Background color used to flatten alpha.
    pub background: [u8; 3],
}

impl SinkConfig {
    /// Validate geometry and session start.
    pub fn validate(&self) -> FlatviewResult<()> {
        if self.size.is_empty() {
            return Err(FlatviewError::sink_open(format!(
                "output size {} must be non-zero",
                self.size
            )));
        }
        if !self.size.is_even() {
            return Err(FlatviewError::sink_open(format!(
                "output size {} must be even (required for yuv420p output)",
                self.size
            )));
        }
        if !self.session_start.is_valid() || self.session_start < MediaTime::ZERO {
            return Err(FlatviewError::sink_open(format!(
                "invalid session start time {:?}",
                self.session_start
            )));
        }
        if self.pool_buffers == 0 {
            return Err(FlatviewError::sink_open("pixel buffer pool must hold at least one buffer"));
        }
        Ok(())
    }
}

/// Result of one append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The writer took the frame.
    Accepted,
    /// The writer signalled back-pressure; nothing was allocated.
    NotReady,
    /// Every pooled buffer is in flight.
    PoolExhausted,
    /// The pool holds a different pixel format than the renderer produces.
    FormatMismatch,
    /// The image does not match the session's fixed geometry.
    SizeMismatch,
    /// The timestamp is earlier than the last accepted one.
    OutOfOrder,
    /// Rendering into the pooled buffer failed.
    RenderFailed,
    /// The writer refused the rendered buffer.
    WriterRejected,
}

impl AppendOutcome {
    /// Return `true` for [`AppendOutcome::Accepted`].
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }

    /// Return `true` when the same frame may succeed if retried later.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::NotReady | Self::PoolExhausted)
    }
}

/// Owns the output writer, its pixel buffer pool and the render context for one conversion.
pub struct EncodingSink<W: VideoWriter> {
    writer: W,
    pool: PixelBufferPool,
    render: RenderContext,
    size: PixelSize,
    last_accepted: Option<MediaTime>,
}

impl<W: VideoWriter> EncodingSink<W> {
    /// Configure `writer`, start it and open the session at `cfg.session_start`.
    pub fn open(mut writer: W, cfg: SinkConfig) -> FlatviewResult<Self> {
        cfg.validate()?;

        let render = RenderContext::new(PixelFormat::Argb8, cfg.background);
        let pool = PixelBufferPool::new(PoolConfig {
            size: cfg.size,
            format: render.target_format(),
            max_buffers: cfg.pool_buffers,
        })
        .map_err(|e| FlatviewError::sink_open(e.to_string()))?;

        let settings = VideoInputSettings {
            size: cfg.size,
            orientation: cfg.orientation,
            codec: cfg.codec,
            frame_rate: cfg.frame_rate,
            pixel_format: render.target_format(),
        };
        writer
            .add_video_input(&settings)
            .map_err(|e| FlatviewError::sink_open(format!("writer rejected video input: {e}")))?;
        writer
            .start_writing()
            .map_err(|e| FlatviewError::sink_open(format!("writer failed to start: {e}")))?;
        if let Err(e) = writer.start_session(cfg.session_start) {
            writer.cancel_writing();
            return Err(FlatviewError::sink_open(format!(
                "writer failed to start session: {e}"
            )));
        }

        tracing::debug!(
            size = %cfg.size,
            codec = ?cfg.codec,
            session_start = %cfg.session_start,
            "encoding sink open"
        );
        Ok(Self {
            writer,
            pool,
            render,
            size: cfg.size,
            last_accepted: None,
        })
    }

    /// Fixed output geometry.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Timestamp of the last accepted frame.
    pub fn last_accepted(&self) -> Option<MediaTime> {
        self.last_accepted
    }

    /// Whether the writer currently accepts more data.
    pub fn is_ready(&self) -> bool {
        self.writer.is_ready_for_more_media_data()
    }

    /// The render context shared by every append of this sink.
    pub fn render_context(&self) -> &RenderContext {
        &self.render
    }

    /// The sink's pixel buffer pool.
    pub fn pool(&self) -> &PixelBufferPool {
        &self.pool
    }

    /// Borrow the underlying writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Render `image` into a pooled buffer and append it at `presentation_time`.
    pub fn append(&mut self, image: &RgbaImage, presentation_time: MediaTime) -> bool {
        self.append_detailed(image, presentation_time).is_accepted()
    }

    /// Like [`EncodingSink::append`], reporting why a frame was not accepted.
    pub fn append_detailed(
        &mut self,
        image: &RgbaImage,
        presentation_time: MediaTime,
    ) -> AppendOutcome {
        if !self.writer.is_ready_for_more_media_data() {
            return AppendOutcome::NotReady;
        }
        if image.width() != self.size.width || image.height() != self.size.height {
            tracing::warn!(
                image = %PixelSize::new(image.width(), image.height()),
                session = %self.size,
                "composite does not match output geometry"
            );
            return AppendOutcome::SizeMismatch;
        }
        if let Some(last) = self.last_accepted
            && presentation_time < last
        {
            return AppendOutcome::OutOfOrder;
        }

        let mut buffer = match self.pool.try_acquire(self.render.target_format()) {
            Ok(b) => b,
            Err(AcquireError::Exhausted) => return AppendOutcome::PoolExhausted,
            Err(AcquireError::FormatMismatch { .. }) => return AppendOutcome::FormatMismatch,
        };
        if let Err(e) = self.render.render(image, &mut buffer) {
            tracing::warn!(error = %e, "render into pixel buffer failed");
            return AppendOutcome::RenderFailed;
        }
        if !self.writer.append(buffer, presentation_time) {
            return AppendOutcome::WriterRejected;
        }

        self.last_accepted = Some(presentation_time);
        AppendOutcome::Accepted
    }

    /// Finish the output and load it.
    ///
    /// Only a `Completed` writer status yields an asset; anything else is reported as
    /// [`FlatviewError::Finalize`] carrying the writer's error detail.
    pub async fn finish(mut self) -> FlatviewResult<OutputAsset> {
        self.writer.mark_as_finished();
        self.writer.finish_writing().await;

        match self.writer.status() {
            WriterStatus::Completed => {}
            status => {
                let detail = self
                    .writer
                    .error()
                    .unwrap_or_else(|| "no error detail".to_string());
                return Err(FlatviewError::finalize(format!(
                    "writer ended with status {status:?}: {detail}"
                )));
            }
        }

        let out = self.writer.load_output().await?;
        tracing::debug!(
            duration = %out.duration,
            frames = ?out.frame_count,
            "encoding sink finished"
        );
        Ok(out)
    }

    /// Tear the writer down without producing an output.
    pub fn cancel(mut self) {
        self.writer.cancel_writing();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
