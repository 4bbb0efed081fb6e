use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbaImage;
use tokio_util::sync::CancellationToken;

use crate::assets::probe::{SpatialVideoAsset, VideoTrackInfo};
use crate::composite::compositor::{CompositeFrame, Compositor};
use crate::decode::source::SampleSource;
use crate::demux::demuxer::demux_checked;
use crate::demux::sample::StereoSample;
use crate::encode::sink::{EncodingSink, SinkConfig};
use crate::encode::writer::VideoWriter;
use crate::foundation::core::{Fps, MediaTime, PixelSize};
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::inspect::inspector::inspect;
use crate::pipeline::backend::{ConversionBackend, FfmpegBackend};
use crate::pipeline::opts::{AppendPolicy, ConvertOpts};
use crate::pipeline::progress::ProgressState;

/// Controller lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Checking the source.
    Inspecting,
    /// Decoding, compositing and appending samples.
    Reading,
    /// Waiting for the writer to complete.
    Finalizing,
    /// Output written and measured.
    Done,
    /// The run ended with an error.
    Failed,
}

/// Per-run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConvertStats {
    /// Samples pulled from the source.
    pub samples_read: u64,
    /// Samples turned into a composite.
    pub composited: u64,
    /// Frames the sink accepted.
    pub appended: u64,
    /// Composites the sink did not accept.
    pub dropped: u64,
    /// Append retries after a transient refusal.
    pub retried: u64,
    /// Samples skipped for a missing eye view.
    pub incomplete: u64,
    /// Samples whose views could not be composited.
    pub composite_failures: u64,
}

/// Result of a successful conversion.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FinishedAsset {
    /// Output path, when the writer produced a file.
    pub path: Option<PathBuf>,
    /// Measured output duration.
    pub duration: MediaTime,
    /// Encoded frame count, when measurable.
    pub frame_count: Option<u64>,
    /// Encoded frame size, when measurable.
    pub size: Option<PixelSize>,
    /// Run counters.
    pub stats: ConvertStats,
}

/// Drives one spatial-to-side-by-side conversion.
///
/// Samples are processed strictly in order on the calling task: pull, demux, composite, append,
/// report progress, yield.
#[derive(Debug)]
pub struct Pipeline {
    opts: ConvertOpts,
    state: PipelineState,
    stats: ConvertStats,
    progress: ProgressState,
}

impl Pipeline {
    /// Create a controller with validated options.
    pub fn new(opts: ConvertOpts) -> FlatviewResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            state: PipelineState::Idle,
            stats: ConvertStats::default(),
            progress: ProgressState::default(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Counters of the current (or last) run.
    pub fn stats(&self) -> ConvertStats {
        self.stats
    }

    /// Options in use.
    pub fn opts(&self) -> &ConvertOpts {
        &self.opts
    }

    fn transition(&mut self, to: PipelineState) {
        tracing::debug!(from = ?self.state, to = ?to, "pipeline state");
        self.state = to;
    }

    /// Convert `asset` into a side-by-side video at `output`.
    ///
    /// `progress` receives non-decreasing ratios in `[0, 1]`. Cancelling `cancel` tears the
    /// writer down and ends the run with [`FlatviewError::Cancelled`].
    #[tracing::instrument(skip_all, fields(source = %asset.source_path.display(), output = %output.display()))]
    pub async fn run<B: ConversionBackend>(
        &mut self,
        asset: &SpatialVideoAsset,
        backend: &mut B,
        output: &Path,
        mut progress: impl FnMut(f64) + Send,
        cancel: &CancellationToken,
    ) -> FlatviewResult<FinishedAsset> {
        if self.state != PipelineState::Idle {
            return Err(FlatviewError::validation("pipeline has already run"));
        }
        let res = self
            .run_inner(asset, backend, output, &mut progress, cancel)
            .await;
        match &res {
            Ok(out) => {
                self.transition(PipelineState::Done);
                progress(self.progress.complete());
                tracing::info!(
                    frames = ?out.frame_count,
                    duration = %out.duration,
                    dropped = self.stats.dropped,
                    incomplete = self.stats.incomplete,
                    "conversion finished"
                );
            }
            Err(e) => {
                self.transition(PipelineState::Failed);
                tracing::debug!(error = %e, "conversion failed");
            }
        }
        res
    }

    async fn run_inner<B: ConversionBackend>(
        &mut self,
        asset: &SpatialVideoAsset,
        backend: &mut B,
        output: &Path,
        progress: &mut (impl FnMut(f64) + Send),
        cancel: &CancellationToken,
    ) -> FlatviewResult<FinishedAsset> {
        self.transition(PipelineState::Inspecting);
        let geometry = inspect(asset, &self.opts.inspect)?.require_spatial()?;
        let track = asset
            .first_video_track()
            .ok_or_else(|| FlatviewError::invalid_video("source has no video track"))?;
        let frame_rate = nominal_frame_rate(asset, track)?;
        let compositor = Compositor::new(self.opts.backing_scale)?.with_filter(self.opts.filter);
        let output_size = geometry.output_size();
        // Eye views are composited in coded orientation; every frame must fit the session.
        let composite_size = compositor
            .layout(geometry.natural_size, geometry.natural_size)?
            .canvas_size();
        if composite_size != output_size {
            return Err(FlatviewError::invalid_video(format!(
                "side-by-side composite {composite_size} cannot fill the {output_size} output \
                 (natural {}, rotation {}°, backing scale {})",
                geometry.natural_size,
                geometry.orientation.rotation_degrees(),
                compositor.backing_scale()
            )));
        }
        if cancel.is_cancelled() {
            return Err(FlatviewError::Cancelled);
        }

        self.transition(PipelineState::Reading);
        let mut source = backend.open_source(asset, track, frame_rate, &self.opts)?;
        let writer = backend.create_writer(output, &self.opts)?;
        let mut sink = EncodingSink::open(
            writer,
            SinkConfig {
                size: output_size,
                orientation: geometry.orientation,
                codec: self.opts.codec,
                frame_rate,
                session_start: self.opts.session_start,
                pool_buffers: self.opts.effective_pool_buffers(),
                background: self.opts.background,
            },
        )?;

        loop {
            let pulled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = source.next_sample() => Some(next),
            };
            let Some(next) = pulled else {
                tracing::debug!("conversion cancelled");
                sink.cancel();
                return Err(FlatviewError::Cancelled);
            };
            let sample = match next {
                Ok(Some(sample)) => sample,
                Ok(None) => break,
                Err(e) if e.is_per_sample() => {
                    tracing::warn!(error = %e, "decoder produced an unusable sample");
                    self.stats.incomplete += 1;
                    continue;
                }
                Err(e) => {
                    sink.cancel();
                    return Err(e);
                }
            };

            if let Err(e) = self.process_sample(&sample, &compositor, &mut sink).await {
                sink.cancel();
                return Err(e);
            }
            progress(self.progress.advance(sample.presentation_time, asset.duration));

            tokio::task::yield_now().await;
            if self.opts.pacing_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.opts.pacing_ms)).await;
            }
        }
        drop(source);

        self.transition(PipelineState::Finalizing);
        let out = sink.finish().await?;
        Ok(FinishedAsset {
            path: out.path,
            duration: out.duration,
            frame_count: out.frame_count,
            size: out.size,
            stats: self.stats,
        })
    }

    async fn process_sample<W: VideoWriter>(
        &mut self,
        sample: &StereoSample,
        compositor: &Compositor,
        sink: &mut EncodingSink<W>,
    ) -> FlatviewResult<()> {
        self.stats.samples_read += 1;
        let pts = sample.presentation_time;

        let (left, right) = match demux_checked(sample) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "sample skipped");
                self.stats.incomplete += 1;
                return Ok(());
            }
        };
        let frame = match compositor.compose_buffers(left, right) {
            Ok(image) => CompositeFrame {
                image,
                presentation_time: pts,
            },
            Err(e) => {
                tracing::warn!(pts = %pts, error = %e, "composite failed; sample skipped");
                self.stats.composite_failures += 1;
                return Ok(());
            }
        };
        self.stats.composited += 1;

        if self
            .append_with_policy(sink, &frame.image, frame.presentation_time)
            .await?
        {
            self.stats.appended += 1;
        } else {
            self.stats.dropped += 1;
        }
        Ok(())
    }

    async fn append_with_policy<W: VideoWriter>(
        &mut self,
        sink: &mut EncodingSink<W>,
        image: &RgbaImage,
        pts: MediaTime,
    ) -> FlatviewResult<bool> {
        let mut attempt = 0u32;
        loop {
            let outcome = sink.append_detailed(image, pts);
            if outcome.is_accepted() {
                return Ok(true);
            }
            match self.opts.append_policy {
                AppendPolicy::Retry {
                    max_retries,
                    backoff_ms,
                } if outcome.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    self.stats.retried += 1;
                    if backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    } else {
                        tokio::task::yield_now().await;
                    }
                }
                AppendPolicy::Abort => {
                    return Err(FlatviewError::append_rejected(format!(
                        "frame at {pts}: {outcome:?}"
                    )));
                }
                _ => {
                    tracing::warn!(pts = %pts, outcome = ?outcome, "frame dropped");
                    return Ok(false);
                }
            }
        }
    }
}

/// Nominal frame rate of `track`, derived from its frame count when the container reports none.
pub fn nominal_frame_rate(asset: &SpatialVideoAsset, track: &VideoTrackInfo) -> FlatviewResult<Fps> {
    if let Some(fps) = track.frame_rate {
        return Ok(fps);
    }
    let secs = asset.duration.as_secs_f64();
    if let Some(count) = track.frame_count
        && count > 0
        && secs > 0.0
    {
        let millifps = (count as f64 / secs * 1000.0).round();
        if millifps >= 1.0 && millifps <= f64::from(u32::MAX) {
            return Fps::new(millifps as u32, 1000);
        }
    }
    Err(FlatviewError::invalid_video(
        "video track reports neither a frame rate nor a frame count",
    ))
}

/// Probe `input` with `ffprobe` and convert it with the `ffmpeg` backend.
pub async fn convert_spatial_video(
    input: &Path,
    output: &Path,
    opts: ConvertOpts,
    progress: impl FnMut(f64) + Send,
    cancel: CancellationToken,
) -> FlatviewResult<FinishedAsset> {
    let mut pipeline = Pipeline::new(opts)?;
    let path = input.to_path_buf();
    let asset = tokio::task::spawn_blocking(move || SpatialVideoAsset::probe(&path))
        .await
        .map_err(|e| anyhow::anyhow!("probe task failed: {e}"))??;
    pipeline
        .run(&asset, &mut FfmpegBackend, output, progress, &cancel)
        .await
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/controller.rs"]
mod tests;
