use std::path::Path;

use crate::assets::probe::{SpatialVideoAsset, VideoTrackInfo};
use crate::decode::ffmpeg::{FfmpegStereoSource, StereoDecodePlan};
use crate::decode::source::SampleSource;
use crate::encode::ffmpeg::{FfmpegWriter, FfmpegWriterOpts};
use crate::encode::writer::VideoWriter;
use crate::foundation::core::Fps;
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::pipeline::opts::ConvertOpts;

/// Factory for the decoder and writer collaborators of one conversion.
pub trait ConversionBackend {
    /// Decoded sample source.
    type Source: SampleSource;
    /// Output writer.
    type Writer: VideoWriter;

    /// Open a source decoding both views of `track`.
    fn open_source(
        &mut self,
        asset: &SpatialVideoAsset,
        track: &VideoTrackInfo,
        frame_rate: Fps,
        opts: &ConvertOpts,
    ) -> FlatviewResult<Self::Source>;

    /// Create an unconfigured writer targeting `output`.
    fn create_writer(&mut self, output: &Path, opts: &ConvertOpts) -> FlatviewResult<Self::Writer>;
}

/// Backend on top of the system `ffmpeg` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegBackend;

impl ConversionBackend for FfmpegBackend {
    type Source = FfmpegStereoSource;
    type Writer = FfmpegWriter;

    fn open_source(
        &mut self,
        asset: &SpatialVideoAsset,
        track: &VideoTrackInfo,
        frame_rate: Fps,
        opts: &ConvertOpts,
    ) -> FlatviewResult<Self::Source> {
        FfmpegStereoSource::spawn(
            StereoDecodePlan::for_track(asset, track, frame_rate),
            opts.decode_queue,
        )
    }

    fn create_writer(&mut self, output: &Path, opts: &ConvertOpts) -> FlatviewResult<Self::Writer> {
        Ok(FfmpegWriter::new(FfmpegWriterOpts {
            out_path: output.to_path_buf(),
            overwrite: opts.overwrite,
            max_in_flight: opts.max_in_flight,
        }))
    }
}

/// Backend handing out one pre-built source and writer, e.g. in-memory collaborators.
pub struct PreparedBackend<S, W> {
    source: Option<S>,
    writer: Option<W>,
}

impl<S, W> PreparedBackend<S, W> {
    /// Wrap `source` and `writer`; each can be taken once.
    pub fn new(source: S, writer: W) -> Self {
        Self {
            source: Some(source),
            writer: Some(writer),
        }
    }
}

impl<S: SampleSource, W: VideoWriter> ConversionBackend for PreparedBackend<S, W> {
    type Source = S;
    type Writer = W;

    fn open_source(
        &mut self,
        _asset: &SpatialVideoAsset,
        _track: &VideoTrackInfo,
        _frame_rate: Fps,
        _opts: &ConvertOpts,
    ) -> FlatviewResult<Self::Source> {
        self.source
            .take()
            .ok_or_else(|| FlatviewError::validation("prepared source was already used"))
    }

    fn create_writer(&mut self, _output: &Path, _opts: &ConvertOpts) -> FlatviewResult<Self::Writer> {
        self.writer
            .take()
            .ok_or_else(|| FlatviewError::sink_open("prepared writer was already used"))
    }
}
