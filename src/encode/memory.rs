use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::assets::probe::{DURATION_TIMESCALE, OutputAsset};
use crate::encode::pool::PooledBuffer;
use crate::encode::writer::{VideoInputSettings, VideoWriter, WriterStatus};
use crate::foundation::core::MediaTime;
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::math::Fnv1a64;

/// One frame captured by an [`InMemoryWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedFrame {
    /// Presentation time passed to `append`.
    pub presentation_time: MediaTime,
    /// FNV-1a fingerprint of the rendered bytes.
    pub fingerprint: u64,
}

/// Everything an [`InMemoryWriter`] observed.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    /// Input settings, once configured.
    pub settings: Option<VideoInputSettings>,
    /// Session origin, once started.
    pub session_start: Option<MediaTime>,
    /// Accepted frames in append order.
    pub frames: Vec<RecordedFrame>,
    /// Number of readiness polls answered.
    pub readiness_polls: u64,
    /// Whether `mark_as_finished` was called.
    pub marked_finished: bool,
    /// Whether the writer was cancelled.
    pub cancelled: bool,
}

type ReadinessFn = Box<dyn FnMut(u64) -> bool + Send>;

/// Writer that keeps frame fingerprints in memory, for tests and dry runs.
///
/// Readiness can be scripted per poll with [`InMemoryWriter::with_readiness`] to exercise
/// back-pressure handling. Observations stay reachable through [`InMemoryWriter::recording`]
/// after the writer has been moved into a sink.
pub struct InMemoryWriter {
    recording: Arc<Mutex<Recording>>,
    readiness: Mutex<Option<ReadinessFn>>,
    fail_input: Option<String>,
    fail_finish: Option<String>,
    status: WriterStatus,
    error: Option<String>,
}

impl Default for InMemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWriter {
    /// Create a writer that is always ready and always completes.
    pub fn new() -> Self {
        Self {
            recording: Arc::new(Mutex::new(Recording::default())),
            readiness: Mutex::new(None),
            fail_input: None,
            fail_finish: None,
            status: WriterStatus::Unknown,
            error: None,
        }
    }

    /// Answer readiness poll `n` (0-based) with `f(n)`.
    pub fn with_readiness(mut self, f: impl FnMut(u64) -> bool + Send + 'static) -> Self {
        self.readiness = Mutex::new(Some(Box::new(f)));
        self
    }

    /// Refuse the video input configuration with `msg`.
    pub fn failing_input(mut self, msg: impl Into<String>) -> Self {
        self.fail_input = Some(msg.into());
        self
    }

    /// End in `Failed` status with `msg` when finishing.
    pub fn failing_finish(mut self, msg: impl Into<String>) -> Self {
        self.fail_finish = Some(msg.into());
        self
    }

    /// Shared handle to the writer's observations.
    pub fn recording(&self) -> Arc<Mutex<Recording>> {
        Arc::clone(&self.recording)
    }

    fn rec(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VideoWriter for InMemoryWriter {
    fn add_video_input(&mut self, settings: &VideoInputSettings) -> FlatviewResult<()> {
        if let Some(msg) = &self.fail_input {
            return Err(FlatviewError::validation(msg.clone()));
        }
        let mut rec = self.rec();
        if rec.settings.is_some() {
            return Err(FlatviewError::validation("writer already has a video input"));
        }
        rec.settings = Some(settings.clone());
        Ok(())
    }

    fn start_writing(&mut self) -> FlatviewResult<()> {
        if self.rec().settings.is_none() {
            return Err(FlatviewError::validation("no video input configured"));
        }
        self.status = WriterStatus::Writing;
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) -> FlatviewResult<()> {
        if self.status != WriterStatus::Writing {
            return Err(FlatviewError::validation("writer is not writing"));
        }
        self.rec().session_start = Some(at);
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        if self.status != WriterStatus::Writing {
            return false;
        }
        let n = {
            let mut rec = self.rec();
            rec.readiness_polls += 1;
            rec.readiness_polls - 1
        };
        let mut readiness = self.readiness.lock().unwrap_or_else(|e| e.into_inner());
        readiness.as_mut().is_none_or(|f| f(n))
    }

    fn append(&mut self, buffer: PooledBuffer, presentation_time: MediaTime) -> bool {
        if self.status != WriterStatus::Writing {
            return false;
        }
        let mut h = Fnv1a64::new_default();
        h.write_u32(buffer.size().width);
        h.write_u32(buffer.size().height);
        h.write_bytes(buffer.bytes());
        self.rec().frames.push(RecordedFrame {
            presentation_time,
            fingerprint: h.finish(),
        });
        true
    }

    fn mark_as_finished(&mut self) {
        self.rec().marked_finished = true;
    }

    fn finish_writing(&mut self) -> impl Future<Output = ()> + Send {
        if self.status == WriterStatus::Writing {
            match &self.fail_finish {
                Some(msg) => {
                    self.status = WriterStatus::Failed;
                    self.error = Some(msg.clone());
                }
                None => self.status = WriterStatus::Completed,
            }
        }
        std::future::ready(())
    }

    fn status(&self) -> WriterStatus {
        self.status
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn cancel_writing(&mut self) {
        self.status = WriterStatus::Cancelled;
        self.rec().cancelled = true;
    }

    fn load_output(&mut self) -> impl Future<Output = FlatviewResult<OutputAsset>> + Send {
        let rec = self.rec();
        let start = rec.session_start.unwrap_or(MediaTime::ZERO);
        let frame_secs = rec
            .settings
            .as_ref()
            .map(|s| s.frame_rate.frame_duration_secs())
            .unwrap_or(0.0);
        let duration_secs = match rec.frames.last() {
            Some(last) => (last.presentation_time.secs_since(start) + frame_secs).max(0.0),
            None => 0.0,
        };
        let out = MediaTime::from_secs_f64(duration_secs, DURATION_TIMESCALE).map(|duration| {
            OutputAsset {
                path: None,
                duration,
                frame_count: Some(rec.frames.len() as u64),
                size: rec.settings.as_ref().map(|s| s.size),
            }
        });
        std::future::ready(out)
    }
}
