use std::ffi::OsString;
#[cfg(feature = "media-ffmpeg")]
use std::io::Read;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::JoinHandle;

use crate::assets::probe::{OutputAsset, probe_output};
use crate::encode::pool::PooledBuffer;
use crate::encode::writer::{OutputCodec, VideoInputSettings, VideoWriter, WriterStatus};
use crate::foundation::core::{Fps, MediaTime};
use crate::foundation::error::{FlatviewError, FlatviewResult};

/// Buffers that may be queued for `ffmpeg` before the writer reports back-pressure.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Options for [`FfmpegWriter`].
#[derive(Clone, Debug)]
pub struct FfmpegWriterOpts {
    /// Output file path (`.mp4` / `.mov`).
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Queue depth before `is_ready_for_more_media_data` turns false.
    pub max_in_flight: usize,
}

impl FfmpegWriterOpts {
    /// Create options for writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

struct FeedMsg {
    slot: u64,
    buffer: PooledBuffer,
}

/// Writer that spawns the system `ffmpeg` and streams rendered buffers to its stdin.
///
/// The output is constant frame rate at the input's nominal rate. Each appended buffer is placed
/// on the frame slot nearest to its presentation time relative to the session start; gaps repeat
/// the previous frame and a buffer landing on an occupied slot replaces it.
pub struct FfmpegWriter {
    opts: FfmpegWriterOpts,
    settings: Option<VideoInputSettings>,
    session_start: Option<MediaTime>,
    status: WriterStatus,
    error: Option<String>,

    child: Option<Child>,
    tx: Option<SyncSender<FeedMsg>>,
    feed: Option<JoinHandle<std::io::Result<u64>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    in_flight: Arc<AtomicUsize>,
    broken: Arc<AtomicBool>,
    frames_written: Option<u64>,
}

impl FfmpegWriter {
    /// Create an idle writer; nothing is spawned until `start_writing`.
    pub fn new(opts: FfmpegWriterOpts) -> Self {
        Self {
            opts,
            settings: None,
            session_start: None,
            status: WriterStatus::Unknown,
            error: None,
            child: None,
            tx: None,
            feed: None,
            stderr_drain: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            broken: Arc::new(AtomicBool::new(false)),
            frames_written: None,
        }
    }

    /// Output path.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    /// Number of frames handed to `ffmpeg`, known once writing completed.
    pub fn frames_written(&self) -> Option<u64> {
        self.frames_written
    }

    fn max_in_flight(&self) -> usize {
        self.opts.max_in_flight.max(1)
    }

    fn fail(&mut self, msg: String) {
        tracing::warn!(error = %msg, "ffmpeg writer failed");
        self.status = WriterStatus::Failed;
        self.error = Some(msg);
    }

    fn kill_child(&mut self) {
        self.tx = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(feed) = self.feed.take() {
            let _ = feed.join();
        }
        if let Some(drain) = self.stderr_drain.take() {
            let _ = drain.join();
        }
    }
}

impl VideoWriter for FfmpegWriter {
    fn add_video_input(&mut self, settings: &VideoInputSettings) -> FlatviewResult<()> {
        if self.settings.is_some() {
            return Err(FlatviewError::validation("ffmpeg writer already has a video input"));
        }
        if settings.size.is_empty() || !settings.size.is_even() {
            return Err(FlatviewError::validation(format!(
                "ffmpeg writer size {} must be non-zero and even (required for yuv420p output)",
                settings.size
            )));
        }
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn start_writing(&mut self) -> FlatviewResult<()> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| FlatviewError::validation("ffmpeg writer has no video input"))?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(FlatviewError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        let EncoderProcess {
            child,
            stdin,
            stderr_drain,
        } = spawn_encoder(&self.opts, settings)?;

        let (tx, rx) = mpsc::sync_channel::<FeedMsg>(self.max_in_flight());
        let in_flight = Arc::clone(&self.in_flight);
        let broken = Arc::clone(&self.broken);
        let feed = std::thread::spawn(move || {
            let res = feed_frames(stdin, rx, &in_flight);
            if res.is_err() {
                broken.store(true, Ordering::Release);
            }
            res
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            size = %settings.size,
            encoder = settings.codec.ffmpeg_encoder(),
            "ffmpeg writer started"
        );
        self.child = Some(child);
        self.tx = Some(tx);
        self.feed = Some(feed);
        self.stderr_drain = Some(stderr_drain);
        self.status = WriterStatus::Writing;
        Ok(())
    }

    fn start_session(&mut self, at: MediaTime) -> FlatviewResult<()> {
        if self.status != WriterStatus::Writing {
            return Err(FlatviewError::validation("ffmpeg writer is not writing"));
        }
        if self.session_start.is_some() {
            return Err(FlatviewError::validation("ffmpeg writer session already started"));
        }
        self.session_start = Some(at);
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        self.status == WriterStatus::Writing
            && self.session_start.is_some()
            && !self.broken.load(Ordering::Acquire)
            && self.in_flight.load(Ordering::Acquire) < self.max_in_flight()
    }

    fn append(&mut self, buffer: PooledBuffer, presentation_time: MediaTime) -> bool {
        let (Some(settings), Some(start), Some(tx)) =
            (self.settings.as_ref(), self.session_start, self.tx.as_ref())
        else {
            return false;
        };
        if buffer.size() != settings.size || buffer.format() != settings.pixel_format {
            return false;
        }

        let slot = presentation_slot(presentation_time, start, settings.frame_rate);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        match tx.try_send(FeedMsg { slot, buffer }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.in_flight.fetch_sub(1, Ordering::AcqRel);
                self.broken.store(true, Ordering::Release);
                false
            }
        }
    }

    fn mark_as_finished(&mut self) {
        // Closing the channel lets the feed thread flush its held frame and close stdin.
        self.tx = None;
    }

    fn finish_writing(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            if self.status != WriterStatus::Writing {
                return;
            }
            self.tx = None;
            let (Some(child), Some(feed), Some(drain)) = (
                self.child.take(),
                self.feed.take(),
                self.stderr_drain.take(),
            ) else {
                self.fail("ffmpeg writer not started".to_string());
                return;
            };

            match tokio::task::spawn_blocking(move || wait_for_ffmpeg(child, feed, drain)).await {
                Ok(Ok(frames)) => {
                    tracing::debug!(frames, "ffmpeg writer completed");
                    self.frames_written = Some(frames);
                    self.status = WriterStatus::Completed;
                }
                Ok(Err(msg)) => self.fail(msg),
                Err(e) => self.fail(format!("ffmpeg wait task failed: {e}")),
            }
        }
    }

    fn status(&self) -> WriterStatus {
        self.status
    }

    fn error(&self) -> Option<String> {
        self.error.clone()
    }

    fn cancel_writing(&mut self) {
        let was_writing = self.status == WriterStatus::Writing;
        self.kill_child();
        self.status = WriterStatus::Cancelled;
        if was_writing && let Err(e) = std::fs::remove_file(&self.opts.out_path) {
            tracing::debug!(error = %e, "no partial output to remove");
        }
    }

    fn load_output(&mut self) -> impl Future<Output = FlatviewResult<OutputAsset>> + Send {
        let path = self.opts.out_path.clone();
        let completed = self.status == WriterStatus::Completed;
        async move {
            if !completed {
                return Err(FlatviewError::finalize("output is not complete"));
            }
            tokio::task::spawn_blocking(move || probe_output(&path))
                .await
                .map_err(|e| FlatviewError::finalize(format!("probe task failed: {e}")))?
        }
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.kill_child();
        }
    }
}

/// A running `ffmpeg` encoder with its stdin taken and stderr drained on a thread.
#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
struct EncoderProcess {
    child: Child,
    stdin: ChildStdin,
    stderr_drain: JoinHandle<std::io::Result<Vec<u8>>>,
}

#[cfg(feature = "media-ffmpeg")]
fn spawn_encoder(
    opts: &FfmpegWriterOpts,
    settings: &VideoInputSettings,
) -> FlatviewResult<EncoderProcess> {
    if !is_ffmpeg_on_path() {
        return Err(FlatviewError::sink_open(
            "ffmpeg is required for encoding, but was not found on PATH",
        ));
    }

    let mut child = std::process::Command::new("ffmpeg")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .args(encoder_args(opts, settings))
        .spawn()
        .map_err(|e| {
            FlatviewError::sink_open(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| FlatviewError::sink_open("failed to open ffmpeg stdin (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| FlatviewError::sink_open("failed to open ffmpeg stderr (unexpected)"))?;
    let stderr_drain = std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok(stderr_bytes)
    });
    Ok(EncoderProcess {
        child,
        stdin,
        stderr_drain,
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
fn spawn_encoder(
    _opts: &FfmpegWriterOpts,
    _settings: &VideoInputSettings,
) -> FlatviewResult<EncoderProcess> {
    Err(FlatviewError::sink_open(
        "encoding with ffmpeg requires the 'media-ffmpeg' feature",
    ))
}

/// Frame slot of `pts` on a constant-rate timeline starting at `session_start`.
pub fn presentation_slot(pts: MediaTime, session_start: MediaTime, fps: Fps) -> u64 {
    let secs = pts.secs_since(session_start);
    (secs * fps.as_f64()).round().max(0.0) as u64
}

#[cfg_attr(not(feature = "media-ffmpeg"), allow(dead_code))]
fn encoder_args(opts: &FfmpegWriterOpts, settings: &VideoInputSettings) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: &str| args.push(OsString::from(s));

    push(if opts.overwrite { "-y" } else { "-n" });
    push("-loglevel");
    push("error");
    push("-f");
    push("rawvideo");
    push("-pix_fmt");
    push(settings.pixel_format.ffmpeg_name());
    push("-s");
    push(settings.size.to_string().as_str());
    push("-r");
    push(format!("{}/{}", settings.frame_rate.num, settings.frame_rate.den).as_str());

    // Display-matrix options apply to the next input; with autorotation off they are carried into
    // the output track instead of being baked into the pixels.
    push("-noautorotate");
    let rotation = settings.orientation.rotation_degrees();
    if rotation != 0.0 {
        push("-display_rotation:v:0");
        push(rotation.to_string().as_str());
    }
    if settings.orientation.is_mirrored() {
        push("-display_hflip:v:0");
    }

    push("-i");
    push("pipe:0");
    push("-an");
    push("-c:v");
    push(settings.codec.ffmpeg_encoder());
    if settings.codec == OutputCodec::Hevc {
        push("-tag:v");
        push("hvc1");
    }
    push("-pix_fmt");
    push("yuv420p");
    push("-movflags");
    push("+faststart");
    args.push(opts.out_path.clone().into_os_string());
    args
}

/// Write queued buffers to `out`, expanding slots into a constant-rate stream.
///
/// One buffer is held back until the next slot is known. Returns the number of frames written.
fn feed_frames<Wr: Write>(
    mut out: Wr,
    rx: Receiver<FeedMsg>,
    in_flight: &AtomicUsize,
) -> std::io::Result<u64> {
    let mut held: Option<FeedMsg> = None;
    let mut written = 0u64;
    for msg in rx {
        if let Some(prev) = held.take() {
            for _ in 0..msg.slot.saturating_sub(prev.slot) {
                out.write_all(prev.buffer.bytes())?;
                written += 1;
            }
            drop(prev);
            in_flight.fetch_sub(1, Ordering::AcqRel);
        }
        held = Some(msg);
    }
    if let Some(last) = held.take() {
        out.write_all(last.buffer.bytes())?;
        written += 1;
        drop(last);
        in_flight.fetch_sub(1, Ordering::AcqRel);
    }
    out.flush()?;
    Ok(written)
}

fn wait_for_ffmpeg(
    mut child: Child,
    feed: JoinHandle<std::io::Result<u64>>,
    stderr_drain: JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<u64, String> {
    let fed = feed
        .join()
        .map_err(|_| "ffmpeg feed thread panicked".to_string())?;
    let status = child
        .wait()
        .map_err(|e| format!("failed to wait for ffmpeg to finish: {e}"))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| "ffmpeg stderr drain thread panicked".to_string())?
        .map_err(|e| format!("ffmpeg stderr read failed: {e}"))?;

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        return Err(format!("ffmpeg exited with status {status}: {}", stderr.trim()));
    }
    let frames = fed.map_err(|e| format!("failed to write frames to ffmpeg stdin: {e}"))?;
    if frames == 0 {
        return Err("no frames were written".to_string());
    }
    Ok(frames)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FlatviewResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
