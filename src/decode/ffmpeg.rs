use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdout};
#[cfg(feature = "media-ffmpeg")]
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::assets::probe::{SpatialVideoAsset, VideoTrackInfo};
use crate::decode::source::SampleSource;
use crate::demux::sample::StereoSample;
use crate::foundation::core::{Fps, MediaTime, PixelSize};
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::pixels::{PixelBuffer, PixelFormat};

/// Decoded samples buffered ahead of the consumer.
pub const DEFAULT_DECODE_QUEUE: usize = 2;

/// What the reader thread needs to turn raw frames into samples.
#[derive(Clone, Debug, PartialEq)]
pub struct StereoDecodePlan {
    /// Source file.
    pub source_path: PathBuf,
    /// Container stream index of the multi-view track.
    pub stream_index: u32,
    /// Coded size of one view.
    pub view_size: PixelSize,
    /// Presentation times in presentation order; may be shorter than the stream.
    pub presentation_times: Vec<MediaTime>,
    /// Rate used to synthesize timestamps past the end of `presentation_times`.
    pub frame_rate: Fps,
}

impl StereoDecodePlan {
    /// Plan decoding `track` of `asset` at `frame_rate`.
    pub fn for_track(asset: &SpatialVideoAsset, track: &VideoTrackInfo, frame_rate: Fps) -> Self {
        Self {
            source_path: asset.source_path.clone(),
            stream_index: track.stream_index,
            view_size: track.natural_size,
            presentation_times: asset.presentation_times.clone(),
            frame_rate,
        }
    }

    /// Presentation time of decoded frame `n`.
    pub fn presentation_time(&self, n: u64) -> MediaTime {
        usize::try_from(n)
            .ok()
            .and_then(|i| self.presentation_times.get(i).copied())
            .unwrap_or_else(|| self.frame_rate.frame_time(n))
    }

    /// `ffmpeg` arguments decoding both views stacked vertically (left on top) as raw RGBA.
    pub fn ffmpeg_args(&self) -> Vec<OsString> {
        let s = self.stream_index;
        // Both views are decoded; the filter graph picks them by stereo position.
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-nostdin",
            "-noautorotate",
            "-view_ids",
            "-1",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(self.source_path.clone().into_os_string());
        for a in [
            "-filter_complex".to_string(),
            format!("[0:{s}:vpos:left][0:{s}:vpos:right]vstack=inputs=2[sbs]"),
            "-map".to_string(),
            "[sbs]".to_string(),
            "-an".to_string(),
            "-fps_mode".to_string(),
            "passthrough".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            PixelFormat::Rgba8.ffmpeg_name().to_string(),
            "pipe:1".to_string(),
        ] {
            args.push(OsString::from(a));
        }
        args
    }

    fn view_bytes(&self) -> usize {
        self.view_size.width as usize
            * self.view_size.height as usize
            * PixelFormat::Rgba8.bytes_per_pixel()
    }

    /// Split one stacked frame into a left/right sample.
    pub fn split_frame(&self, n: u64, stacked: Vec<u8>) -> FlatviewResult<StereoSample> {
        let half = self.view_bytes();
        if stacked.len() != half * 2 {
            return Err(FlatviewError::incomplete_sample(format!(
                "decoded frame {n} has {} bytes, expected {}",
                stacked.len(),
                half * 2
            )));
        }
        let mut left = stacked;
        let right = left.split_off(half);
        let PixelSize { width, height } = self.view_size;
        Ok(StereoSample::stereo(
            self.presentation_time(n),
            PixelBuffer::new(width, height, PixelFormat::Rgba8, left)?,
            PixelBuffer::new(width, height, PixelFormat::Rgba8, right)?,
        ))
    }
}

/// Multi-view decoder on top of the system `ffmpeg` (7.1 or newer).
///
/// A reader thread decodes ahead into a bounded queue; `next_sample` awaits the queue. Dropping the
/// source kills the decoder.
pub struct FfmpegStereoSource {
    rx: mpsc::Receiver<FlatviewResult<StereoSample>>,
    child: Arc<Mutex<Child>>,
    reader: Option<JoinHandle<()>>,
    stderr_drain: Option<StderrDrain>,
}

impl FfmpegStereoSource {
    /// Spawn the decoder for `plan`, buffering at most `queue` samples.
    pub fn spawn(plan: StereoDecodePlan, queue: usize) -> FlatviewResult<Self> {
        if plan.view_size.is_empty() {
            return Err(FlatviewError::invalid_video("view size must be non-zero"));
        }
        let (child, stdout, stderr_drain) = spawn_decoder(&plan)?;

        tracing::debug!(
            source = %plan.source_path.display(),
            stream = plan.stream_index,
            view = %plan.view_size,
            "ffmpeg stereo decoder started"
        );
        let (tx, rx) = mpsc::channel(queue.max(1));
        let reader = std::thread::spawn(move || read_samples(&plan, stdout, &tx));

        Ok(Self {
            rx,
            child: Arc::new(Mutex::new(child)),
            reader: Some(reader),
            stderr_drain: Some(stderr_drain),
        })
    }

    fn child(&self) -> MutexGuard<'_, Child> {
        lock_child(&self.child)
    }
}

impl SampleSource for FfmpegStereoSource {
    fn next_sample(&mut self) -> impl Future<Output = FlatviewResult<Option<StereoSample>>> + Send {
        async move {
            match self.rx.recv().await {
                Some(Ok(sample)) => Ok(Some(sample)),
                Some(Err(e)) => Err(e),
                None => {
                    let Some(reader) = self.reader.take() else {
                        return Ok(None);
                    };
                    let child = Arc::clone(&self.child);
                    let drain = self.stderr_drain.take();
                    tokio::task::spawn_blocking(move || reap_decoder(reader, &child, drain))
                        .await
                        .map_err(|e| anyhow::anyhow!("decoder reap task failed: {e}"))??;
                    Ok(None)
                }
            }
        }
    }
}

impl Drop for FfmpegStereoSource {
    fn drop(&mut self) {
        self.rx.close();
        {
            let mut child = self.child();
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
        }
        let child = Arc::clone(&self.child);
        let reader = self.reader.take();
        let drain = self.stderr_drain.take();
        let teardown = move || {
            let _ = lock_child(&child).wait();
            if let Some(reader) = reader {
                let _ = reader.join();
            }
            if let Some(drain) = drain {
                let _ = drain.join();
            }
        };
        // Waiting on the killed decoder must not stall an async caller.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(teardown);
            }
            Err(_) => teardown(),
        }
    }
}

type StderrDrain = JoinHandle<std::io::Result<Vec<u8>>>;

#[cfg(feature = "media-ffmpeg")]
fn spawn_decoder(plan: &StereoDecodePlan) -> FlatviewResult<(Child, ChildStdout, StderrDrain)> {
    let mut child = std::process::Command::new("ffmpeg")
        .args(plan.ffmpeg_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            FlatviewError::invalid_video(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| FlatviewError::invalid_video("failed to open ffmpeg stdout (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| FlatviewError::invalid_video("failed to open ffmpeg stderr (unexpected)"))?;
    let stderr_drain = std::thread::spawn(move || {
        let mut stderr_bytes = Vec::new();
        stderr.read_to_end(&mut stderr_bytes)?;
        Ok(stderr_bytes)
    });
    Ok((child, stdout, stderr_drain))
}

#[cfg(not(feature = "media-ffmpeg"))]
fn spawn_decoder(_plan: &StereoDecodePlan) -> FlatviewResult<(Child, ChildStdout, StderrDrain)> {
    Err(FlatviewError::invalid_video(
        "decoding with ffmpeg requires the 'media-ffmpeg' feature",
    ))
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|e| e.into_inner())
}

/// Join the reader, wait for the decoder and surface a non-zero exit.
fn reap_decoder(
    reader: JoinHandle<()>,
    child: &Mutex<Child>,
    stderr_drain: Option<StderrDrain>,
) -> FlatviewResult<()> {
    reader
        .join()
        .map_err(|_| anyhow::anyhow!("ffmpeg reader thread panicked"))?;
    let status = lock_child(child)
        .wait()
        .map_err(|e| anyhow::anyhow!("failed to wait for ffmpeg decoder: {e}"))?;
    let stderr_bytes = match stderr_drain {
        Some(handle) => handle
            .join()
            .map_err(|_| anyhow::anyhow!("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| anyhow::anyhow!("ffmpeg stderr read failed: {e}"))?,
        None => Vec::new(),
    };
    if !status.success() {
        return Err(FlatviewError::invalid_video(format!(
            "ffmpeg decoder exited with status {status}: {}",
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }
    Ok(())
}

fn read_samples(
    plan: &StereoDecodePlan,
    mut stdout: ChildStdout,
    tx: &mpsc::Sender<FlatviewResult<StereoSample>>,
) {
    let frame_len = plan.view_bytes() * 2;
    let mut n = 0u64;
    loop {
        let mut stacked = vec![0u8; frame_len];
        match read_frame(&mut stdout, &mut stacked) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                tracing::warn!(frame = n, error = %e, "truncated frame at end of decoder output");
                break;
            }
        }
        let sample = plan.split_frame(n, stacked);
        if tx.blocking_send(sample).is_err() {
            // Consumer is gone.
            break;
        }
        n += 1;
    }
    tracing::debug!(frames = n, "ffmpeg stereo decoder drained");
}

/// Fill `buf` completely. Returns `Ok(false)` on a clean end of stream before the first byte.
fn read_frame(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("got {filled} of {} bytes", buf.len()),
                ));
            }
            Ok(k) => filled += k,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/ffmpeg.rs"]
mod tests;
