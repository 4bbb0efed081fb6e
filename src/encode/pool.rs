use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::core::PixelSize;
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::pixels::PixelFormat;

/// Pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size of every buffer.
    pub size: PixelSize,
    /// Byte layout of every buffer.
    pub format: PixelFormat,
    /// Maximum number of buffers alive at once (outstanding + retained).
    pub max_buffers: usize,
}

/// Why a buffer could not be handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// Every buffer is outstanding.
    Exhausted,
    /// The caller asked for a different byte layout than the pool holds.
    FormatMismatch {
        /// Format held by the pool.
        pool: PixelFormat,
        /// Format requested.
        requested: PixelFormat,
    },
}

/// Pool counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers currently handed out.
    pub outstanding: usize,
    /// Buffers waiting for reuse.
    pub retained: usize,
    /// Total allocations over the pool lifetime.
    pub allocated: u64,
}

struct PoolState {
    free: Vec<Vec<u8>>,
    stats: PoolStats,
}

struct PoolInner {
    cfg: PoolConfig,
    stride: usize,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn state(&self) -> MutexGuard<'_, PoolState> {
        // A panic while holding the lock cannot leave counters half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, storage: Vec<u8>) {
        let mut st = self.state();
        st.stats.outstanding = st.stats.outstanding.saturating_sub(1);
        st.stats.retained += 1;
        st.free.push(storage);
    }
}

/// Bounded pool of fixed-size pixel buffers.
///
/// Buffers come back automatically when their [`PooledBuffer`] guard is dropped, whichever
/// thread drops it. Cloning the pool shares the same storage.
#[derive(Clone)]
pub struct PixelBufferPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for PixelBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBufferPool")
            .field("cfg", &self.inner.cfg)
            .field("stats", &self.stats())
            .finish()
    }
}

impl PixelBufferPool {
    /// Create an empty pool; buffers are allocated lazily.
    pub fn new(cfg: PoolConfig) -> FlatviewResult<Self> {
        if cfg.size.is_empty() {
            return Err(FlatviewError::validation("pixel buffer pool size must be non-zero"));
        }
        if cfg.max_buffers == 0 {
            return Err(FlatviewError::validation(
                "pixel buffer pool must allow at least one buffer",
            ));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                stride: cfg.size.width as usize * cfg.format.bytes_per_pixel(),
                cfg,
                state: Mutex::new(PoolState {
                    free: Vec::new(),
                    stats: PoolStats::default(),
                }),
            }),
        })
    }

    /// Pool configuration.
    pub fn config(&self) -> PoolConfig {
        self.inner.cfg
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.state().stats
    }

    /// Hand out a buffer of `format`, reusing a retained one when possible.
    pub fn try_acquire(&self, format: PixelFormat) -> Result<PooledBuffer, AcquireError> {
        let cfg = self.inner.cfg;
        if format != cfg.format {
            return Err(AcquireError::FormatMismatch {
                pool: cfg.format,
                requested: format,
            });
        }

        let mut st = self.inner.state();
        let storage = match st.free.pop() {
            Some(storage) => {
                st.stats.retained -= 1;
                storage
            }
            None => {
                if st.stats.outstanding >= cfg.max_buffers {
                    return Err(AcquireError::Exhausted);
                }
                st.stats.allocated += 1;
                vec![0u8; self.inner.stride * cfg.size.height as usize]
            }
        };
        st.stats.outstanding += 1;
        drop(st);

        Ok(PooledBuffer {
            pool: Arc::clone(&self.inner),
            storage: Some(storage),
        })
    }
}

/// A buffer on loan from a [`PixelBufferPool`]; returned to the pool on drop.
pub struct PooledBuffer {
    pool: Arc<PoolInner>,
    storage: Option<Vec<u8>>,
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("size", &self.size())
            .field("format", &self.format())
            .finish()
    }
}

impl PooledBuffer {
    /// Buffer size.
    pub fn size(&self) -> PixelSize {
        self.pool.cfg.size
    }

    /// Byte layout.
    pub fn format(&self) -> PixelFormat {
        self.pool.cfg.format
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.pool.stride
    }

    /// Read-only view of the pixel bytes.
    pub fn bytes(&self) -> &[u8] {
        self.storage.as_deref().unwrap_or(&[])
    }

    /// Lock the base address for writing. Unlocked when the guard drops.
    pub fn lock(&mut self) -> LockedPixels<'_> {
        let stride = self.pool.stride;
        let height = self.pool.cfg.size.height;
        LockedPixels {
            bytes: self.storage.as_deref_mut().unwrap_or(&mut []),
            stride,
            height,
        }
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(storage) = self.storage.take() {
            self.pool.release(storage);
        }
    }
}

/// Writable access to a locked [`PooledBuffer`].
pub struct LockedPixels<'a> {
    bytes: &'a mut [u8],
    stride: usize,
    height: u32,
}

impl LockedPixels<'_> {
    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Mutable bytes of row `y` (one full stride).
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        &mut self.bytes[start..start + self.stride]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/pool.rs"]
mod tests;
