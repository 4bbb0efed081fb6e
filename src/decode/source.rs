use std::collections::VecDeque;
use std::future::Future;

use crate::demux::sample::StereoSample;
use crate::foundation::error::FlatviewResult;

/// Pull-based source of decoded stereo samples, in presentation order.
///
/// `next_sample` resolves to `Ok(None)` once the source is exhausted. Dropping a source releases
/// its decoder.
pub trait SampleSource: Send {
    /// Pull the next decoded sample.
    fn next_sample(&mut self) -> impl Future<Output = FlatviewResult<Option<StereoSample>>> + Send;
}

/// Source replaying a fixed list of samples.
#[derive(Debug, Default)]
pub struct VecSampleSource {
    samples: VecDeque<StereoSample>,
    pulled: u64,
}

impl VecSampleSource {
    /// Replay `samples` in order.
    pub fn new(samples: impl IntoIterator<Item = StereoSample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            pulled: 0,
        }
    }

    /// Samples handed out so far.
    pub fn pulled(&self) -> u64 {
        self.pulled
    }

    /// Samples not yet pulled.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl SampleSource for VecSampleSource {
    fn next_sample(&mut self) -> impl Future<Output = FlatviewResult<Option<StereoSample>>> + Send {
        let next = self.samples.pop_front();
        if next.is_some() {
            self.pulled += 1;
        }
        std::future::ready(Ok(next))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/source.rs"]
mod tests;
