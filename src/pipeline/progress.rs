use crate::foundation::core::MediaTime;

/// Conversion progress as a ratio in `[0, 1]` that never goes backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProgressState {
    ratio: f64,
}

impl ProgressState {
    /// Current ratio.
    pub fn ratio(self) -> f64 {
        self.ratio
    }

    /// Advance to `timestamp / duration` and return the new ratio.
    ///
    /// Non-finite or regressing values leave the ratio unchanged.
    pub fn advance(&mut self, timestamp: MediaTime, duration: MediaTime) -> f64 {
        let total = duration.as_secs_f64();
        if total > 0.0 {
            let r = timestamp.as_secs_f64() / total;
            if r.is_finite() {
                self.ratio = self.ratio.max(r.clamp(0.0, 1.0));
            }
        }
        self.ratio
    }

    /// Jump to completion.
    pub fn complete(&mut self) -> f64 {
        self.ratio = 1.0;
        self.ratio
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
