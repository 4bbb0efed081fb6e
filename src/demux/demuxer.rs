use crate::demux::sample::{StereoSample, StereoView};
use crate::foundation::error::{FlatviewError, FlatviewResult};
use crate::foundation::pixels::PixelBuffer;

/// Locate the left- and right-eye buffers of `sample`.
///
/// Returns `None` when the tagged set is absent or lacks either view.
pub fn demux(sample: &StereoSample) -> Option<(&PixelBuffer, &PixelBuffer)> {
    let left = sample.buffer_for(StereoView::LeftEye)?;
    let right = sample.buffer_for(StereoView::RightEye)?;
    Some((left, right))
}

/// Like [`demux`], but explains what is missing with [`FlatviewError::IncompleteSample`].
pub fn demux_checked(sample: &StereoSample) -> FlatviewResult<(&PixelBuffer, &PixelBuffer)> {
    if sample.tagged_buffers.is_none() {
        return Err(FlatviewError::incomplete_sample(format!(
            "sample at {} has no tagged buffers",
            sample.presentation_time
        )));
    }
    let left = sample.buffer_for(StereoView::LeftEye);
    let right = sample.buffer_for(StereoView::RightEye);
    match (left, right) {
        (Some(l), Some(r)) => Ok((l, r)),
        (None, Some(_)) => Err(FlatviewError::incomplete_sample(format!(
            "sample at {} lacks the left-eye buffer",
            sample.presentation_time
        ))),
        (Some(_), None) => Err(FlatviewError::incomplete_sample(format!(
            "sample at {} lacks the right-eye buffer",
            sample.presentation_time
        ))),
        (None, None) => Err(FlatviewError::incomplete_sample(format!(
            "sample at {} has neither eye buffer",
            sample.presentation_time
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/demux/demuxer.rs"]
mod tests;
