use crate::foundation::core::MediaTime;
use crate::foundation::pixels::PixelBuffer;

/// Stereo view role of a decoded sub-buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StereoView {
    /// Left-eye view.
    LeftEye,
    /// Right-eye view.
    RightEye,
}

/// A decoded sub-buffer annotated with its stereo view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaggedBuffer {
    /// View role.
    pub view: StereoView,
    /// Decoded pixels.
    pub buffer: PixelBuffer,
}

impl TaggedBuffer {
    /// Tag `buffer` with `view`.
    pub fn new(view: StereoView, buffer: PixelBuffer) -> Self {
        Self { view, buffer }
    }
}

/// One decoded access unit.
///
/// A well-formed sample carries one left-eye and one right-eye buffer. `tagged_buffers` is `None`
/// when the decoder could not attach any tagged set at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StereoSample {
    /// Output presentation timestamp shared by both views.
    pub presentation_time: MediaTime,
    /// Tagged sub-buffers, in decoder order.
    pub tagged_buffers: Option<Vec<TaggedBuffer>>,
}

impl StereoSample {
    /// Build a well-formed two-view sample.
    pub fn stereo(presentation_time: MediaTime, left: PixelBuffer, right: PixelBuffer) -> Self {
        Self {
            presentation_time,
            tagged_buffers: Some(vec![
                TaggedBuffer::new(StereoView::LeftEye, left),
                TaggedBuffer::new(StereoView::RightEye, right),
            ]),
        }
    }

    /// Build a sample from an arbitrary tagged set.
    pub fn tagged(presentation_time: MediaTime, buffers: Vec<TaggedBuffer>) -> Self {
        Self {
            presentation_time,
            tagged_buffers: Some(buffers),
        }
    }

    /// Build a sample with no tagged set.
    pub fn untagged(presentation_time: MediaTime) -> Self {
        Self {
            presentation_time,
            tagged_buffers: None,
        }
    }

    /// First buffer tagged with `view`.
    pub fn buffer_for(&self, view: StereoView) -> Option<&PixelBuffer> {
        self.tagged_buffers
            .as_deref()?
            .iter()
            .find(|t| t.view == view)
            .map(|t| &t.buffer)
    }
}
