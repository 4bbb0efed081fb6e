//! Encoding side of a conversion.
//!
//! Composite images are rendered into pooled pixel buffers and appended to a [`writer::VideoWriter`]
//! through an [`sink::EncodingSink`].

pub(crate) mod ffmpeg;
pub(crate) mod memory;
pub(crate) mod pool;
pub(crate) mod render;
pub(crate) mod sink;
pub(crate) mod writer;
