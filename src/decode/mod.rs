//! Decoded stereo sample sources.

pub(crate) mod ffmpeg;
pub(crate) mod source;
