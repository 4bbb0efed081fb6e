//! Stereo sample model and the left/right eye demultiplexer.

pub(crate) mod demuxer;
pub(crate) mod sample;
