//! Source and output asset descriptions, populated from `ffprobe`.

pub(crate) mod probe;
