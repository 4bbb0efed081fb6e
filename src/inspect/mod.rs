//! Spatial asset inspection: spatial-format tag lookup and track geometry.

pub(crate) mod inspector;
