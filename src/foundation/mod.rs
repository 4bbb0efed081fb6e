//! Shared primitives: error taxonomy, media time, geometry and small math helpers.

pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod math;
pub(crate) mod pixels;
