//! Conversion controller: options, collaborator backends, progress and the run loop.

pub(crate) mod backend;
pub(crate) mod controller;
pub(crate) mod opts;
pub(crate) mod progress;
