//! Side-by-side frame compositing.

pub(crate) mod compositor;
