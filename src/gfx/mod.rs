//! # Graphics
//!
//! GPU context setup and the presentation stage that draws the current
//! generation to the window surface.

pub mod context;
pub mod presentation;

pub use context::{ErrorSink, GpuContext};
pub use presentation::Presenter;
