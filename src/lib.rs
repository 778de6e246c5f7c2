//! lifegrid
//!
//! A GPU cellular automaton built on wgpu and winit. Generations are computed
//! by a compute kernel into a pair of ping-pong textures and drawn with a
//! full-surface quad.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod performance;
pub mod simulation;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::App;
pub use config::AppConfig;
pub use error::{AutomatonError, AutomatonResult};

/// Build the frame driver from `config` and run it to completion
pub fn run(config: AppConfig) -> AutomatonResult<()> {
    App::new(config)?.run()
}
