//! Cellular automaton core
//!
//! Grid storage, rules and boundary handling, the double-buffered state pair,
//! and the generation scheduler with its CPU and GPU backends.

pub mod boundary;
pub mod buffers;
pub mod cell;
pub mod cpu;
pub mod gpu;
pub mod rule;
pub mod scheduler;
pub mod seed;
pub mod tiling;
pub mod traits;

pub use boundary::{BoundaryPolicy, Neighborhood};
pub use buffers::BufferPair;
pub use cell::{Cell, Grid};
pub use cpu::CpuBackend;
pub use gpu::{GpuBackend, GpuGrid};
pub use rule::{LifeRule, TransitionRule};
pub use scheduler::{GenerationScheduler, SchedulerPhase};
pub use seed::{SeedDistribution, SeedPattern};
pub use tiling::Tiling;
pub use traits::ComputeBackend;
