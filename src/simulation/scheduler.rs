//! Generation scheduler
//!
//! Two-state machine driving the buffer pair:
//!
//! - `Idle → Computing`: [`GenerationScheduler::begin`] dispatches the kernel
//!   over the whole grid and keeps the backend's pending handle.
//! - `Computing → Idle`: [`GenerationScheduler::complete`] waits on that handle
//!   until every write is visible, then flips the role binding.
//!
//! Only one generation is ever in flight. A failed dispatch or wait halts the
//! scheduler for good; the simulation state can't be trusted afterwards.

use std::mem;

use super::buffers::BufferPair;
use super::cell::Grid;
use super::traits::ComputeBackend;
use crate::error::{AutomatonError, AutomatonResult};

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    Computing,
    /// A dispatch or wait failed; no further generations will run
    Halted,
}

enum State<P> {
    Idle,
    Computing(P),
    Halted,
}

/// Drives the ping-pong protocol over a [`ComputeBackend`]
pub struct GenerationScheduler<B: ComputeBackend> {
    backend: B,
    grids: BufferPair<B::Grid>,
    state: State<B::Pending>,
    generation: u64,
    width: u32,
    height: u32,
}

impl<B: ComputeBackend> GenerationScheduler<B> {
    /// Allocate both grids once and bind them to the backend
    ///
    /// `current()` is undefined until [`GenerationScheduler::seed`] is called.
    pub fn new(mut backend: B, width: u32, height: u32) -> AutomatonResult<Self> {
        let front = backend.allocate(width, height)?;
        let back = backend.allocate(width, height)?;
        let grids = BufferPair::new([front, back]);
        backend.bind(&grids)?;

        let (tiles_x, tiles_y) = backend.tiling().tile_counts(width, height);
        log::debug!(
            "{} scheduler: {}x{} grid, {}x{} tiles",
            backend.name(),
            width,
            height,
            tiles_x,
            tiles_y
        );

        Ok(Self {
            backend,
            grids,
            state: State::Idle,
            generation: 0,
            width,
            height,
        })
    }

    pub fn phase(&self) -> SchedulerPhase {
        match self.state {
            State::Idle => SchedulerPhase::Idle,
            State::Computing(_) => SchedulerPhase::Computing,
            State::Halted => SchedulerPhase::Halted,
        }
    }

    /// Completed generations since the last seed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn require_idle(&self, operation: &str) -> AutomatonResult<()> {
        match self.state {
            State::Idle => Ok(()),
            State::Computing(_) => Err(AutomatonError::invalid_state(format!(
                "cannot {operation} while a generation is in flight"
            ))),
            State::Halted => Err(AutomatonError::invalid_state(format!(
                "cannot {operation}: scheduler halted after a failure"
            ))),
        }
    }

    /// Write the initial distribution into `current()` and restart the count
    pub fn seed(&mut self, grid: &Grid) -> AutomatonResult<()> {
        self.require_idle("seed")?;
        if grid.dimensions() != (self.width, self.height) {
            return Err(AutomatonError::config(format!(
                "seed grid {:?} does not match {}x{}",
                grid.dimensions(),
                self.width,
                self.height
            )));
        }
        self.backend.upload(self.grids.current_mut(), grid)?;
        self.generation = 0;
        log::info!(
            "seeded {}x{} grid: {} live cells",
            self.width,
            self.height,
            grid.live_count()
        );
        Ok(())
    }

    /// `Idle → Computing`: dispatch one generation
    pub fn begin(&mut self) -> AutomatonResult<()> {
        self.require_idle("begin a generation")?;
        match self.backend.dispatch(&mut self.grids) {
            Ok(pending) => {
                self.state = State::Computing(pending);
                Ok(())
            }
            Err(error) => {
                self.state = State::Halted;
                Err(error)
            }
        }
    }

    /// `Computing → Idle`: wait for the dispatch, then flip roles
    ///
    /// Returns the new generation number.
    pub fn complete(&mut self) -> AutomatonResult<u64> {
        let pending = match mem::replace(&mut self.state, State::Halted) {
            State::Computing(pending) => pending,
            other => {
                self.state = other;
                return Err(AutomatonError::invalid_state(
                    "no generation in flight to complete",
                ));
            }
        };

        // State stays Halted if the wait fails
        self.backend.wait(pending)?;
        self.grids.flip();
        self.generation += 1;
        self.state = State::Idle;

        log::trace!(
            "generation {} committed to grid {}",
            self.generation,
            self.grids.front_index()
        );
        Ok(self.generation)
    }

    /// One full `Idle → Computing → Idle` cycle
    pub fn step(&mut self) -> AutomatonResult<u64> {
        self.begin()?;
        self.complete()
    }

    /// The readable grid; never the one a dispatch is writing
    pub fn current(&self) -> &B::Grid {
        self.grids.current()
    }

    /// The pair after its last committed generation, for presentation
    pub fn committed(&self) -> AutomatonResult<&BufferPair<B::Grid>> {
        self.require_idle("present")?;
        Ok(&self.grids)
    }

    /// Copy `current()` back to the host
    pub fn read_current(&mut self) -> AutomatonResult<Grid> {
        self.require_idle("read the current generation")?;
        self.backend.download(self.grids.current())
    }

    /// Wait out any in-flight generation. Idempotent.
    pub fn shutdown(&mut self) -> AutomatonResult<()> {
        if let State::Computing(_) = self.state {
            log::debug!("waiting for in-flight generation before shutdown");
            self.complete()?;
        }
        Ok(())
    }
}

impl<B: ComputeBackend> Drop for GenerationScheduler<B> {
    fn drop(&mut self) {
        if let Err(error) = self.shutdown() {
            log::error!("in-flight generation failed during shutdown: {error}");
        }
    }
}
