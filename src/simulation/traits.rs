//! Core execution traits
//!
//! Defines the seam between the generation scheduler and whatever actually
//! runs the transition kernel. Dispatch hands back a pending handle; the
//! scheduler must wait on it before flipping the role binding.

use super::buffers::BufferPair;
use super::cell::Grid;
use super::tiling::Tiling;
use crate::error::AutomatonResult;

/// An execution backend for the transition kernel
pub trait ComputeBackend {
    /// Backend-resident storage for one generation
    type Grid;

    /// Completion handle for an issued dispatch
    type Pending;

    /// Short name for logs
    fn name(&self) -> &str;

    /// Tile size the backend partitions each dispatch into
    fn tiling(&self) -> Tiling;

    /// Allocate one `width`×`height` grid
    fn allocate(&mut self, width: u32, height: u32) -> AutomatonResult<Self::Grid>;

    /// Bind the two grids of a pair. Called once, before the first dispatch.
    fn bind(&mut self, _grids: &BufferPair<Self::Grid>) -> AutomatonResult<()> {
        Ok(())
    }

    /// Copy a host grid into backend storage
    fn upload(&mut self, target: &mut Self::Grid, source: &Grid) -> AutomatonResult<()>;

    /// Issue one generation: read `grids.current()`, write `grids.next()`
    ///
    /// Returning does not mean the writes are visible; only a successful
    /// [`ComputeBackend::wait`] on the handle does.
    fn dispatch(&mut self, grids: &mut BufferPair<Self::Grid>) -> AutomatonResult<Self::Pending>;

    /// Block until every write of the dispatch is visible to later reads
    fn wait(&mut self, pending: Self::Pending) -> AutomatonResult<()>;

    /// Copy backend storage back into a host grid
    fn download(&mut self, source: &Self::Grid) -> AutomatonResult<Grid>;
}
