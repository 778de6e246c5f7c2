//! CPU reference backend
//!
//! Executes a [`TransitionRule`] over the same tile partition the GPU kernel
//! uses. Each row of tiles owns a disjoint band of `next()` and only reads
//! `current()`; bands are processed in parallel with rayon. Dispatch
//! completes synchronously, which makes this backend the reference for
//! checking kernel logic without a GPU.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;

use super::boundary::{BoundaryPolicy, Neighborhood};
use super::buffers::BufferPair;
use super::cell::{Cell, Grid};
use super::rule::TransitionRule;
use super::tiling::Tiling;
use super::traits::ComputeBackend;
use crate::error::{AutomatonError, AutomatonResult};

/// Completion handle for a CPU dispatch; the work is already done
#[derive(Debug)]
pub struct CpuPending {
    cells_written: usize,
}

/// Host-side backend for any [`TransitionRule`]
pub struct CpuBackend<R: TransitionRule> {
    rule: R,
    boundary: BoundaryPolicy,
    tiling: Tiling,
    coverage: Option<Vec<u32>>,
    last_invocations: u64,
}

impl<R: TransitionRule> CpuBackend<R> {
    pub fn new(rule: R, boundary: BoundaryPolicy) -> Self {
        Self {
            rule,
            boundary,
            tiling: Tiling::KERNEL,
            coverage: None,
            last_invocations: 0,
        }
    }

    pub fn with_tiling(mut self, tiling: Tiling) -> Self {
        self.tiling = tiling;
        self
    }

    /// Count how many times each cell is written per dispatch
    pub fn with_coverage_tracking(mut self) -> Self {
        self.coverage = Some(Vec::new());
        self
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Per-cell write counts of the last dispatch, if tracking is on
    pub fn last_coverage(&self) -> Option<&[u32]> {
        self.coverage.as_deref()
    }

    /// Invocations issued by the last dispatch, including out-of-bounds ones
    pub fn last_invocations(&self) -> u64 {
        self.last_invocations
    }
}

/// Everything a tile row needs besides its output band
struct TileRowJob<'a, R> {
    rule: &'a R,
    current: &'a Grid,
    tiling: Tiling,
    tiles_x: u32,
    boundary: BoundaryPolicy,
}

impl<R: TransitionRule> TileRowJob<'_, R> {
    fn run(&self, ty: u32, cells: &mut [Cell], mut coverage: Option<&mut [u32]>) {
        let (width, height) = self.current.dimensions();
        let row_origin = ty * self.tiling.tile_height;

        for tx in 0..self.tiles_x {
            for (x, y) in self.tiling.invocations(tx, ty) {
                if x >= width || y >= height {
                    continue;
                }
                let local = (y - row_origin) as usize * width as usize + x as usize;
                cells[local] = self
                    .rule
                    .transition(&Neighborhood::gather(self.current, x, y, self.boundary));
                if let Some(coverage) = coverage.as_deref_mut() {
                    coverage[local] += 1;
                }
            }
        }
    }
}

impl<R: TransitionRule> ComputeBackend for CpuBackend<R> {
    type Grid = Grid;
    type Pending = CpuPending;

    fn name(&self) -> &str {
        "cpu"
    }

    fn tiling(&self) -> Tiling {
        self.tiling
    }

    fn allocate(&mut self, width: u32, height: u32) -> AutomatonResult<Grid> {
        if width == 0 || height == 0 {
            return Err(AutomatonError::allocation(format!(
                "cannot allocate a {width}x{height} grid"
            )));
        }
        Ok(Grid::new(width, height))
    }

    fn upload(&mut self, target: &mut Grid, source: &Grid) -> AutomatonResult<()> {
        if target.dimensions() != source.dimensions() {
            return Err(AutomatonError::dispatch(format!(
                "upload of {:?} grid into {:?} storage",
                source.dimensions(),
                target.dimensions()
            )));
        }
        target.clone_from(source);
        Ok(())
    }

    fn dispatch(&mut self, grids: &mut BufferPair<Grid>) -> AutomatonResult<CpuPending> {
        let (current, next) = grids.split();
        if current.dimensions() != next.dimensions() {
            return Err(AutomatonError::dispatch("grid pair dimensions differ"));
        }

        let (width, height) = current.dimensions();
        let tiling = self.tiling;
        let (tiles_x, tiles_y) = tiling.tile_counts(width, height);
        let band_len = width as usize * tiling.tile_height as usize;

        let mut coverage = self.coverage.take();
        if let Some(counts) = coverage.as_mut() {
            counts.clear();
            counts.resize(width as usize * height as usize, 0);
        }

        let job = TileRowJob {
            rule: &self.rule,
            current,
            tiling,
            tiles_x,
            boundary: self.boundary,
        };
        let bands = next.cells_mut().par_chunks_mut(band_len);

        // A panicking rule surfaces from rayon on this thread
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match coverage.as_deref_mut() {
            Some(counts) => bands
                .zip(counts.par_chunks_mut(band_len))
                .enumerate()
                .for_each(|(ty, (cells, counts))| job.run(ty as u32, cells, Some(counts))),
            None => bands
                .enumerate()
                .for_each(|(ty, cells)| job.run(ty as u32, cells, None)),
        }));
        self.coverage = coverage;
        outcome.map_err(|_| AutomatonError::dispatch("transition rule panicked"))?;

        self.last_invocations = tiles_x as u64
            * tiles_y as u64
            * tiling.tile_width as u64
            * tiling.tile_height as u64;

        Ok(CpuPending {
            cells_written: width as usize * height as usize,
        })
    }

    fn wait(&mut self, pending: CpuPending) -> AutomatonResult<()> {
        log::trace!("cpu dispatch complete: {} cells", pending.cells_written);
        Ok(())
    }

    fn download(&mut self, source: &Grid) -> AutomatonResult<Grid> {
        Ok(source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::rule::LifeRule;

    fn pair(grid: Grid) -> BufferPair<Grid> {
        let (w, h) = grid.dimensions();
        BufferPair::new([grid, Grid::new(w, h)])
    }

    #[test]
    fn test_dispatch_writes_next_only() {
        let mut seed = Grid::new(5, 5);
        for x in 1..4 {
            seed.set_alive(x, 2, true);
        }
        let mut grids = pair(seed.clone());
        let mut backend = CpuBackend::new(LifeRule::CONWAY, BoundaryPolicy::Dead);

        let pending = backend.dispatch(&mut grids).unwrap();
        backend.wait(pending).unwrap();

        assert_eq!(*grids.current(), seed);
        assert_eq!(grids.next().live_cells(), vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn test_full_coverage_under_tiling() {
        let mut grids = pair(Grid::new(17, 17));
        let mut backend = CpuBackend::new(LifeRule::CONWAY, BoundaryPolicy::Wrap)
            .with_tiling(Tiling::new(16, 16))
            .with_coverage_tracking();

        let pending = backend.dispatch(&mut grids).unwrap();
        backend.wait(pending).unwrap();

        let coverage = backend.last_coverage().unwrap();
        assert_eq!(coverage.len(), 17 * 17);
        assert!(coverage.iter().all(|&count| count == 1));
        assert_eq!(backend.last_invocations(), 4 * 16 * 16);
    }

    #[test]
    fn test_tile_size_does_not_change_result() {
        let seed = crate::simulation::seed::SeedDistribution::random(0.4, Some(3))
            .generate(37, 23)
            .unwrap();

        let mut small = pair(seed.clone());
        let mut large = pair(seed);
        let mut by_fours = CpuBackend::new(LifeRule::CONWAY, BoundaryPolicy::Wrap)
            .with_tiling(Tiling::new(4, 4));
        let mut by_kernel = CpuBackend::new(LifeRule::CONWAY, BoundaryPolicy::Wrap);

        let p = by_fours.dispatch(&mut small).unwrap();
        by_fours.wait(p).unwrap();
        let p = by_kernel.dispatch(&mut large).unwrap();
        by_kernel.wait(p).unwrap();

        assert_eq!(small.next(), large.next());
    }

    #[test]
    fn test_upload_rejects_mismatched_dimensions() {
        let mut backend = CpuBackend::new(LifeRule::CONWAY, BoundaryPolicy::Wrap);
        let mut target = backend.allocate(4, 4).unwrap();
        assert!(backend.upload(&mut target, &Grid::new(3, 4)).is_err());
        assert!(backend.allocate(0, 4).is_err());
    }

    #[test]
    fn test_panicking_rule_is_a_dispatch_error() {
        let rule = |_: &Neighborhood| -> Cell { panic!("kernel fault") };
        let mut backend = CpuBackend::new(rule, BoundaryPolicy::Wrap).with_tiling(Tiling::new(2, 1));
        let mut grids = pair(Grid::new(4, 4));
        assert!(matches!(
            backend.dispatch(&mut grids),
            Err(AutomatonError::Dispatch(_))
        ));
    }
}
