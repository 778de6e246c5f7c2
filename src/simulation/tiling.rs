//! Dispatch tiling
//!
//! The W×H domain is split into fixed-size tiles (workgroups on the GPU).
//! Tile counts are ceiling-divided so the domain is always covered; the
//! invocations that land past the grid edge must do nothing.

/// Tile dimensions used to partition a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiling {
    pub tile_width: u32,
    pub tile_height: u32,
}

impl Tiling {
    /// Workgroup size compiled into the default transition kernel
    pub const KERNEL: Tiling = Tiling {
        tile_width: 16,
        tile_height: 16,
    };

    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width: tile_width.max(1),
            tile_height: tile_height.max(1),
        }
    }

    /// Number of tiles along each axis needed to cover `width`×`height`
    pub fn tile_counts(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.div_ceil(self.tile_width),
            height.div_ceil(self.tile_height),
        )
    }

    /// Every invocation coordinate of tile `(tx, ty)`, in bounds or not
    pub fn invocations(&self, tx: u32, ty: u32) -> impl Iterator<Item = (u32, u32)> {
        let (tw, th) = (self.tile_width, self.tile_height);
        (0..th).flat_map(move |ly| (0..tw).map(move |lx| (tx * tw + lx, ty * th + ly)))
    }
}

impl Default for Tiling {
    fn default() -> Self {
        Self::KERNEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_division() {
        let tiling = Tiling::KERNEL;
        assert_eq!(tiling.tile_counts(16, 16), (1, 1));
        assert_eq!(tiling.tile_counts(17, 17), (2, 2));
        assert_eq!(tiling.tile_counts(1024, 1000), (64, 63));
        assert_eq!(tiling.tile_counts(1, 1), (1, 1));
    }

    #[test]
    fn test_invocations_cover_tile() {
        let tiling = Tiling::new(4, 2);
        let coords: Vec<_> = tiling.invocations(1, 1).collect();
        assert_eq!(coords.len(), 8);
        assert_eq!(coords.first(), Some(&(4, 2)));
        assert_eq!(coords.last(), Some(&(7, 3)));
    }

    #[test]
    fn test_zero_tile_clamped() {
        let tiling = Tiling::new(0, 0);
        assert_eq!(tiling.tile_counts(3, 3), (3, 3));
    }
}
