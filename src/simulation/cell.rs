//! Cell and grid representation
//!
//! A cell is four 8-bit channels with the alive/dead state replicated across
//! all of them, which is also the texel layout of the GPU textures
//! (`Rgba8Uint`). A [`Grid`] is the host-side copy of one generation.

use bytemuck::{Pod, Zeroable};

/// One cell of simulation state
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Cell {
    pub rgba: [u8; 4],
}

impl Cell {
    pub const ALIVE: Cell = Cell { rgba: [255; 4] };
    pub const DEAD: Cell = Cell { rgba: [0; 4] };

    pub fn from_alive(alive: bool) -> Self {
        if alive {
            Self::ALIVE
        } else {
            Self::DEAD
        }
    }

    /// The red channel carries the state; the others mirror it for display
    pub fn is_alive(&self) -> bool {
        self.rgba[0] != 0
    }
}

/// A full W×H generation held in host memory, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell dead
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::DEAD; width as usize * height as usize],
        }
    }

    /// Build a grid from a row-major alive map
    ///
    /// Returns `None` when the map length doesn't match `width * height`.
    pub fn from_alive_map(width: u32, height: u32, alive: &[bool]) -> Option<Self> {
        if alive.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            cells: alive.iter().map(|&a| Cell::from_alive(a)).collect(),
        })
    }

    /// Build a grid from raw texel bytes (4 bytes per cell, tightly packed rows)
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() != width as usize * height as usize * std::mem::size_of::<Cell>() {
            return None;
        }
        Some(Self {
            width,
            height,
            cells: bytemuck::cast_slice(bytes).to_vec(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Cell {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, cell: Cell) {
        let index = self.index(x, y);
        self.cells[index] = cell;
    }

    pub fn set_alive(&mut self, x: u32, y: u32, alive: bool) {
        self.set(x, y, Cell::from_alive(alive));
    }

    pub fn is_alive(&self, x: u32, y: u32) -> bool {
        self.get(x, y).is_alive()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Raw texel bytes, ready for a texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_alive()).count()
    }

    /// Coordinates of every live cell, row by row
    pub fn live_cells(&self) -> Vec<(u32, u32)> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_alive(x, y))
            .collect()
    }
}
