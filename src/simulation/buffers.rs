//! State buffer pair
//!
//! Two equally-shaped grids held in a fixed array, with an index selecting
//! which one is the readable `front`. Resolving `current()`/`next()` is an
//! indexed lookup. Only the generation scheduler flips the index, after the
//! backend has confirmed the writes to `next()` are complete.

/// Number of physical grids in the ring
pub const GRID_COUNT: usize = 2;

/// Fixed-size ring of grids with a role binding
#[derive(Debug)]
pub struct BufferPair<G> {
    grids: [G; GRID_COUNT],
    front: usize,
}

impl<G> BufferPair<G> {
    /// `grids[0]` starts as the front (readable) grid
    pub fn new(grids: [G; GRID_COUNT]) -> Self {
        Self { grids, front: 0 }
    }

    /// Index of the physical grid currently bound as `front`
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// Index of the physical grid currently bound as `back`
    pub fn back_index(&self) -> usize {
        (self.front + 1) % GRID_COUNT
    }

    /// The grid eligible for reading
    pub fn current(&self) -> &G {
        &self.grids[self.front]
    }

    /// The grid eligible for writing
    pub fn next(&self) -> &G {
        &self.grids[self.back_index()]
    }

    pub(crate) fn current_mut(&mut self) -> &mut G {
        &mut self.grids[self.front]
    }

    /// Borrow `current()` for reading and `next()` for writing at once
    pub fn split(&mut self) -> (&G, &mut G) {
        let (first, second) = self.grids.split_at_mut(1);
        if self.front == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Physical grid by index, independent of role
    pub fn physical(&self, index: usize) -> &G {
        &self.grids[index]
    }

    /// Make the just-written grid the new front
    pub(crate) fn flip(&mut self) {
        self.front = self.back_index();
    }
}
