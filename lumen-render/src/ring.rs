//! Rotating per-frame resources.
//!
//! The CPU writes slot `frame_index % N` while the GPU may still be reading
//! the previous N-1 slots, so a slot is only rewritten every N frames.

/// Fewest slots that still let the CPU and GPU overlap.
pub const MIN_SLOTS: usize = 2;

#[derive(Debug)]
pub struct BufferRing<T> {
    slots: Vec<T>,
    /// Frame counter for slot selection (frame_index % N).
    frame_index: u64,
}

impl<T> BufferRing<T> {
    /// Build `count` slots (at least `MIN_SLOTS`) with `make(slot_index)`.
    pub fn new(count: usize, make: impl FnMut(usize) -> T) -> Self {
        let count = count.max(MIN_SLOTS);
        Self {
            slots: (0..count).map(make).collect(),
            frame_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index of the slot for the current frame.
    #[inline]
    pub fn index(&self) -> usize {
        (self.frame_index % self.slots.len() as u64) as usize
    }

    pub fn current(&self) -> &T {
        &self.slots[self.index()]
    }

    pub fn current_mut(&mut self) -> &mut T {
        let index = self.index();
        &mut self.slots[index]
    }

    /// Move to the next slot. Call once per submitted frame.
    pub fn advance(&mut self) {
        self.frame_index += 1;
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }
}
