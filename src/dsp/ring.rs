//! Fixed-Capacity Delay Ring
//!
//! Circular buffer whose positions are [`RingIndex`] values. An index can
//! only be produced by its ring, already reduced modulo the ring length,
//! so callers never do wraparound arithmetic themselves.

use heapless::Vec;

/// Position inside a [`DelayRing`], always `< ring.len()`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingIndex(usize);

impl RingIndex {
    /// Raw slot number
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Delay line with a runtime length of at most `N` slots
#[derive(Clone, Debug)]
pub struct DelayRing<T: Copy + Default, const N: usize> {
    slots: Vec<T, N>,
}

impl<T: Copy + Default, const N: usize> DelayRing<T, N> {
    /// Create a ring of `len` default slots; `len` is clamped to `1..=N`
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::new();
        // Clamped to capacity, cannot fail
        let _ = slots.resize(len.clamp(1, N), T::default());
        Self { slots }
    }

    /// Number of slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a ring has at least one slot
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Index for an arbitrary position (reduced modulo the length)
    #[must_use]
    pub fn index(&self, position: usize) -> RingIndex {
        RingIndex(position % self.len())
    }

    /// The slot after `index`
    #[must_use]
    pub fn next(&self, index: RingIndex) -> RingIndex {
        let n = index.0 + 1;
        RingIndex(if n >= self.len() { 0 } else { n })
    }

    /// The slot `distance` positions after `index`
    #[must_use]
    pub fn offset(&self, index: RingIndex, distance: usize) -> RingIndex {
        self.index(index.0 + distance % self.len())
    }

    /// Read a slot
    #[must_use]
    pub fn get(&self, index: RingIndex) -> T {
        self.slots.get(index.0).copied().unwrap_or_default()
    }

    /// Write a slot
    pub fn set(&mut self, index: RingIndex, value: T) {
        if let Some(slot) = self.slots.get_mut(index.0) {
            *slot = value;
        }
    }

    /// `count` slots starting after `start`, in ring order
    pub fn window(&self, start: RingIndex, count: usize) -> impl Iterator<Item = T> + '_ {
        let mut index = start;
        (0..count).map(move |_| {
            index = self.next(index);
            self.get(index)
        })
    }
}
