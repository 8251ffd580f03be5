//! PTT Edge Latch
//!
//! Hand-off from the PTT pin interrupt to the main loop. The interrupt
//! records debounced edges; the main loop takes the pending flag and reads
//! the pin level itself. Only the main loop ever clears pending.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::PTT_DEBOUNCE_MS;

/// Debounced edge flag shared between one interrupt and the main loop
#[derive(Debug)]
pub struct EdgeLatch {
    last_edge_ms: AtomicU32,
    has_edge: AtomicBool,
    pending: AtomicBool,
    debounce_ms: u32,
}

impl EdgeLatch {
    /// Create a latch; the first edge is always accepted
    #[must_use]
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            last_edge_ms: AtomicU32::new(0),
            has_edge: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            debounce_ms,
        }
    }

    /// Interrupt side: record an edge seen at `now_ms`
    ///
    /// Edges closer than the debounce interval to the last accepted one
    /// are ignored. Returns true if the edge was accepted. The millisecond
    /// clock may wrap.
    pub fn record_edge(&self, now_ms: u32) -> bool {
        if self.has_edge.load(Ordering::Acquire) {
            let last = self.last_edge_ms.load(Ordering::Acquire);
            if now_ms.wrapping_sub(last) < self.debounce_ms {
                return false;
            }
        }
        self.last_edge_ms.store(now_ms, Ordering::Release);
        self.has_edge.store(true, Ordering::Release);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Main-loop side: consume the pending edge, if any
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Check for a pending edge without consuming it
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Timestamp of the last accepted edge
    #[must_use]
    pub fn last_edge_ms(&self) -> u32 {
        self.last_edge_ms.load(Ordering::Acquire)
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new(PTT_DEBOUNCE_MS)
    }
}
