//! Frame and cache counters for the host.

use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to one `render` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Drawn and submitted.
    Presented,
    /// The surface had no texture to draw into.
    Dropped,
    /// Nothing changed since the last frame.
    Skipped,
}

/// Glyph cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub glyph_count: usize,
    pub atlas_usage: f32,
}

/// Snapshot of `FrameCounters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub dropped: u64,
    pub skipped: u64,
}

/// Running frame counters.
#[derive(Debug, Default)]
pub struct FrameCounters {
    presented: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
}

impl FrameCounters {
    #[inline]
    pub fn record(&self, outcome: FrameOutcome) {
        let counter = match outcome {
            FrameOutcome::Presented => &self.presented,
            FrameOutcome::Dropped => &self.dropped,
            FrameOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FrameStats {
        FrameStats {
            presented: self.presented.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        assert_eq!(FrameCounters::default().snapshot(), FrameStats::default());
    }

    #[test]
    fn test_record_each_outcome() {
        let counters = FrameCounters::default();
        counters.record(FrameOutcome::Presented);
        counters.record(FrameOutcome::Presented);
        counters.record(FrameOutcome::Dropped);
        counters.record(FrameOutcome::Skipped);
        assert_eq!(
            counters.snapshot(),
            FrameStats { presented: 2, dropped: 1, skipped: 1 }
        );
    }
}
