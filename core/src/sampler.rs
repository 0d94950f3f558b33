//! Fixed-capacity latency store shared by every worker.
//!
//! Writers reserve a slot with one `fetch_add` on the cursor and then own that
//! slot exclusively, so recording never blocks and never collides. Once the
//! cursor passes capacity, new samples are dropped rather than overwriting old
//! ones: the sampler is a cap, not a ring.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Marker for a slot that has been reserved but not yet published.
const UNWRITTEN: u64 = u64::MAX;

#[derive(Debug)]
pub struct LatencySampler {
    slots: Box<[AtomicU64]>,
    cursor: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

impl LatencySampler {
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| AtomicU64::new(UNWRITTEN)).collect();
        Self {
            slots,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Records one latency in microseconds. Returns `false` when the sample was
    /// dropped because the store is full.
    pub fn record_micros(&self, us: u64) -> bool {
        let idx = self.cursor.fetch_add(1, Ordering::AcqRel);
        match self.slots.get(idx) {
            Some(slot) => {
                slot.store(us.min(UNWRITTEN - 1), Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Number of stored samples: `min(cursor, capacity)`.
    pub fn count(&self) -> usize {
        self.cursor.load(Ordering::Acquire).min(self.slots.len())
    }

    /// Number of samples offered past capacity and dropped.
    pub fn dropped(&self) -> usize {
        self.cursor
            .load(Ordering::Acquire)
            .saturating_sub(self.slots.len())
    }

    /// Copies the published prefix and sorts it ascending.
    ///
    /// Slots reserved by a writer that has not stored yet are skipped, so a
    /// snapshot taken mid-run is best-effort but never sees a bogus value.
    pub fn sorted_snapshot(&self) -> Vec<u64> {
        let n = self.count();
        let mut copy: Vec<u64> = self.slots[..n]
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .filter(|&v| v != UNWRITTEN)
            .collect();
        copy.sort_unstable();
        copy
    }

    /// Nearest-rank percentile: index `ceil(p * n) - 1`, clamped to `[0, n-1]`.
    /// Returns 0 when nothing has been recorded.
    pub fn percentile(&self, p: f64) -> u64 {
        percentile_of_sorted(&self.sorted_snapshot(), p)
    }

    /// p50/p95/p99/max from a single snapshot.
    pub fn summary(&self) -> LatencySummary {
        let sorted = self.sorted_snapshot();
        LatencySummary {
            count: sorted.len(),
            p50: percentile_of_sorted(&sorted, 0.50),
            p95: percentile_of_sorted(&sorted, 0.95),
            p99: percentile_of_sorted(&sorted, 0.99),
            max: sorted.last().copied().unwrap_or(0),
        }
    }
}

pub fn percentile_of_sorted(sorted: &[u64], p: f64) -> u64 {
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    let rank = (p * n as f64).ceil() as i64 - 1;
    let idx = rank.clamp(0, n as i64 - 1) as usize;
    sorted[idx]
}
