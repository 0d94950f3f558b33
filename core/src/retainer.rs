use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::SegQueue;

/// Append-only store of buffers kept alive for the whole run to simulate
/// long-lived memory pressure.
///
/// Appends go through a lock-free `SegQueue`, so concurrent workers never lose
/// or duplicate an entry. Nothing is ever popped.
#[derive(Debug, Default)]
pub struct Retainer {
    kept: SegQueue<Vec<u8>>,
    bytes: AtomicU64,
}

/// Whether sequence number `seq` falls on the retention stride.
pub fn should_retain(seq: u64, every: u64) -> bool {
    every > 0 && seq % every == 0
}

impl Retainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `buffer` when `seq` is a multiple of `every`, otherwise drops it.
    /// Returns whether the buffer was kept.
    pub fn maybe_retain(&self, buffer: Vec<u8>, seq: u64, every: u64) -> bool {
        if !should_retain(seq, every) {
            return false;
        }
        self.bytes.fetch_add(buffer.len() as u64, Ordering::Relaxed);
        self.kept.push(buffer);
        true
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn retained_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Number of sequence numbers in `1..=submitted` that land on the stride.
pub fn expected_retained(submitted: u64, every: u64) -> u64 {
    if every == 0 { 0 } else { submitted / every }
}
