use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters shared by the producer, the workers and the reporter.
///
/// Every field only ever grows. Readers take independent loads, so a snapshot
/// taken while the run is live is not a consistent cut; it only guarantees
/// `submitted` was read last and is therefore never behind the other two.
#[derive(Debug, Default)]
pub struct RunCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    /// Sum of every task's prime count. Keeps the CPU burn observable.
    prime_sink: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub primes: u64,
}

impl CounterSnapshot {
    pub fn settled(&self) -> u64 {
        self.completed + self.failed
    }
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new value, which doubles as the task's sequence number.
    pub fn next_submission(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn mark_completed(&self) {
        self.completed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn mark_failed(&self) {
        self.failed.fetch_add(1, Ordering::AcqRel);
    }

    pub fn absorb_primes(&self, count: u32) {
        self.prime_sink.fetch_add(u64::from(count), Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let completed = self.completed();
        let failed = self.failed();
        let primes = self.prime_sink.load(Ordering::Relaxed);
        CounterSnapshot {
            submitted: self.submitted(),
            completed,
            failed,
            primes,
        }
    }
}
