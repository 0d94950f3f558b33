use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use serde::Serialize;

pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_PAYLOAD_BYTES: usize = 64 * 1024;
pub const DEFAULT_RETAIN_EVERY: u64 = 200;
pub const DEFAULT_PRIME_LIMIT: u32 = 20_000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 50_000;
/// Hard cap on stored latency samples; later samples are dropped.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 2_000_000;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(10);
pub const DEFAULT_SEED: u64 = 42;

/// Largest accepted work queue; the channel preallocates every slot.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 24;
/// Largest accepted sampler; every slot is allocated up front.
pub const MAX_SAMPLE_CAPACITY: usize = 1 << 27;

/// Resolved run configuration. Built once before the run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessConfig {
    pub duration: Duration,
    pub workers: usize,
    pub payload_bytes: usize,
    /// Retain every Nth payload; `0` disables retention.
    pub retain_every: u64,
    pub prime_limit: u32,
    pub queue_capacity: usize,
    pub contention: bool,
    pub sample_capacity: usize,
    pub report_interval: Duration,
    pub drain_grace: Duration,
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            workers: default_workers(),
            payload_bytes: DEFAULT_PAYLOAD_BYTES,
            retain_every: DEFAULT_RETAIN_EVERY,
            prime_limit: DEFAULT_PRIME_LIMIT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            contention: true,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            report_interval: DEFAULT_REPORT_INTERVAL,
            drain_grace: DEFAULT_DRAIN_GRACE,
            seed: DEFAULT_SEED,
        }
    }
}

/// At least two workers, otherwise one per available core.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(2)
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("worker count must be at least 1");
        }
        if self.queue_capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            bail!(
                "queue capacity {} exceeds the maximum of {MAX_QUEUE_CAPACITY}",
                self.queue_capacity
            );
        }
        if self.sample_capacity == 0 {
            bail!("sample capacity must be at least 1");
        }
        if self.sample_capacity > MAX_SAMPLE_CAPACITY {
            bail!(
                "sample capacity {} exceeds the maximum of {MAX_SAMPLE_CAPACITY}",
                self.sample_capacity
            );
        }
        if self.report_interval.is_zero() {
            bail!("report interval must be greater than zero");
        }
        if Instant::now().checked_add(self.drain_timeout()).is_none() {
            bail!(
                "duration {}s plus drain grace {}s is too far in the future",
                self.duration.as_secs(),
                self.drain_grace.as_secs()
            );
        }
        Ok(())
    }

    /// Upper bound on how long shutdown waits for queued and in-flight tasks.
    pub fn drain_timeout(&self) -> Duration {
        self.duration.saturating_add(self.drain_grace)
    }

    pub fn payload_kb(&self) -> usize {
        self.payload_bytes / 1024
    }
}

impl fmt::Display for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "durationSec={} threads={} payloadKB={} retainEvery={} primeLimit={} queueCapacity={} contention={}",
            self.duration.as_secs(),
            self.workers,
            self.payload_kb(),
            self.retain_every,
            self.prime_limit,
            self.queue_capacity,
            self.contention
        )
    }
}
