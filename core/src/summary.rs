use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::counters::CounterSnapshot;
use crate::probe::MemorySample;
use crate::sampler::LatencySummary;

/// Final figures for one run, collected after the pool has drained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub wall_clock_secs: f64,
    pub throughput: f64,
    pub latency_us: LatencySummary,
    pub dropped_samples: usize,
    /// `None` where the platform cannot report process CPU time.
    pub cpu_time_secs: Option<f64>,
    pub memory: MemorySample,
    pub locked_counter: u64,
    pub retained_objects: usize,
    pub retained_bytes: u64,
    pub inline_runs: u64,
    pub primes_found: u64,
    pub drained: bool,
}

/// `completed / wall`, or 0 for an empty wall-clock window.
pub fn throughput(completed: u64, wall: Duration) -> f64 {
    let secs = wall.as_secs_f64();
    if secs <= 0.0 { 0.0 } else { completed as f64 / secs }
}

impl RunSummary {
    pub fn from_counters(counters: CounterSnapshot, wall: Duration) -> Self {
        Self {
            submitted: counters.submitted,
            completed: counters.completed,
            failed: counters.failed,
            wall_clock_secs: wall.as_secs_f64(),
            throughput: throughput(counters.completed, wall),
            latency_us: LatencySummary::default(),
            dropped_samples: 0,
            cpu_time_secs: None,
            memory: MemorySample::default(),
            locked_counter: 0,
            retained_objects: 0,
            retained_bytes: 0,
            inline_runs: 0,
            primes_found: counters.primes,
            drained: true,
        }
    }

    /// Every submission was accounted as completed or failed.
    pub fn is_settled(&self) -> bool {
        self.submitted == self.completed + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(
            f,
            "submitted={} completed={} failed={}",
            self.submitted, self.completed, self.failed
        )?;
        writeln!(f, "throughput={:.0} ops/sec", self.throughput)?;
        writeln!(
            f,
            "latency_us p50={} p95={} p99={} max={}",
            self.latency_us.p50, self.latency_us.p95, self.latency_us.p99, self.latency_us.max
        )?;
        match self.cpu_time_secs {
            Some(secs) => writeln!(f, "cpu_time_total={secs:.2} sec (sum of threads)")?,
            None => writeln!(f, "cpu_time_total=n/a")?,
        }
        writeln!(
            f,
            "rss={}MB virtual={}MB system_total={}MB",
            self.memory.rss_mb(),
            self.memory.virtual_mb(),
            self.memory.system_total_mb()
        )?;
        writeln!(
            f,
            "lockedCounter={} retainedObjects={} retainedBytes={}",
            self.locked_counter, self.retained_objects, self.retained_bytes
        )?;
        writeln!(f, "inlineRuns={} drained={}", self.inline_runs, self.drained)?;
        write!(f, "Done.")
    }
}
