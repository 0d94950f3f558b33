use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::trace;

use crate::config::HarnessConfig;
use crate::counters::RunCounters;
use crate::pool::Job;
use crate::retainer::Retainer;
use crate::sampler::LatencySampler;
use crate::workload::{self, HotLock};

/// Everything a task touches, shared by the producer and all workers.
#[derive(Debug)]
pub struct TaskContext {
    pub config: HarnessConfig,
    pub counters: Arc<RunCounters>,
    pub sampler: LatencySampler,
    pub retainer: Retainer,
    pub hot_lock: HotLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
}

impl TaskContext {
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_counters(config, Arc::new(RunCounters::new()))
    }

    /// Shares externally owned counters with the workers.
    pub fn with_counters(config: HarnessConfig, counters: Arc<RunCounters>) -> Self {
        let sampler = LatencySampler::with_capacity(config.sample_capacity);
        Self {
            config,
            counters,
            sampler,
            retainer: Retainer::new(),
            hot_lock: HotLock::new(),
        }
    }

    /// Runs one work unit: CPU burn, then allocation and retention, then
    /// contention. Errors and panics count as failures; latency is recorded
    /// either way.
    pub fn execute(&self, seq: u64) -> TaskOutcome {
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_steps(seq)))
            .unwrap_or_else(|payload| Err(anyhow!("task panicked: {}", panic_message(&*payload))));

        let outcome = match result {
            Ok(()) => {
                self.counters.mark_completed();
                TaskOutcome::Completed
            }
            Err(err) => {
                trace!(target: "strain::task", seq, error = %err, "task failed");
                self.counters.mark_failed();
                TaskOutcome::Failed
            }
        };
        self.sampler.record_micros(started.elapsed().as_micros() as u64);
        outcome
    }

    fn run_steps(&self, seq: u64) -> Result<()> {
        let primes = workload::cpu_burn(self.config.prime_limit);
        self.counters.absorb_primes(primes);

        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(seq));
        let buffer = workload::allocate(self.config.payload_bytes, &mut rng)?;
        self.retainer.maybe_retain(buffer, seq, self.config.retain_every);

        self.hot_lock.contend(self.config.contention)
    }
}

/// Builds the boxed job the pool runs for sequence number `seq`.
pub fn make_job(ctx: &Arc<TaskContext>, seq: u64) -> Job {
    let ctx = Arc::clone(ctx);
    Box::new(move || {
        ctx.execute(seq);
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
