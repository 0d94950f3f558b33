//! Wires the configuration into the pool, producer and reporter, and drains
//! everything into a [`RunSummary`].

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::counters::RunCounters;
use crate::pool::WorkerPool;
use crate::probe::{self, ProcessProbe};
use crate::producer::{Producer, ProducerReport};
use crate::reporter::{ProgressSink, Reporter};
use crate::summary::RunSummary;
use crate::task::TaskContext;

#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    /// Validates `config`; nothing is spawned until [`Harness::run`].
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate().context("invalid harness configuration")?;
        Ok(Self { config })
    }

    /// Startup banner: title, resolved configuration and process id.
    pub fn banner(&self) -> String {
        format!("=== strain ===\n{}\npid={}", self.config, std::process::id())
    }

    /// Runs the load until the deadline, drains the pool and summarizes.
    ///
    /// Blocks the calling thread for roughly `duration`, plus however long the
    /// drain takes (bounded by `duration + drain_grace`).
    pub fn run(&self, sink: Box<dyn ProgressSink>) -> Result<RunSummary> {
        let counters = Arc::new(RunCounters::new());
        let ctx = Arc::new(TaskContext::with_counters(
            self.config.clone(),
            Arc::clone(&counters),
        ));
        let mut pool = WorkerPool::new(self.config.workers, self.config.queue_capacity)?;

        let started = Instant::now();
        let deadline = started
            .checked_add(self.config.duration)
            .ok_or_else(|| anyhow!("run duration {:?} is out of range", self.config.duration))?;
        info!(target: "strain::harness", config = %self.config, "run started");

        let reporter = Reporter::new(
            Arc::clone(&counters),
            pool.probe(),
            self.config.report_interval,
            started,
            deadline,
        )
        .spawn(sink)?;

        let producer = Producer::new(Arc::clone(&ctx), deadline);
        let report = thread::scope(|scope| -> Result<ProducerReport> {
            let handle = thread::Builder::new()
                .name("producer".to_string())
                .spawn_scoped(scope, || producer.run(&pool))
                .context("failed to spawn producer thread")?;
            handle
                .join()
                .map_err(|_| anyhow!("producer thread panicked"))
        })?;
        reporter.stop();

        let drain = pool.shutdown(self.config.drain_timeout());
        if !drain.drained {
            warn!(
                target: "strain::harness",
                stranded = drain.stranded_workers,
                "summary covers a partially drained pool"
            );
        }
        let wall = started.elapsed();

        let mut summary = RunSummary::from_counters(counters.snapshot(), wall);
        summary.latency_us = ctx.sampler.summary();
        summary.dropped_samples = ctx.sampler.dropped();
        summary.cpu_time_secs = probe::process_cpu_time().map(|d| d.as_secs_f64());
        summary.memory = ProcessProbe::new().memory();
        summary.locked_counter = ctx.hot_lock.value();
        summary.retained_objects = ctx.retainer.len();
        summary.retained_bytes = ctx.retainer.retained_bytes();
        summary.inline_runs = pool.inline_runs();
        summary.drained = drain.drained;

        info!(
            target: "strain::harness",
            submitted = summary.submitted,
            completed = summary.completed,
            failed = summary.failed,
            ran_inline = report.ran_inline,
            wall_ms = wall.as_millis() as u64,
            "run finished"
        );
        Ok(summary)
    }
}
