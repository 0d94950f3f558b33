use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::pool::{Dispatch, WorkerPool};
use crate::task::{self, TaskContext};

/// Tallies of one producer run, by dispatch result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub submitted: u64,
    pub queued: u64,
    pub ran_inline: u64,
    pub rejected: u64,
}

/// Submits one task per iteration until `deadline`.
///
/// There is no pacing: a full queue makes `submit` run the task on this
/// thread, which is the only thing slowing the loop down.
pub struct Producer {
    ctx: Arc<TaskContext>,
    deadline: Instant,
}

impl Producer {
    pub fn new(ctx: Arc<TaskContext>, deadline: Instant) -> Self {
        Self { ctx, deadline }
    }

    /// Runs the loop on the calling thread. Does not wait for submitted work.
    pub fn run(&self, pool: &WorkerPool) -> ProducerReport {
        info!(target: "strain::producer", "producer started");
        let mut report = ProducerReport::default();

        while Instant::now() < self.deadline {
            let seq = self.ctx.counters.next_submission();
            report.submitted += 1;
            match pool.submit(task::make_job(&self.ctx, seq)) {
                Dispatch::Queued => report.queued += 1,
                Dispatch::RanInline => report.ran_inline += 1,
                Dispatch::Rejected => {
                    report.rejected += 1;
                    self.ctx.counters.mark_failed();
                }
            }
        }

        debug!(
            target: "strain::producer",
            submitted = report.submitted,
            queued = report.queued,
            ran_inline = report.ran_inline,
            rejected = report.rejected,
            "producer reached deadline"
        );
        report
    }
}
