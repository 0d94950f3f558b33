//! Fixed worker pool in front of a bounded queue with caller-runs backpressure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::config::MAX_QUEUE_CAPACITY;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// What happened to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the queue; a worker will run it.
    Queued,
    /// The queue was full, so the job already ran on the submitting thread.
    RanInline,
    /// The pool no longer accepts work; the job was dropped unrun.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Every worker exited before the timeout.
    pub drained: bool,
    /// Workers still running when the timeout elapsed; left detached.
    pub stranded_workers: usize,
}

/// Read-only view of queue depth that does not keep the queue open.
#[derive(Clone)]
pub struct QueueProbe {
    rx: Receiver<Job>,
}

impl QueueProbe {
    pub fn depth(&self) -> usize {
        self.rx.len()
    }
}

struct Worker {
    index: usize,
    handle: JoinHandle<()>,
}

pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    probe: QueueProbe,
    workers: Vec<Worker>,
    exited_rx: Receiver<usize>,
    inline_runs: Arc<AtomicU64>,
}

impl WorkerPool {
    /// Spawns `workers` named threads consuming a queue of `capacity` jobs.
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        ensure!(
            capacity <= MAX_QUEUE_CAPACITY,
            "queue capacity {capacity} exceeds the maximum of {MAX_QUEUE_CAPACITY}"
        );
        let (tx, rx) = channel::bounded::<Job>(capacity);
        let (exited_tx, exited_rx) = channel::unbounded::<usize>();

        let mut spawned = Vec::with_capacity(workers);
        for index in 0..workers {
            let rx = rx.clone();
            let exited_tx = exited_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn(move || {
                    worker_loop(index, rx);
                    let _ = exited_tx.send(index);
                })
                .with_context(|| format!("failed to spawn worker-{index}"))?;
            spawned.push(Worker { index, handle });
        }
        debug!(target: "strain::pool", workers, capacity, "worker pool started");

        Ok(Self {
            tx: Some(tx),
            probe: QueueProbe { rx },
            workers: spawned,
            exited_rx,
            inline_runs: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn queue_depth(&self) -> usize {
        self.probe.depth()
    }

    pub fn probe(&self) -> QueueProbe {
        self.probe.clone()
    }

    /// Jobs that ran on the submitting thread because the queue was full.
    pub fn inline_runs(&self) -> u64 {
        self.inline_runs.load(Ordering::Relaxed)
    }

    pub fn is_accepting(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueues `job`, or runs it right here when the queue is full.
    pub fn submit(&self, job: Job) -> Dispatch {
        let Some(tx) = self.tx.as_ref() else {
            return Dispatch::Rejected;
        };
        match tx.try_send(job) {
            Ok(()) => Dispatch::Queued,
            Err(TrySendError::Full(job)) => {
                self.inline_runs.fetch_add(1, Ordering::Relaxed);
                run_guarded(job);
                Dispatch::RanInline
            }
            // receiver side closed; nothing will ever drain the queue
            Err(TrySendError::Disconnected(_)) => Dispatch::Rejected,
        }
    }

    /// Stops accepting work and waits up to `timeout` for queued and in-flight
    /// jobs to finish. Workers that finish in time are joined.
    pub fn shutdown(&mut self, timeout: Duration) -> DrainOutcome {
        if self.tx.take().is_none() && self.workers.is_empty() {
            return DrainOutcome {
                drained: true,
                stranded_workers: 0,
            };
        }
        debug!(target: "strain::pool", queued = self.queue_depth(), "worker pool shutting down");

        // A timeout too large to express as an Instant waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut finished = Vec::with_capacity(self.workers.len());
        while finished.len() < self.workers.len() {
            let exited = match deadline {
                Some(deadline) => self.exited_rx.recv_deadline(deadline).ok(),
                None => self.exited_rx.recv().ok(),
            };
            match exited {
                Some(index) => finished.push(index),
                None => break,
            }
        }

        let workers = std::mem::take(&mut self.workers);
        let mut stranded = 0;
        for worker in workers {
            if finished.contains(&worker.index) {
                if worker.handle.join().is_err() {
                    warn!(target: "strain::pool", worker = worker.index, "worker thread panicked");
                }
            } else {
                stranded += 1;
            }
        }

        if stranded > 0 {
            warn!(
                target: "strain::pool",
                stranded,
                timeout_ms = timeout.as_millis() as u64,
                "drain timed out; leaving workers detached"
            );
        }
        DrainOutcome {
            drained: stranded == 0,
            stranded_workers: stranded,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Close the queue so detached workers exit once it runs dry.
        self.tx.take();
    }
}

fn worker_loop(index: usize, rx: Receiver<Job>) {
    for job in rx.iter() {
        run_guarded(job);
    }
    debug!(target: "strain::pool", worker = index, "worker exiting");
}

/// Runs a job, keeping a panic from unwinding into the worker loop.
fn run_guarded(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!(target: "strain::pool", "job panicked outside task accounting");
    }
}
