//! Periodic progress reporting while the run is live.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use tracing::debug;

use crate::counters::RunCounters;
use crate::pool::QueueProbe;
use crate::probe::ProcessProbe;

/// One progress line: `t=5.0s rps=1234 completed=6170 queue=12 rss=220MB`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressLine {
    pub elapsed: Duration,
    pub rate: f64,
    pub completed: u64,
    pub queue_depth: usize,
    pub rss_mb: u64,
}

impl fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:.1}s rps={:.0} completed={} queue={} rss={}MB",
            self.elapsed.as_secs_f64(),
            self.rate,
            self.completed,
            self.queue_depth,
            self.rss_mb
        )
    }
}

/// Destination for progress lines.
pub trait ProgressSink: Send {
    fn emit(&mut self, line: &ProgressLine);
}

/// Prints each line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&mut self, line: &ProgressLine) {
        println!("{line}");
    }
}

/// Rate over the window since the previous tick.
pub fn window_rate(delta_completed: u64, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs <= 0.0 { 0.0 } else { delta_completed as f64 / secs }
}

pub struct Reporter {
    counters: Arc<RunCounters>,
    queue: QueueProbe,
    interval: Duration,
    started: Instant,
    deadline: Instant,
}

/// Handle to a running reporter thread. Dropping it stops the thread.
pub struct ReporterHandle {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReporterHandle {
    /// Wakes the reporter and waits for it to exit; it never prints after this.
    pub fn stop(mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.stop.take();
    }
}

impl Reporter {
    pub fn new(
        counters: Arc<RunCounters>,
        queue: QueueProbe,
        interval: Duration,
        started: Instant,
        deadline: Instant,
    ) -> Self {
        Self {
            counters,
            queue,
            interval,
            started,
            deadline,
        }
    }

    pub fn spawn(self, sink: Box<dyn ProgressSink>) -> Result<ReporterHandle> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("reporter".to_string())
            .spawn(move || self.run(sink, stop_rx))
            .context("failed to spawn reporter thread")?;
        Ok(ReporterHandle {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    fn run(self, mut sink: Box<dyn ProgressSink>, stop: channel::Receiver<()>) {
        let mut probe = ProcessProbe::new();
        let mut last_tick = Instant::now();
        let mut last_completed = 0u64;

        while Instant::now() < self.deadline {
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            let now = Instant::now();
            let completed = self.counters.completed();
            let line = ProgressLine {
                elapsed: now.duration_since(self.started),
                rate: window_rate(completed - last_completed, now.duration_since(last_tick)),
                completed,
                queue_depth: self.queue.depth(),
                rss_mb: probe.memory().rss_mb(),
            };
            debug!(target: "strain::reporter", completed, rate = line.rate, "progress tick");
            sink.emit(&line);

            last_tick = now;
            last_completed = completed;
        }
    }
}
