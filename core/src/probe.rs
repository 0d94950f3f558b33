//! Process-level introspection: memory from `sysinfo`, CPU time from `getrusage`.

use std::time::Duration;

use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySample {
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub system_total_bytes: u64,
}

pub const MIB: u64 = 1024 * 1024;

impl MemorySample {
    pub fn rss_mb(&self) -> u64 {
        self.rss_bytes / MIB
    }

    pub fn virtual_mb(&self) -> u64 {
        self.virtual_bytes / MIB
    }

    pub fn system_total_mb(&self) -> u64 {
        self.system_total_bytes / MIB
    }
}

/// Reads memory figures for the current process. Missing data reads as zero.
pub struct ProcessProbe {
    system: System,
    pid: Option<Pid>,
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    pub fn memory(&mut self) -> MemorySample {
        self.system.refresh_memory();
        let mut sample = MemorySample {
            system_total_bytes: self.system.total_memory(),
            ..MemorySample::default()
        };
        let Some(pid) = self.pid else {
            return sample;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        if let Some(process) = self.system.process(pid) {
            sample.rss_bytes = process.memory();
            sample.virtual_bytes = process.virtual_memory();
        }
        sample
    }
}

/// User plus system CPU time summed over every thread of this process.
#[cfg(unix)]
pub fn process_cpu_time() -> Option<Duration> {
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: getrusage only writes into the struct we own.
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if ret != 0 {
        return None;
    }
    Some(timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
pub fn process_cpu_time() -> Option<Duration> {
    None
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}
