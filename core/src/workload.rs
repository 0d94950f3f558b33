//! The three load shapes every task runs: CPU, allocation and contention.

use std::sync::Mutex;

use anyhow::{Result, anyhow};
use rand::RngCore;

/// Stride between touched bytes; one write per page forces it resident.
pub const PAGE_STRIDE: usize = 4096;

pub fn is_prime(x: u32) -> bool {
    if x <= 1 {
        return false;
    }
    if x % 2 == 0 {
        return x == 2;
    }
    let x = u64::from(x);
    let mut i = 3u64;
    while i * i <= x {
        if x % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Counts primes in `[2, limit]` by trial division.
///
/// The result must be consumed by the caller (see
/// [`RunCounters::absorb_primes`](crate::counters::RunCounters::absorb_primes)),
/// otherwise the optimizer is free to drop the whole loop.
pub fn cpu_burn(limit: u32) -> u32 {
    let mut count = 0;
    for n in 2..=limit {
        if is_prime(n) {
            count += 1;
        }
    }
    count
}

/// Allocates `size` bytes and writes one random byte per page.
///
/// Allocation goes through `try_reserve_exact`, so an impossible size shows up
/// as an error for the task rather than aborting the process.
pub fn allocate(size: usize, rng: &mut impl RngCore) -> Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|e| anyhow!("failed to allocate {size} byte payload: {e}"))?;
    buf.resize(size, 0);
    for i in (0..size).step_by(PAGE_STRIDE) {
        buf[i] = (rng.next_u32() & 0xff) as u8;
    }
    Ok(buf)
}

/// One exclusive lock around one counter: the harness's only contention point.
#[derive(Debug, Default)]
pub struct HotLock {
    counter: Mutex<u64>,
}

impl HotLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock and bumps the counter when `enabled`; no-op otherwise.
    pub fn contend(&self, enabled: bool) -> Result<()> {
        if !enabled {
            return Ok(());
        }
        let mut guard = self
            .counter
            .lock()
            .map_err(|_| anyhow!("hot lock poisoned"))?;
        *guard += 1;
        Ok(())
    }

    pub fn value(&self) -> u64 {
        match self.counter.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_primality_edges() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(!is_prime(9));
        assert!(is_prime(7919));
        assert!(!is_prime(7917));
    }

    #[test]
    fn test_prime_counts_match_known_values() {
        assert_eq!(cpu_burn(0), 0);
        assert_eq!(cpu_burn(1), 0);
        assert_eq!(cpu_burn(2), 1);
        assert_eq!(cpu_burn(10), 4);
        assert_eq!(cpu_burn(100), 25);
        assert_eq!(cpu_burn(20_000), 2_262);
    }

    #[test]
    fn test_allocate_touches_one_byte_per_page() {
        let mut rng = StdRng::seed_from_u64(7);
        let buf = allocate(3 * PAGE_STRIDE + 10, &mut rng).expect("allocation should succeed");
        assert_eq!(buf.len(), 3 * PAGE_STRIDE + 10);
        // untouched bytes stay zero
        for (idx, byte) in buf.iter().enumerate() {
            if idx % PAGE_STRIDE != 0 {
                assert_eq!(*byte, 0, "byte {idx} should not be touched");
            }
        }
    }

    #[test]
    fn test_allocate_zero_bytes_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let buf = allocate(0, &mut rng).expect("empty allocation");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_allocate_reports_impossible_sizes() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = allocate(usize::MAX, &mut rng).unwrap_err();
        assert!(err.to_string().contains("failed to allocate"));
    }

    #[test]
    fn test_contend_disabled_never_touches_counter() {
        let lock = HotLock::new();
        for _ in 0..10 {
            lock.contend(false).expect("no-op contend");
        }
        assert_eq!(lock.value(), 0);
    }

    #[test]
    fn test_contend_counts_every_acquisition_across_threads() {
        let lock = Arc::new(HotLock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..500 {
                        lock.contend(true).expect("contend");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("contender panicked");
        }
        assert_eq!(lock.value(), 4_000);
    }
}
