#[cfg(test)]
mod tests {
    use crate::pool::{Dispatch, WorkerPool};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_queued_jobs_all_run_before_drain_completes() {
        let mut pool = WorkerPool::new(4, 64).expect("pool");
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..200 {
            let ran = Arc::clone(&ran);
            let dispatch = pool.submit(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
            assert_ne!(dispatch, Dispatch::Rejected);
        }
        let outcome = pool.shutdown(Duration::from_secs(10));
        assert!(outcome.drained);
        assert_eq!(outcome.stranded_workers, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 200);
        assert_eq!(pool.queue_depth(), 0);
    }

    #[test]
    fn test_full_queue_runs_job_on_caller_thread() {
        let mut pool = WorkerPool::new(1, 1).expect("pool");
        let gate = Arc::new(Barrier::new(2));

        // occupy the only worker until the test releases it
        {
            let gate = Arc::clone(&gate);
            pool.submit(Box::new(move || {
                gate.wait();
            }));
        }
        // wait for the worker to dequeue the blocker, then fill the single slot
        while pool.queue_depth() != 0 {
            thread::yield_now();
        }
        assert_eq!(pool.submit(Box::new(|| {})), Dispatch::Queued);

        let caller = thread::current().id();
        let ran_on = Arc::new(Mutex::new(None));
        let dispatch = {
            let ran_on = Arc::clone(&ran_on);
            pool.submit(Box::new(move || {
                *ran_on.lock().expect("ran_on lock") = Some(thread::current().id());
            }))
        };
        assert_eq!(dispatch, Dispatch::RanInline);
        assert_eq!(*ran_on.lock().expect("ran_on lock"), Some(caller));
        assert_eq!(pool.inline_runs(), 1);

        gate.wait();
        assert!(pool.shutdown(Duration::from_secs(5)).drained);
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let mut pool = WorkerPool::new(2, 8).expect("pool");
        assert!(pool.shutdown(Duration::from_secs(1)).drained);
        assert!(!pool.is_accepting());

        let ran = Arc::new(AtomicUsize::new(0));
        let job_ran = Arc::clone(&ran);
        let dispatch = pool.submit(Box::new(move || {
            job_ran.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(dispatch, Dispatch::Rejected);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let mut pool = WorkerPool::new(1, 16).expect("pool");
        pool.submit(Box::new(|| panic!("boom")));
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let ran = Arc::clone(&ran);
            pool.submit(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert!(pool.shutdown(Duration::from_secs(5)).drained);
        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_drain_timeout_leaves_stuck_worker_detached() {
        let mut pool = WorkerPool::new(2, 4).expect("pool");
        let release = Arc::new(Barrier::new(2));
        {
            let release = Arc::clone(&release);
            pool.submit(Box::new(move || {
                release.wait();
            }));
        }
        let outcome = pool.shutdown(Duration::from_millis(50));
        assert!(!outcome.drained);
        assert_eq!(outcome.stranded_workers, 1);
        release.wait();
    }

    #[test]
    fn test_workers_carry_indexed_names() {
        let mut pool = WorkerPool::new(3, 8).expect("pool");
        assert_eq!(pool.worker_count(), 3);
        let names = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let names = Arc::clone(&names);
            pool.submit(Box::new(move || {
                let name = thread::current().name().unwrap_or_default().to_string();
                names.lock().expect("names lock").push(name);
            }));
        }
        pool.shutdown(Duration::from_secs(5));
        let names = names.lock().expect("names lock");
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| n.starts_with("worker-")));
    }

    #[test]
    fn test_oversized_queue_is_an_error() {
        let err = WorkerPool::new(1, usize::MAX / 2).err().expect("capacity should be rejected");
        assert!(err.to_string().contains("queue capacity"));
    }

    #[test]
    fn test_unrepresentable_timeout_still_drains() {
        let mut pool = WorkerPool::new(2, 8).expect("pool");
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let ran = Arc::clone(&ran);
            pool.submit(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let outcome = pool.shutdown(Duration::MAX);
        assert!(outcome.drained);
        assert_eq!(ran.load(Ordering::SeqCst), 8);
    }
}
