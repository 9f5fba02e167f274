// Tue Jan 13 2026 - Alex

use crate::config::DiscoveryConfig;
use crate::utils::deadline_passed;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheduled<R> {
    Completed(R),
    /// Not started because the deadline had passed.
    Skipped,
}

impl<R> Scheduled<R> {
    pub fn completed(self) -> Option<R> {
        match self {
            Scheduled::Completed(value) => Some(value),
            Scheduled::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Scheduled::Skipped)
    }
}

/// Fans work out over a bounded rayon pool, or runs it inline when the batch is
/// small or parallelism is off. Results keep input order either way.
pub struct ScanScheduler {
    pool: Option<ThreadPool>,
}

impl ScanScheduler {
    pub fn new(config: &DiscoveryConfig) -> Self {
        if !config.enable_parallel || config.max_parallelism <= 1 {
            return Self::sequential();
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.max_parallelism)
            .thread_name(|i| format!("discovery-{}", i))
            .build();

        match pool {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                log::warn!("Falling back to sequential scanning: {}", e);
                Self::sequential()
            }
        }
    }

    pub fn sequential() -> Self {
        Self { pool: None }
    }

    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(1, ThreadPool::current_num_threads)
    }

    pub fn is_parallel_for(&self, items: usize, config: &DiscoveryConfig) -> bool {
        self.pool.is_some() && config.enable_parallel && items > config.parallel_threshold
    }

    /// Applies `f` to every item. Items not started before `deadline` come back
    /// as `Skipped`.
    pub fn run<T, R, F>(&self, items: &[T], config: &DiscoveryConfig, deadline: Option<Instant>, f: F) -> Vec<Scheduled<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let step = |item: &T| {
            if deadline_passed(deadline) {
                Scheduled::Skipped
            } else {
                Scheduled::Completed(f(item))
            }
        };

        match &self.pool {
            Some(pool) if self.is_parallel_for(items.len(), config) => {
                pool.install(|| items.par_iter().map(step).collect())
            }
            _ => items.iter().map(step).collect(),
        }
    }

    /// Runs `op` inside the pool so nested rayon work stays within its bound.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn test_small_batches_run_inline() {
        let config = DiscoveryConfig::default().with_max_parallelism(4).with_parallel_threshold(8);
        let scheduler = ScanScheduler::new(&config);
        let caller = thread::current().id();

        let results = scheduler.run(&[1, 2, 3], &config, None, |_| thread::current().id());
        assert!(results.into_iter().all(|r| r.completed() == Some(caller)));
    }

    #[test]
    fn test_parallel_keeps_order_and_bound() {
        let config = DiscoveryConfig::default().with_max_parallelism(2).with_parallel_threshold(1);
        let scheduler = ScanScheduler::new(&config);
        assert_eq!(scheduler.worker_count(), 2);

        let threads = Mutex::new(HashSet::new());
        let items: Vec<u32> = (0..64).collect();
        let results = scheduler.run(&items, &config, None, |i| {
            threads.lock().unwrap().insert(thread::current().id());
            i * 2
        });

        let doubled: Vec<u32> = results.into_iter().filter_map(Scheduled::completed).collect();
        assert_eq!(doubled, items.iter().map(|i| i * 2).collect::<Vec<_>>());
        assert!(threads.lock().unwrap().len() <= 2);
    }

    #[test]
    fn test_disabled_parallelism() {
        let config = DiscoveryConfig::default().with_parallel(false);
        let scheduler = ScanScheduler::new(&config);
        assert_eq!(scheduler.worker_count(), 1);
        assert!(!scheduler.is_parallel_for(1000, &config));
    }

    #[test]
    fn test_expired_deadline_skips_everything() {
        let config = DiscoveryConfig::default();
        let scheduler = ScanScheduler::new(&config);
        let results = scheduler.run(&[1, 2, 3], &config, Some(Instant::now()), |i| *i);
        assert!(results.iter().all(Scheduled::is_skipped));
    }
}
