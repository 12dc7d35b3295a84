//! Bounded worker pool for artifact jobs.
//!
//! Each job carries its own fingerprint table snapshot; workers share nothing
//! mutable. Replies come back over a channel in completion order, and
//! [`WorkerPool::run`] returns only after every job of the batch replied.

use super::artifact::{self, Reply};
use crate::app::Site;
use crate::fingerprint::FingerprintTable;
use anyhow::{Context, Result};
use crossbeam::channel;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// One cached pathname of one route.
#[derive(Debug, Clone)]
pub struct Job {
    pub route_index: usize,
    pub pathname: String,
    pub urls: Arc<FingerprintTable>,
}

pub struct WorkerPool {
    /// `None` runs jobs inline on the calling thread.
    pool: Option<rayon::ThreadPool>,
    size: usize,
}

impl WorkerPool {
    /// `workers = 0` sizes the pool to the available parallelism.
    pub fn new(workers: usize) -> Result<Self> {
        let size = match workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            n => n,
        };

        let pool = if size == 1 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(size)
                .thread_name(|i| format!("hallmark-build-{i}"))
                .build()
                .context("failed to create build worker pool")?;
            Some(pool)
        };

        Ok(Self { pool, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run a batch of jobs, handing each reply to `on_reply` on the calling thread.
    pub fn run(&self, site: &Arc<Site>, jobs: Vec<Job>, mut on_reply: impl FnMut(Reply)) {
        let Some(pool) = &self.pool else {
            for job in &jobs {
                on_reply(execute(site, job));
            }
            return;
        };

        let (tx, rx) = channel::unbounded::<Reply>();
        for job in jobs {
            let tx = tx.clone();
            let site = Arc::clone(site);
            pool.spawn(move || {
                let _ = tx.send(execute(&site, &job));
            });
        }
        drop(tx);

        for reply in rx {
            on_reply(reply);
        }
    }
}

/// Process one job; errors and panics become [`Reply::Failed`].
fn execute(site: &Site, job: &Job) -> Reply {
    let result = catch_unwind(AssertUnwindSafe(|| artifact::process(site, job)))
        .unwrap_or_else(|_| Err(anyhow::anyhow!("handler panicked")));

    result.unwrap_or_else(|e| Reply::Failed {
        pathname: job.pathname.clone(),
        error: format!("{e:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size() {
        assert_eq!(WorkerPool::new(1).unwrap().size(), 1);
        assert!(WorkerPool::new(1).unwrap().pool.is_none());
        assert_eq!(WorkerPool::new(3).unwrap().size(), 3);
        assert!(WorkerPool::new(0).unwrap().size() >= 1);
    }
}
