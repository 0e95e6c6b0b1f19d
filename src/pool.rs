use std::hash::Hasher;

use futures::future::join_all;
use snafu::Snafu;
use twox_hash::XxHash64;

use crate::{
    event::{JsonMetric, MetricKey, UdpMetric},
    worker::{Worker, WorkerHandle, WorkerSnapshot},
};

#[derive(Debug, Snafu)]
pub enum PoolError {
    #[snafu(display("A worker pool needs at least one worker"))]
    NoWorkers,

    #[snafu(display("Worker {} is no longer accepting samples", worker))]
    WorkerGone { worker: usize },
}

/// A fixed set of workers with samples sharded across them by metric identity.
///
/// Every sample of one identity lands on the same worker, so each identity has
/// exactly one accumulator per window.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    /// Spawns `num_workers` workers on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if `num_workers` is zero.
    pub fn spawn(num_workers: usize) -> Result<Self, PoolError> {
        if num_workers == 0 {
            return NoWorkersSnafu.fail();
        }

        let workers = (0..num_workers).map(Worker::spawn).collect();
        debug!(message = "Spawned workers.", count = num_workers);
        Ok(Self { workers })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// The id of the worker owning `key`.
    ///
    /// Stable across processes for the same number of workers.
    pub fn worker_for(&self, key: &MetricKey) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(key.name.as_bytes());
        hasher.write_u8(0);
        hasher.write(key.metric_type.as_bytes());
        for tag in &key.tags {
            hasher.write_u8(0);
            hasher.write(tag.as_bytes());
        }
        (hasher.finish() % self.workers.len() as u64) as usize
    }

    /// Queues a sample on the worker owning its identity.
    ///
    /// # Errors
    ///
    /// Fails if that worker's dispatch loop has exited.
    pub fn route(&self, metric: UdpMetric) -> Result<(), PoolError> {
        let worker = self.worker_for(metric.key());
        self.workers[worker]
            .send(metric)
            .map_err(|_| PoolError::WorkerGone { worker })
    }

    /// Merges a peer's state into the worker owning its identity.
    pub fn import(&self, metric: &JsonMetric) {
        let worker = self.worker_for(metric.key());
        self.workers[worker].worker().import_metric(metric);
    }

    /// Flushes every worker, in id order.
    pub fn flush(&self) -> Vec<WorkerSnapshot> {
        self.workers.iter().map(WorkerHandle::flush).collect()
    }

    /// Stops every worker and waits for all of their loops to exit.
    pub async fn stop(self) {
        join_all(self.workers.into_iter().map(WorkerHandle::stop)).await;
        debug!(message = "All workers stopped.");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use similar_asserts::assert_eq;

    use super::*;

    async fn wait_for_processed(pool: &WorkerPool, expected: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let processed: u64 = pool.workers.iter().map(|w| w.worker().processed()).sum();
                if processed >= expected {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("workers never caught up");
    }

    #[tokio::test]
    async fn spawn_requires_workers() {
        assert!(matches!(WorkerPool::spawn(0), Err(PoolError::NoWorkers)));

        let pool = WorkerPool::spawn(3).unwrap();
        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());
        pool.stop().await;
    }

    #[tokio::test]
    async fn routing_is_stable_and_ignores_tag_order() {
        let pool = WorkerPool::spawn(8).unwrap();
        let tags = ["b:2".to_owned(), "a:1".to_owned()];
        let reversed = [tags[1].clone(), tags[0].clone()];

        let first = pool.worker_for(&MetricKey::new("requests", "counter", &tags));
        let second = pool.worker_for(&MetricKey::new("requests", "counter", &reversed));
        assert_eq!(first, second);
        assert!(first < 8);

        pool.stop().await;
    }

    #[tokio::test]
    async fn one_identity_lands_on_one_worker() {
        let pool = WorkerPool::spawn(4).unwrap();
        for i in 0..40 {
            let name = format!("metric.{}", i % 5);
            pool.route(UdpMetric::new(name, "counter", 1.0)).unwrap();
        }
        wait_for_processed(&pool, 40).await;

        let snapshots = pool.flush();
        assert_eq!(snapshots.len(), 4);
        assert_eq!(snapshots.iter().map(|s| s.processed).sum::<u64>(), 40);

        for i in 0..5 {
            let key = MetricKey::new(&format!("metric.{i}"), "counter", &[]);
            let owners = snapshots
                .iter()
                .filter_map(|s| s.metrics.counters.get(&key))
                .collect::<Vec<_>>();
            assert_eq!(owners.len(), 1);
            assert_eq!(owners[0].value(), 8.0);
        }

        pool.stop().await;
    }

    #[tokio::test]
    async fn import_goes_to_owner() {
        let pool = WorkerPool::spawn(4).unwrap();
        let state = br#"{"values":["a","b"]}"#.to_vec();
        let metric = JsonMetric::new("users", "set", vec![], state);
        let owner = pool.worker_for(metric.key());
        pool.import(&metric);

        let snapshots = pool.flush();
        for (id, snapshot) in snapshots.iter().enumerate() {
            if id == owner {
                assert_eq!(snapshot.imported, 1);
                assert_eq!(snapshot.metrics.sets[metric.key()].len(), 2);
            } else {
                assert_eq!(snapshot, &WorkerSnapshot::default());
            }
        }

        pool.stop().await;
    }
}
