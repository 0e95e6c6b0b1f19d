//! Periodic flushing of a worker pool into a downstream reporter.

use std::{sync::Arc, time::Duration};

use stream_cancel::Tripwire;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    aggregate::Histo,
    event::MetricKey,
    internal_events::ReportError,
    pool::WorkerPool,
    worker::WorkerSnapshot,
};

/// Receives the snapshots of every flush.
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, snapshots: Vec<WorkerSnapshot>) -> crate::Result<()>;
}

/// Writes flushed aggregates to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

fn log_histo(kind: &'static str, key: &MetricKey, histo: &Histo) {
    debug!(
        message = "Flushed distribution.",
        kind,
        metric = %key,
        count = histo.count(),
        sum = histo.sum(),
        min = histo.min(),
        max = histo.max(),
        median = histo.quantile(0.5),
    );
}

#[async_trait::async_trait]
impl Reporter for LogReporter {
    async fn report(&self, snapshots: Vec<WorkerSnapshot>) -> crate::Result<()> {
        let mut identities = 0;
        let mut processed = 0;
        let mut imported = 0;

        for snapshot in &snapshots {
            let metrics = &snapshot.metrics;
            for (key, counter) in &metrics.counters {
                debug!(message = "Flushed counter.", metric = %key, value = counter.value());
            }
            for (key, gauge) in &metrics.gauges {
                debug!(message = "Flushed gauge.", metric = %key, value = gauge.value());
            }
            for (key, histo) in &metrics.histograms {
                log_histo("histogram", key, histo);
            }
            for (key, timer) in &metrics.timers {
                log_histo("timer", key, timer);
            }
            for (key, set) in &metrics.sets {
                debug!(message = "Flushed set.", metric = %key, cardinality = set.len());
            }

            identities += metrics.len();
            processed += snapshot.processed;
            imported += snapshot.imported;
        }

        info!(
            message = "Flushed metrics.",
            workers = snapshots.len(),
            identities,
            processed,
            imported,
        );
        Ok(())
    }
}

/// Flushes a pool every `interval` until shut down, then flushes one last
/// time so the final window is not lost.
pub struct Flusher<R> {
    pool: Arc<WorkerPool>,
    interval: Duration,
    reporter: R,
}

impl<R: Reporter> Flusher<R> {
    pub fn new(pool: Arc<WorkerPool>, interval: Duration, reporter: R) -> Self {
        Self {
            pool,
            interval,
            reporter,
        }
    }

    pub async fn run(self, shutdown: Tripwire) {
        let mut ticks = time::interval_at(Instant::now() + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                _ = ticks.tick() => self.flush_once().await,
            }
        }

        self.flush_once().await;
        debug!(message = "Flusher stopped.");
    }

    async fn flush_once(&self) {
        let snapshots = self.pool.flush();
        let metrics = snapshots.iter().map(|s| s.metrics.len()).sum();
        if let Err(error) = self.reporter.report(snapshots).await {
            emit!(ReportError { error, metrics });
        }
    }
}
