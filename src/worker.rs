//! A single aggregation shard.
//!
//! A worker owns one window of accumulators. Its dispatch loop is the only
//! thing that samples into the window, while `flush` may be called at any time
//! from another task, so both go through the same per-worker lock. Workers
//! never share state with each other.

use std::{collections::HashMap, sync::Arc, time::Instant};

use parking_lot::Mutex;
use stream_cancel::{Trigger, Tripwire};
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
};

use crate::{
    aggregate::{Counter, Gauge, Histo, Set, WorkerMetrics},
    event::{JsonMetric, MetricKey, MetricType, MetricValue, UdpMetric},
    internal_events::{
        MetricValueMismatch, SetMergeError, UnknownMetricType, WorkerFlushed, WorkerStopped,
    },
};

/// One window's worth of accumulated state, as handed over by a flush.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkerSnapshot {
    pub metrics: WorkerMetrics,
    /// Samples processed during the window, including dropped ones.
    pub processed: u64,
    /// Peer states imported during the window.
    pub imported: u64,
}

#[derive(Debug)]
pub struct Worker {
    id: usize,
    window: Mutex<WorkerSnapshot>,
}

impl Worker {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            window: Mutex::new(WorkerSnapshot::default()),
        }
    }

    /// Starts a worker's dispatch loop on the current tokio runtime.
    pub fn spawn(id: usize) -> WorkerHandle {
        let worker = Arc::new(Self::new(id));
        let (sender, receiver) = mpsc::unbounded_channel();
        let (trigger, tripwire) = Tripwire::new();
        let task = tokio::spawn(Arc::clone(&worker).run(receiver, tripwire));

        WorkerHandle {
            worker,
            sender,
            trigger,
            task,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Processes samples one at a time until `shutdown` fires or every sender
    /// is gone.
    ///
    /// Shutdown is only checked between samples, so a sample being processed
    /// always completes. Once it fires the channel is closed, so further sends
    /// fail, and every sample accepted before that is still processed.
    pub async fn run(
        self: Arc<Self>,
        mut work: mpsc::UnboundedReceiver<UdpMetric>,
        shutdown: Tripwire,
    ) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    work.close();
                    while let Some(metric) = work.recv().await {
                        self.process_metric(&metric);
                    }
                    break;
                }
                metric = work.recv() => match metric {
                    Some(metric) => self.process_metric(&metric),
                    None => break,
                },
            }
        }

        emit!(WorkerStopped { worker: self.id });
    }

    /// Folds one sample into the current window.
    pub fn process_metric(&self, metric: &UdpMetric) {
        let mut window = self.window.lock();
        window.processed += 1;

        let Ok(metric_type) = metric.metric_type().parse::<MetricType>() else {
            emit!(UnknownMetricType {
                name: metric.name(),
                metric_type: metric.metric_type(),
                stage: "processing",
            });
            return;
        };

        let rate = metric.sample_rate();
        let metrics = &mut window.metrics;
        match (metric_type, metric.value()) {
            (MetricType::Counter, MetricValue::Number(value)) => {
                sample_into(&mut metrics.counters, metric, Counter::new, |c| {
                    c.sample(*value, rate);
                });
            }
            (MetricType::Gauge, MetricValue::Number(value)) => {
                sample_into(&mut metrics.gauges, metric, Gauge::new, |g| {
                    g.sample(*value, rate);
                });
            }
            (MetricType::Histogram, MetricValue::Number(value)) => {
                sample_into(&mut metrics.histograms, metric, Histo::new, |h| {
                    h.sample(*value, rate);
                });
            }
            (MetricType::Timer, MetricValue::Number(value)) => {
                sample_into(&mut metrics.timers, metric, Histo::new, |h| {
                    h.sample(*value, rate);
                });
            }
            (MetricType::Set, MetricValue::Token(token)) => {
                sample_into(&mut metrics.sets, metric, Set::new, |s| s.sample(token, rate));
            }
            (metric_type, value) => emit!(MetricValueMismatch {
                name: metric.name(),
                metric_type,
                value: value.as_name(),
            }),
        }
    }

    /// Merges a peer's pre-aggregated state into the current window.
    ///
    /// Counted as imported and never as processed, since the peer already
    /// counted it when it was sampled. Only sets can be merged.
    pub fn import_metric(&self, other: &JsonMetric) {
        let mut window = self.window.lock();
        window.imported += 1;

        match other.metric_type().parse::<MetricType>() {
            Ok(MetricType::Set) => {
                let set = window
                    .metrics
                    .sets
                    .entry(other.key().clone())
                    .or_insert_with(|| {
                        debug!(message = "New set.", metric_name = %other.name());
                        Set::new(other.name(), other.tags())
                    });
                if let Err(error) = set.combine(other.value()) {
                    emit!(SetMergeError {
                        name: other.name(),
                        error: &error,
                    });
                }
            }
            _ => emit!(UnknownMetricType {
                name: other.name(),
                metric_type: other.metric_type(),
                stage: "importing",
            }),
        }
    }

    /// Hands over the current window and starts a new, empty one.
    ///
    /// Only the swap happens under the lock; reporting about the flush happens
    /// after it is released.
    pub fn flush(&self) -> WorkerSnapshot {
        let start = Instant::now();
        let snapshot = std::mem::take(&mut *self.window.lock());
        let elapsed = start.elapsed();

        emit!(WorkerFlushed {
            worker: self.id,
            elapsed,
            processed: snapshot.processed,
            imported: snapshot.imported,
            metrics: &snapshot.metrics,
        });

        snapshot
    }

    /// Samples processed so far in the current window.
    pub fn processed(&self) -> u64 {
        self.window.lock().processed
    }

    /// Peer states imported so far in the current window.
    pub fn imported(&self) -> u64 {
        self.window.lock().imported
    }
}

fn sample_into<A>(
    map: &mut HashMap<MetricKey, A>,
    metric: &UdpMetric,
    new: impl FnOnce(&str, &[String]) -> A,
    sample: impl FnOnce(&mut A),
) {
    match map.get_mut(metric.key()) {
        Some(accumulator) => sample(accumulator),
        None => {
            debug!(
                message = "New accumulator.",
                metric_name = %metric.name(),
                metric_type = %metric.metric_type(),
            );
            let mut accumulator = new(metric.name(), metric.tags());
            sample(&mut accumulator);
            map.insert(metric.key().clone(), accumulator);
        }
    }
}

/// Owns a running worker: its inbound channel, its shutdown trigger and its
/// task.
pub struct WorkerHandle {
    worker: Arc<Worker>,
    sender: mpsc::UnboundedSender<UdpMetric>,
    trigger: Trigger,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("worker", &self.worker.id)
            .finish_non_exhaustive()
    }
}

impl WorkerHandle {
    pub fn worker(&self) -> &Arc<Worker> {
        &self.worker
    }

    pub fn sender(&self) -> &mpsc::UnboundedSender<UdpMetric> {
        &self.sender
    }

    /// Queues a sample for the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns the sample back if the dispatch loop has already exited.
    pub fn send(&self, metric: UdpMetric) -> Result<(), SendError<UdpMetric>> {
        self.sender.send(metric)
    }

    pub fn flush(&self) -> WorkerSnapshot {
        self.worker.flush()
    }

    /// Signals the dispatch loop to stop and waits for it to exit.
    ///
    /// Consumes the handle, so the signal can only ever be sent once. Samples
    /// already accepted by [`WorkerHandle::send`] are processed before this
    /// returns.
    pub async fn stop(self) {
        self.trigger.cancel();
        if let Err(error) = self.task.await {
            error!(message = "Worker task failed.", worker = self.worker.id, %error);
        }
    }
}
