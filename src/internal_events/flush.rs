use std::time::Duration;

use metrics::{counter, histogram};

use super::{
    InternalEvent,
    prelude::{error_stage, error_type},
};
use crate::{aggregate::WorkerMetrics, event::MetricType};

/// Reported by a worker once its window has been handed off, outside of the
/// worker's lock.
#[derive(Debug)]
pub struct WorkerFlushed<'a> {
    pub worker: usize,
    pub elapsed: Duration,
    pub processed: u64,
    pub imported: u64,
    pub metrics: &'a WorkerMetrics,
}

impl InternalEvent for WorkerFlushed<'_> {
    fn emit(self) {
        trace!(
            message = "Worker flushed.",
            worker = self.worker,
            processed = self.processed,
            imported = self.imported,
            elapsed = ?self.elapsed,
        );
        histogram!("flush_worker_duration_seconds").record(self.elapsed);

        let worker = self.worker.to_string();
        counter!("worker_metrics_processed_total", "worker" => worker.clone())
            .increment(self.processed);
        counter!("worker_metrics_imported_total", "worker" => worker).increment(self.imported);

        for metric_type in MetricType::ALL {
            counter!("worker_metrics_flushed_total", "metric_type" => metric_type.as_str())
                .increment(self.metrics.len_of(metric_type) as u64);
        }
    }

    fn name(&self) -> Option<&'static str> {
        Some("WorkerFlushed")
    }
}

#[derive(Debug)]
pub struct ReportError {
    pub error: crate::Error,
    pub metrics: usize,
}

impl InternalEvent for ReportError {
    fn emit(self) {
        error!(
            message = "Failed to report flushed metrics; dropping.",
            error = %self.error,
            metrics = self.metrics,
            error_type = error_type::REQUEST_FAILED,
            stage = error_stage::SENDING,
        );
    }

    fn name(&self) -> Option<&'static str> {
        Some("ReportError")
    }
}
