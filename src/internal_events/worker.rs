use super::{
    InternalEvent,
    prelude::{error_stage, error_type},
};
use crate::{aggregate::MergeError, event::MetricType};

#[derive(Debug)]
pub struct UnknownMetricType<'a> {
    pub name: &'a str,
    pub metric_type: &'a str,
    pub stage: &'static str,
}

impl InternalEvent for UnknownMetricType<'_> {
    fn emit(self) {
        error!(
            message = "Unknown metric type; dropping.",
            metric_name = %self.name,
            metric_type = %self.metric_type,
            error_code = "unknown_metric_type",
            stage = self.stage,
        );
    }

    fn name(&self) -> Option<&'static str> {
        Some("UnknownMetricType")
    }
}

#[derive(Debug)]
pub struct MetricValueMismatch<'a> {
    pub name: &'a str,
    pub metric_type: MetricType,
    pub value: &'static str,
}

impl InternalEvent for MetricValueMismatch<'_> {
    fn emit(self) {
        error!(
            message = "Metric value does not match its type; dropping.",
            metric_name = %self.name,
            metric_type = %self.metric_type,
            value = self.value,
            error_type = error_type::CONVERSION_FAILED,
            stage = error_stage::PROCESSING,
        );
    }

    fn name(&self) -> Option<&'static str> {
        Some("MetricValueMismatch")
    }
}

#[derive(Debug)]
pub struct SetMergeError<'a> {
    pub name: &'a str,
    pub error: &'a MergeError,
}

impl InternalEvent for SetMergeError<'_> {
    fn emit(self) {
        error!(
            message = "Could not merge sets.",
            metric_name = %self.name,
            error = %self.error,
            error_type = error_type::PARSER_FAILED,
            stage = error_stage::PROCESSING,
        );
    }

    fn name(&self) -> Option<&'static str> {
        Some("SetMergeError")
    }
}

#[derive(Debug)]
pub struct WorkerStopped {
    pub worker: usize,
}

impl InternalEvent for WorkerStopped {
    fn emit(self) {
        info!(message = "Stopping.", worker = self.worker);
    }

    fn name(&self) -> Option<&'static str> {
        Some("WorkerStopped")
    }
}
