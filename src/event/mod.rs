//! Metric identity and the two kinds of inbound work a worker accepts.

mod metric;

pub use self::metric::{JsonMetric, MetricKey, MetricType, MetricValue, UdpMetric};
