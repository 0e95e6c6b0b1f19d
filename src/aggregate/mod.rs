//! Per-type accumulators and the per-worker bundle of them.

mod counter;
mod gauge;
mod histo;
mod set;

use std::collections::HashMap;

pub use self::counter::Counter;
pub use self::gauge::Gauge;
pub use self::histo::Histo;
pub use self::set::{EncodeError, MergeError, Set};

use crate::event::{MetricKey, MetricType};

/// The number of real events one sample stands in for.
///
/// Rates outside of `(0, 1]` can't be compensated for and count as a single
/// event.
pub(crate) fn sample_weight(sample_rate: f64) -> f64 {
    if sample_rate > 0.0 && sample_rate <= 1.0 {
        1.0 / sample_rate
    } else {
        1.0
    }
}

/// Everything one worker accumulated during one window.
///
/// Keyed on the full [`MetricKey`] rather than a digest of it, so distinct
/// identities can never collide.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkerMetrics {
    pub counters: HashMap<MetricKey, Counter>,
    pub gauges: HashMap<MetricKey, Gauge>,
    pub histograms: HashMap<MetricKey, Histo>,
    pub sets: HashMap<MetricKey, Set>,
    pub timers: HashMap<MetricKey, Histo>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct identities held for one metric type.
    pub fn len_of(&self, metric_type: MetricType) -> usize {
        match metric_type {
            MetricType::Counter => self.counters.len(),
            MetricType::Gauge => self.gauges.len(),
            MetricType::Histogram => self.histograms.len(),
            MetricType::Set => self.sets.len(),
            MetricType::Timer => self.timers.len(),
        }
    }

    pub fn len(&self) -> usize {
        MetricType::ALL.iter().map(|t| self.len_of(*t)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_of_sample_rates() {
        assert_eq!(sample_weight(1.0), 1.0);
        assert_eq!(sample_weight(0.5), 2.0);
        assert_eq!(sample_weight(0.0), 1.0);
        assert_eq!(sample_weight(-0.5), 1.0);
        assert_eq!(sample_weight(2.0), 1.0);
        assert_eq!(sample_weight(f64::NAN), 1.0);
    }

    #[test]
    fn counts_by_type() {
        let mut metrics = WorkerMetrics::new();
        assert!(metrics.is_empty());

        let key = MetricKey::new("latency", "timer", &[]);
        metrics.timers.insert(key, Histo::new("latency", &[]));
        let key = MetricKey::new("users", "set", &[]);
        metrics.sets.insert(key, Set::new("users", &[]));

        assert_eq!(metrics.len_of(MetricType::Timer), 1);
        assert_eq!(metrics.len_of(MetricType::Set), 1);
        assert_eq!(metrics.len_of(MetricType::Counter), 0);
        assert_eq!(metrics.len(), 2);
    }
}
