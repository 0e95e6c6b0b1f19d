use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// The fixed set of metric types a worker knows how to aggregate.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Set,
    Timer,
}

impl MetricType {
    pub const ALL: [MetricType; 5] = [
        MetricType::Counter,
        MetricType::Gauge,
        MetricType::Histogram,
        MetricType::Set,
        MetricType::Timer,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Set => "set",
            MetricType::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(display("unknown metric type `{}`", name))]
pub struct UnknownMetricTypeError {
    name: String,
}

impl FromStr for MetricType {
    type Err = UnknownMetricTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "histogram" => Ok(MetricType::Histogram),
            "set" => Ok(MetricType::Set),
            "timer" => Ok(MetricType::Timer),
            other => UnknownMetricTypeSnafu { name: other }.fail(),
        }
    }
}

/// Identifies one metric stream: its name, its declared type and its tag set.
///
/// Tags are kept sorted, so the order in which they were observed on the
/// wire never changes the identity. They are never joined into one string, so
/// a tag containing a comma can't be confused with two tags.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MetricKey {
    pub name: String,
    pub metric_type: String,
    pub tags: Vec<String>,
}

impl MetricKey {
    pub fn new(name: &str, metric_type: &str, tags: &[String]) -> Self {
        let mut tags = tags.to_vec();
        tags.sort_unstable();
        Self {
            name: name.to_owned(),
            metric_type: metric_type.to_owned(),
            tags,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.metric_type)?;
        if !self.tags.is_empty() {
            write!(f, "|#{}", self.tags.join(","))?;
        }
        Ok(())
    }
}

/// The observed value carried by a sample.
///
/// Counters, gauges, histograms and timers carry a number; sets carry the
/// distinct token being counted.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Token(String),
}

impl MetricValue {
    pub const fn as_name(&self) -> &'static str {
        match self {
            MetricValue::Number(_) => "number",
            MetricValue::Token(_) => "token",
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Token(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Token(value.to_owned())
    }
}

/// A single raw observation, as produced by the ingestion layer.
#[derive(Clone, Debug, PartialEq)]
pub struct UdpMetric {
    name: String,
    metric_type: String,
    tags: Vec<String>,
    value: MetricValue,
    sample_rate: f64,
    key: MetricKey,
}

impl UdpMetric {
    pub fn new(
        name: impl Into<String>,
        metric_type: impl Into<String>,
        value: impl Into<MetricValue>,
    ) -> Self {
        let name = name.into();
        let metric_type = metric_type.into();
        let key = MetricKey::new(&name, &metric_type, &[]);
        Self {
            name,
            metric_type,
            tags: Vec::new(),
            value: value.into(),
            sample_rate: 1.0,
            key,
        }
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.key = MetricKey::new(&self.name, &self.metric_type, &tags);
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_type(&self) -> &str {
        &self.metric_type
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn key(&self) -> &MetricKey {
        &self.key
    }
}

/// A peer agent's already aggregated state for one metric identity.
///
/// `value` holds the encoded accumulator state, to be merged rather than
/// sampled.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonMetric {
    name: String,
    metric_type: String,
    tags: Vec<String>,
    value: Vec<u8>,
    key: MetricKey,
}

impl JsonMetric {
    pub fn new(
        name: impl Into<String>,
        metric_type: impl Into<String>,
        tags: Vec<String>,
        value: Vec<u8>,
    ) -> Self {
        let name = name.into();
        let metric_type = metric_type.into();
        let key = MetricKey::new(&name, &metric_type, &tags);
        Self {
            name,
            metric_type,
            tags,
            value,
            key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric_type(&self) -> &str {
        &self.metric_type
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key(&self) -> &MetricKey {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| (*t).to_owned()).collect()
    }

    #[test]
    fn key_ignores_tag_order() {
        let a = MetricKey::new("requests", "counter", &tags(&["region:us", "host:a"]));
        let b = MetricKey::new("requests", "counter", &tags(&["host:a", "region:us"]));
        assert_eq!(a, b);
        assert_eq!(a.tags, ["host:a", "region:us"]);
    }

    #[test]
    fn key_keeps_tags_containing_commas_apart() {
        let joined = MetricKey::new("requests", "counter", &tags(&["a,b"]));
        let split = MetricKey::new("requests", "counter", &tags(&["a", "b"]));
        assert_ne!(joined, split);
        assert_eq!(joined.to_string(), split.to_string());
    }

    #[test]
    fn key_separates_types_and_tags() {
        let counter = MetricKey::new("requests", "counter", &[]);
        let gauge = MetricKey::new("requests", "gauge", &[]);
        let tagged = MetricKey::new("requests", "counter", &tags(&["host:a"]));
        assert_ne!(counter, gauge);
        assert_ne!(counter, tagged);
    }

    #[test]
    fn builder_recomputes_key() {
        let metric = UdpMetric::new("cpu", "gauge", 0.5).with_tags(tags(&["b", "a"]));
        assert_eq!(metric.key(), &MetricKey::new("cpu", "gauge", &tags(&["a", "b"])));
        assert_eq!(metric.sample_rate(), 1.0);
    }

    #[test]
    fn parse_metric_type() {
        for kind in MetricType::ALL {
            assert_eq!(kind.as_str().parse::<MetricType>(), Ok(kind));
        }
        let error = "bogus".parse::<MetricType>().unwrap_err();
        assert_eq!(error.to_string(), "unknown metric type `bogus`");
    }

    #[test]
    fn key_display() {
        let key = MetricKey::new("requests", "counter", &tags(&["host:a"]));
        assert_eq!(key.to_string(), "requests|counter|#host:a");
        assert_eq!(MetricKey::new("cpu", "gauge", &[]).to_string(), "cpu|gauge");
    }
}
