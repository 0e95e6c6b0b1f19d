use super::sample_weight;

/// A running sum of observations, scaled by sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Counter {
    name: String,
    tags: Vec<String>,
    value: f64,
}

impl Counter {
    pub fn new(name: &str, tags: &[String]) -> Self {
        Self {
            name: name.to_owned(),
            tags: tags.to_vec(),
            value: 0.0,
        }
    }

    pub fn sample(&mut self, sample: f64, sample_rate: f64) {
        self.value += sample * sample_weight(sample_rate);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_samples() {
        let mut counter = Counter::new("requests", &[]);
        counter.sample(1.0, 1.0);
        counter.sample(2.0, 1.0);
        assert_eq!(counter.value(), 3.0);
    }

    #[test]
    fn compensates_sample_rate() {
        let mut counter = Counter::new("requests", &["host:a".to_owned()]);
        counter.sample(1.0, 0.1);
        assert!((counter.value() - 10.0).abs() < 1e-9);
        assert_eq!(counter.tags(), ["host:a"]);
    }
}
