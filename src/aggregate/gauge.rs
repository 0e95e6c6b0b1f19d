/// The last observed value. Sample rate has no meaning for a gauge.
#[derive(Clone, Debug, PartialEq)]
pub struct Gauge {
    name: String,
    tags: Vec<String>,
    value: f64,
}

impl Gauge {
    pub fn new(name: &str, tags: &[String]) -> Self {
        Self {
            name: name.to_owned(),
            tags: tags.to_vec(),
            value: 0.0,
        }
    }

    pub fn sample(&mut self, sample: f64, _sample_rate: f64) {
        self.value = sample;
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
