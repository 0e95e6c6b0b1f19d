use super::sample_weight;

const DEFAULT_EPS: f64 = 1.0 / 128.0;
const DEFAULT_MIN_VALUE: f64 = 1.0e-9;
const DEFAULT_BIN_LIMIT: usize = 4096;

const POS_INF_KEY: i16 = i16::MAX;

/// Bin layout of the sketch.
///
/// A value `v` lands in the bin keyed `round(log_gamma(v)) + norm_bias`, so
/// every value in a bin is within a factor of `sqrt(gamma)` of the bin's
/// value. Magnitudes below `norm_min` share the zero bin, negative values
/// mirror positive ones.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Config {
    bin_limit: usize,
    gamma_v: f64,
    // Natural log of `gamma_v`, for computing log base gamma.
    gamma_ln: f64,
    norm_min: f64,
    norm_bias: i32,
}

impl Config {
    fn new(eps: f64, min_value: f64, bin_limit: usize) -> Self {
        let eps = eps * 2.0;
        let gamma_v = 1.0 + eps;
        let gamma_ln = eps.ln_1p();

        let norm_emin = (min_value.ln() / gamma_ln).floor() as i32;
        let norm_bias = -norm_emin + 1;
        let norm_min = gamma_v.powf(f64::from(1 - norm_bias));

        Self {
            bin_limit: bin_limit.max(1),
            gamma_v,
            gamma_ln,
            norm_min,
            norm_bias,
        }
    }

    fn key(&self, v: f64) -> i16 {
        if v < 0.0 {
            return -self.key(-v);
        }
        if v < self.norm_min {
            return 0;
        }

        let key = (v.ln() / self.gamma_ln).round_ties_even() + f64::from(self.norm_bias);
        key.clamp(1.0, f64::from(POS_INF_KEY)) as i16
    }

    fn bin_value(&self, k: i16) -> f64 {
        if k < 0 {
            return -self.bin_value(-k);
        }
        match k {
            0 => 0.0,
            POS_INF_KEY => f64::INFINITY,
            k => self.gamma_v.powf(f64::from(i32::from(k) - self.norm_bias)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_EPS, DEFAULT_MIN_VALUE, DEFAULT_BIN_LIMIT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bin {
    k: i16,
    n: f64,
}

/// A distribution of observations, used for both histograms and timers.
///
/// Observations are folded into logarithmically sized bins, DDSketch style,
/// so memory is bounded by the bin limit no matter how many samples arrive.
/// Each observation is weighted by its sample rate, so the counts and
/// quantiles reflect the events the samples stand in for. Count, sum, min
/// and max are exact; quantiles are accurate to within about 1% of the value.
#[derive(Clone, Debug, PartialEq)]
pub struct Histo {
    name: String,
    tags: Vec<String>,
    config: Config,
    // Sorted by key, which is also value order.
    bins: Vec<Bin>,
    count: f64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Histo {
    pub fn new(name: &str, tags: &[String]) -> Self {
        Self::with_config(name, tags, Config::default())
    }

    fn with_config(name: &str, tags: &[String], config: Config) -> Self {
        Self {
            name: name.to_owned(),
            tags: tags.to_vec(),
            config,
            bins: Vec::new(),
            count: 0.0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// NaN observations are ignored.
    pub fn sample(&mut self, sample: f64, sample_rate: f64) {
        if sample.is_nan() {
            return;
        }

        let weight = sample_weight(sample_rate);
        self.count += weight;
        self.sum += sample * weight;
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);

        let key = self.config.key(sample);
        match self.bins.binary_search_by_key(&key, |bin| bin.k) {
            Ok(index) => self.bins[index].n += weight,
            Err(index) => {
                self.bins.insert(index, Bin { k: key, n: weight });
                self.trim_left();
            }
        }
    }

    /// Collapses the lowest bins into one once over the bin limit, keeping
    /// the upper quantiles accurate.
    fn trim_left(&mut self) {
        let Some(excess) = self.bins.len().checked_sub(self.config.bin_limit) else {
            return;
        };
        if excess == 0 {
            return;
        }

        let collapsed: f64 = self.bins.drain(..excess).map(|bin| bin.n).sum();
        self.bins[0].n += collapsed;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The number of events observed, after sample rate compensation.
    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        (!self.bins.is_empty()).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (!self.bins.is_empty()).then_some(self.max)
    }

    /// Nearest-rank quantile over the cumulative weight of the bins. `q` is
    /// clamped to `[0, 1]`; the extremes return the exact min and max.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.bins.is_empty() {
            return None;
        }

        let q = q.clamp(0.0, 1.0);
        if q <= 0.0 {
            return Some(self.min);
        }
        if q >= 1.0 {
            return Some(self.max);
        }

        let wanted = q * self.count;
        let mut seen = 0.0;
        for bin in &self.bins {
            seen += bin.n;
            if seen >= wanted {
                let value = self.config.bin_value(bin.k);
                return Some(value.clamp(self.min, self.max));
            }
        }
        Some(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn assert_close(actual: Option<f64>, expected: f64, tolerance: f64) {
        let actual = actual.expect("empty histogram");
        let error = ((actual - expected) / expected).abs();
        assert!(
            error <= tolerance,
            "expected {expected} within {tolerance}, got {actual}"
        );
    }

    #[test]
    fn empty() {
        let histo = Histo::new("latency", &[]);
        assert_eq!(histo.count(), 0.0);
        assert_eq!(histo.min(), None);
        assert_eq!(histo.max(), None);
        assert_eq!(histo.quantile(0.5), None);
    }

    #[test]
    fn tracks_summary_statistics() {
        let mut histo = Histo::new("latency", &[]);
        for value in [3.0, 1.0, 2.0, 5.0, 4.0] {
            histo.sample(value, 1.0);
        }
        assert_eq!(histo.count(), 5.0);
        assert_eq!(histo.sum(), 15.0);
        assert_eq!(histo.min(), Some(1.0));
        assert_eq!(histo.max(), Some(5.0));
        assert_close(histo.quantile(0.5), 3.0, 0.01);
        assert_eq!(histo.quantile(0.0), Some(1.0));
        assert_eq!(histo.quantile(1.0), Some(5.0));
        assert_eq!(histo.quantile(7.0), Some(5.0));
    }

    #[test]
    fn weights_by_sample_rate() {
        let mut histo = Histo::new("latency", &[]);
        histo.sample(1.0, 1.0);
        histo.sample(10.0, 0.25);
        assert_eq!(histo.count(), 5.0);
        assert_eq!(histo.sum(), 41.0);
        // four of the five events stand behind the second sample
        assert_close(histo.quantile(0.5), 10.0, 0.01);
    }

    #[test]
    fn zero_and_negative_values() {
        let mut histo = Histo::new("delta", &[]);
        for value in [-4.0, -2.0, 0.0, 2.0, 4.0] {
            histo.sample(value, 1.0);
        }
        histo.sample(f64::NAN, 1.0);

        assert_eq!(histo.count(), 5.0);
        assert_eq!(histo.min(), Some(-4.0));
        assert_close(histo.quantile(0.2), -4.0, 0.01);
        assert_eq!(histo.quantile(0.5), Some(0.0));
        assert_close(histo.quantile(0.8), 2.0, 0.01);
    }

    #[test]
    fn quantiles_within_relative_error() {
        let mut histo = Histo::new("latency", &[]);
        for value in 1..=10_000 {
            histo.sample(f64::from(value), 1.0);
        }

        assert_eq!(histo.count(), 10_000.0);
        assert_close(histo.quantile(0.5), 5000.0, 0.01);
        assert_close(histo.quantile(0.9), 9000.0, 0.01);
        assert_close(histo.quantile(0.99), 9900.0, 0.01);
    }

    #[test]
    fn memory_is_bounded_by_bins() {
        let mut histo = Histo::new("latency", &[]);
        for _ in 0..100 {
            for value in 1..=1000 {
                histo.sample(f64::from(value), 1.0);
            }
        }
        assert_eq!(histo.count(), 100_000.0);
        assert!(histo.bins.len() < 1000);

        let config = Config::new(DEFAULT_EPS, DEFAULT_MIN_VALUE, 8);
        let mut small = Histo::with_config("latency", &[], config);
        for value in 1..=1000 {
            small.sample(f64::from(value), 1.0);
        }
        assert_eq!(small.bins.len(), 8);
        assert_eq!(small.count(), 1000.0);
        assert_eq!(small.min(), Some(1.0));
        assert_close(small.quantile(0.99), 990.0, 0.02);
    }
}
