use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Could not read config file {}: {}", path.display(), source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not parse config: {}", source))]
    Parse { source: toml::de::Error },

    #[snafu(display("`num_workers` must be at least 1"))]
    NoWorkers,

    #[snafu(display("`interval_ms` must be greater than zero"))]
    ZeroInterval,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AggregatorConfig {
    /// Number of independent workers samples are sharded across.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// The interval between flushes in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_num_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

const fn default_interval_ms() -> u64 {
    10 * 1000
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl AggregatorConfig {
    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Fails if the file can't be read, isn't valid TOML for this config, or
    /// doesn't pass [`AggregatorConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Fails on unknown keys, mistyped values, or an invalid configuration.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).context(ParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails if there would be no workers or the flush interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return NoWorkersSnafu.fail();
        }
        if self.interval_ms == 0 {
            return ZeroIntervalSnafu.fail();
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
