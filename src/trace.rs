//! Logging setup for binaries embedding the aggregator.
//!
//! The library itself only emits through `tracing`; nothing is printed until
//! a subscriber is installed, either by the host application or through
//! [`init`].

use tracing::dispatcher::{Dispatch, set_global_default};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs a global formatting subscriber filtered by `levels`, an
/// `EnvFilter` directive such as `"statsd_aggregator=debug,info"`.
///
/// Calling this more than once keeps the first subscriber.
pub fn init(color: bool, json: bool, levels: &str) {
    let filter = EnvFilter::try_new(levels).unwrap_or_else(|error| {
        eprintln!("Invalid log filter {levels:?}, falling back to \"info\": {error}");
        EnvFilter::new("info")
    });

    let dispatch = if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .finish();
        Dispatch::new(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_ansi(color)
            .with_env_filter(filter)
            .finish();
        Dispatch::new(subscriber)
    };

    // Tests can initialize this multiple times.
    _ = LogTracer::init();
    _ = set_global_default(dispatch);
}

/// Initializes logging for tests from `TEST_LOG`, defaulting to errors only.
pub fn test_init() {
    let levels = std::env::var("TEST_LOG").unwrap_or_else(|_| "error".to_owned());
    init(false, false, &levels);
}
