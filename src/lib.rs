//! The aggregation core of a statsd-style metrics agent.
//!
//! Incoming samples are sharded by metric identity across a pool of
//! single-threaded workers. Each worker folds its samples into per-type
//! accumulators and hands its whole window over when flushed, after which it
//! starts again from an empty window.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod internal_events;

pub mod aggregate;
pub mod config;
pub mod event;
#[cfg(any(test, feature = "test"))]
pub mod event_test_util;
pub mod flusher;
pub mod pool;
pub mod trace;
pub mod worker;

pub use crate::{
    aggregate::WorkerMetrics,
    config::AggregatorConfig,
    event::{JsonMetric, MetricKey, MetricType, MetricValue, UdpMetric},
    flusher::{Flusher, LogReporter, Reporter},
    pool::WorkerPool,
    worker::{Worker, WorkerHandle, WorkerSnapshot},
};

/// The basic error type, dynamically dispatched and safe to send across
/// threads.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The basic result type, defined in terms of [`Error`] and generic over `T`.
pub type Result<T> = std::result::Result<T, Error>;
