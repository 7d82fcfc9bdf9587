//! Orderload: a load-test harness for order-submission services.
//!
//! Orderload sends synthetic limit orders to an HTTP order endpoint and measures
//! how the service holds up, first one request at a time and then in concurrent
//! batches of growing size. The result is a per-stage breakdown (latency,
//! throughput, failures) and a single health rating for the whole run.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`OrderFactory`]: builds uniquely identified [`Order`]s with a jittered price.
//! - [`OrderGateway`]: submits one order; any 2xx is accepted, with the service's
//!   order id when it returned one.
//!   [`HttpGateway`] is the reqwest-backed implementation.
//! - [`Executor`]: runs a batch sequentially or concurrently and records one
//!   [`Outcome`] per order. [`OrderExecutor`] applies the request timeout.
//! - [`Aggregate`]: folds outcomes into a compact, mergeable [`LatencyAggregate`],
//!   which becomes [`AggregateStats`] through [`aggregate()`].
//! - [`ScenarioRunner`]: walks a list of [`ScenarioStage`]s, evaluates each
//!   stage's [`Gate`], sleeps a cooldown between executed stages and rates the
//!   run with [`HealthRating`].
//! - [`Reporter`]: consumes the finished [`ScenarioReport`] (console or JSON).
//!
//! Configuration lives in [`BenchConfig`], loaded from TOML and overridden from
//! the command line by the `orderload` binary.

/// Outcome aggregation
pub mod aggregate;
/// Run configuration and health thresholds
pub mod config;
/// Configuration and orchestration errors
pub mod error;
/// Batch execution disciplines
pub mod executor;
/// Transport to the order service
pub mod gateway;
/// Per-order outcomes
pub mod metric;
/// Order construction
pub mod order;
/// Summary statistics and reporters
pub mod report;
/// Staged plans and the runner that drives them
pub mod scenario;

pub mod macros {
    pub use orderload_macros::*;
}

pub use aggregate::{Aggregate, LatencyAggregate, aggregate};
pub use config::{BenchConfig, HealthThresholds};
pub use error::{ConfigError, Error, Result};
pub use executor::{Executor, OrderExecutor};
pub use gateway::{HttpGateway, OrderGateway, SubmitError};
pub use metric::{Metric, Outcome};
pub use order::{Order, OrderFactory, OrderType, Side};
pub use report::{AggregateStats, ConsoleReporter, JsonReporter, Reporter, Throughput};
pub use scenario::{
    Discipline, Gate, HealthRating, Plan, ScenarioReport, ScenarioRunner, ScenarioStage,
    StageResult, StageRun, StageStatus,
};
