use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    metric::{Metric, Outcome},
    report::AggregateStats,
};

/// How many failure messages an aggregate keeps as examples.
pub const MAX_ERROR_SAMPLES: usize = 3;

/// The `Aggregate` trait defines how raw [`Metric`] values are collected into a
/// compact, mergeable representation.
///
/// Aggregates store counts, sums and extremes. They do not compute rates or
/// averages; those are derived when the aggregate is turned into
/// [`AggregateStats`].
///
/// # Implementor notes
/// - `merge` must be associative so that partial aggregates (per stage, per
///   batch) can be combined in any grouping into the same run-wide result.
/// - `consume` is called once per metric and should stay cheap.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Incorporate every metric of `metrics`, in order.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine another aggregate into this one.
    fn merge(&mut self, other: Self);
}

/// Raw counters behind [`AggregateStats`].
///
/// Latency fields only ever see successful outcomes: a failed request's latency
/// says how long it took to fail, not how fast orders are accepted.
#[crate::macros::aggregate]
#[derive(Default)]
pub struct LatencyAggregate {
    pub count: usize,
    pub success_count: usize,
    pub success_latency_ms_total: u64,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
    /// First failure messages, in the order they were seen
    pub error_samples: Vec<String>,
}

impl Aggregate for LatencyAggregate {
    type Metric = Outcome;

    fn new() -> Self {
        LatencyAggregate::default()
    }

    fn consume(&mut self, outcome: &Outcome) {
        self.count += 1;

        if outcome.is_success() {
            let latency = outcome.latency_ms();
            self.success_count += 1;
            self.success_latency_ms_total = self.success_latency_ms_total.saturating_add(latency);
            self.min_latency_ms = Some(self.min_latency_ms.map_or(latency, |m| m.min(latency)));
            self.max_latency_ms = Some(self.max_latency_ms.map_or(latency, |m| m.max(latency)));
        } else if self.error_samples.len() < MAX_ERROR_SAMPLES {
            let detail = outcome.error_detail().unwrap_or("unknown error");
            self.error_samples.push(detail.to_owned());
        }
    }

    fn merge(&mut self, other: Self) {
        self.count += other.count;
        self.success_count += other.success_count;
        self.success_latency_ms_total = self
            .success_latency_ms_total
            .saturating_add(other.success_latency_ms_total);
        self.min_latency_ms = match (self.min_latency_ms, other.min_latency_ms) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency_ms = match (self.max_latency_ms, other.max_latency_ms) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let room = MAX_ERROR_SAMPLES.saturating_sub(self.error_samples.len());
        self.error_samples
            .extend(other.error_samples.into_iter().take(room));
    }
}

/// Reduce a batch of outcomes into summary statistics.
///
/// `elapsed_ms` is the wall-clock duration of the batch; it only feeds the
/// batch-observed throughput. Identical inputs always give identical stats.
pub fn aggregate(outcomes: &[Outcome], elapsed_ms: u64) -> AggregateStats {
    let mut agg = LatencyAggregate::new();
    agg.aggregate(outcomes);
    AggregateStats::from_aggregate(&agg, elapsed_ms)
}
