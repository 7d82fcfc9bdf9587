use std::{fmt::Write as _, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
    aggregate::LatencyAggregate,
    error::Result,
    scenario::{Discipline, ScenarioReport, StageStatus},
};

/// Summary statistics of one batch (or of a whole run).
///
/// A fresh value is produced by every call to [`crate::aggregate()`]. Latency
/// fields are computed over successful outcomes only and are `None` when
/// nothing succeeded; they never fall back to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub sample_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// `success_count / sample_count` as a raw fraction, `0.0` for no samples.
    pub success_rate: f64,
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
    /// Wall-clock duration of the batch the stats describe.
    pub elapsed_ms: u64,
    pub error_samples: Vec<String>,
}

/// The two throughput figures a batch supports.
///
/// They answer different questions and are never interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Throughput {
    /// `1000 / avg_latency_ms`: the ceiling of a single connection issuing
    /// requests back to back. Meaningful after sequential batches.
    Instantaneous,
    /// `success_count / elapsed_seconds`: what a concurrent batch actually
    /// achieved.
    BatchObserved,
}

impl AggregateStats {
    pub fn from_aggregate(agg: &LatencyAggregate, elapsed_ms: u64) -> Self {
        let success_rate = if agg.count == 0 {
            0.0
        } else {
            agg.success_count as f64 / agg.count as f64
        };
        let avg_latency_ms = (agg.success_count > 0)
            .then(|| agg.success_latency_ms_total as f64 / agg.success_count as f64);

        Self {
            sample_count: agg.count,
            success_count: agg.success_count,
            failure_count: agg.count - agg.success_count,
            success_rate,
            avg_latency_ms,
            min_latency_ms: agg.min_latency_ms,
            max_latency_ms: agg.max_latency_ms,
            elapsed_ms,
            error_samples: agg.error_samples.clone(),
        }
    }

    /// Single-connection throughput ceiling, `None` without a positive average.
    pub fn instantaneous_throughput(&self) -> Option<f64> {
        self.avg_latency_ms
            .filter(|avg| *avg > 0.0)
            .map(|avg| 1000.0 / avg)
    }

    /// Realized successes per second, `None` for a zero-length batch.
    pub fn batch_throughput(&self) -> Option<f64> {
        (self.elapsed_ms > 0).then(|| self.success_count as f64 * 1000.0 / self.elapsed_ms as f64)
    }

    pub fn throughput(&self, kind: Throughput) -> Option<f64> {
        match kind {
            Throughput::Instantaneous => self.instantaneous_throughput(),
            Throughput::BatchObserved => self.batch_throughput(),
        }
    }

    /// Success rate as a percentage with one decimal, e.g. `"66.7%"`.
    pub fn success_percent(&self) -> String {
        format!("{:.1}%", self.success_rate * 100.0)
    }
}

/// Consumes a finished [`ScenarioReport`] and sends it somewhere.
///
/// Reporters are the only place the harness does presentation; everything
/// upstream of them is plain data.
pub trait Reporter {
    fn report(&self, report: &ScenarioReport) -> impl Future<Output = Result<()>>;
}

/// Human-readable summary on stdout.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn render(report: &ScenarioReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Run {}", report.run_label);

        for (position, result) in report.stages.iter().enumerate() {
            let stage = &result.stage;
            let _ = writeln!(
                out,
                "\n[{}] {} ({}, {} orders)",
                position + 1,
                stage.name,
                stage.discipline,
                stage.batch_size
            );

            let run = match &result.status {
                StageStatus::Skipped => {
                    let _ = writeln!(out, "   Skipped: gate {} not met", stage.gate);
                    continue;
                }
                StageStatus::Executed(run) => run,
            };

            let stats = &run.stats;
            let _ = writeln!(out, "   Duration: {}ms", stats.elapsed_ms);
            let _ = writeln!(
                out,
                "   Success: {}/{} ({})",
                stats.success_count,
                stats.sample_count,
                stats.success_percent()
            );
            write_latencies(&mut out, stats);
            if let Some(tps) = run.throughput_per_sec {
                let label = match stage.discipline {
                    Discipline::Sequential { .. } => "Estimated throughput",
                    Discipline::Concurrent => "Throughput",
                };
                let _ = writeln!(out, "   {label}: {tps:.1} orders/sec");
            }
            if stats.failure_count > 0 {
                let _ = writeln!(out, "   Failed: {} orders", stats.failure_count);
                for (i, detail) in stats.error_samples.iter().enumerate() {
                    let _ = writeln!(out, "     {}. {detail}", i + 1);
                }
            }
        }

        let overall = &report.overall;
        let _ = writeln!(out, "\nAssessment");
        if let Some(avg) = overall.avg_latency_ms {
            let _ = writeln!(out, "   Average latency: {avg:.1}ms");
        }
        if let Some(tps) = overall.instantaneous_throughput() {
            let _ = writeln!(out, "   Estimated max throughput: ~{tps:.0} orders/sec per connection");
        }
        let _ = writeln!(
            out,
            "   Success rate: {}/{} ({})",
            overall.success_count,
            overall.sample_count,
            overall.success_percent()
        );
        let _ = writeln!(out, "   System performance: {}", report.rating);
        out
    }
}

fn write_latencies(out: &mut String, stats: &AggregateStats) {
    if let (Some(avg), Some(min), Some(max)) =
        (stats.avg_latency_ms, stats.min_latency_ms, stats.max_latency_ms)
    {
        let _ = writeln!(out, "   Avg latency: {avg:.1}ms");
        let _ = writeln!(out, "   Min latency: {min}ms");
        let _ = writeln!(out, "   Max latency: {max}ms");
    } else {
        let _ = writeln!(out, "   Latency: n/a (no successful orders)");
    }
}

impl Reporter for ConsoleReporter {
    async fn report(&self, report: &ScenarioReport) -> Result<()> {
        print!("{}", Self::render(report));
        Ok(())
    }
}

/// The whole report as pretty JSON on stdout.
pub struct JsonReporter;

impl Reporter for JsonReporter {
    async fn report(&self, report: &ScenarioReport) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}
