//! Scenarios: ordered, data-driven plans of load stages
//!
//! A scenario is a list of [`ScenarioStage`]s executed in declared order. Before a
//! stage runs, its [`Gate`] is evaluated against the stats of the stage right
//! before it; a stage whose gate is not met is skipped (never retried) and the
//! plan moves on. Between two executed stages the runner sleeps a cooldown so
//! that connections from the previous batch settle before load resumes.
//!
//! Once every stage has been attempted, all executed outcomes are aggregated
//! together and the run is rated [`HealthRating::Good`], `Moderate` or `Poor`
//! from the overall success rate.
use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::{
    aggregate::aggregate,
    config::{BenchConfig, DEFAULT_COOLDOWN_MS, HealthThresholds},
    error::{Error, Result},
    executor::Executor,
    metric::{Outcome, as_millis},
    report::{AggregateStats, Throughput},
};

/// How the requests of a stage are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discipline {
    /// One at a time with `pacing_delay_ms` between requests.
    Sequential { pacing_delay_ms: u64 },
    /// All at once, joined.
    Concurrent,
}

impl Discipline {
    /// The throughput figure that is meaningful for this discipline.
    pub fn throughput_kind(&self) -> Throughput {
        match self {
            Discipline::Sequential { .. } => Throughput::Instantaneous,
            Discipline::Concurrent => Throughput::BatchObserved,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discipline::Sequential { pacing_delay_ms: 0 } => write!(f, "sequential"),
            Discipline::Sequential { pacing_delay_ms } => {
                write!(f, "sequential, {pacing_delay_ms}ms pacing")
            }
            Discipline::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Predicate deciding whether a stage runs, given the previous stage's stats.
///
/// The previous stats are `None` when the stage is first or when the stage
/// before it was skipped; only [`Gate::Always`] passes in that case.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gate {
    #[default]
    Always,
    /// At least `count` successful outcomes.
    MinSuccesses { count: usize },
    /// Success rate of at least `ratio`.
    MinSuccessRatio { ratio: f64 },
}

impl Gate {
    pub fn allows(&self, previous: Option<&AggregateStats>) -> bool {
        match (self, previous) {
            (Gate::Always, _) => true,
            (_, None) => false,
            (Gate::MinSuccesses { count }, Some(stats)) => stats.success_count >= *count,
            (Gate::MinSuccessRatio { ratio }, Some(stats)) => {
                stats.sample_count > 0 && stats.success_rate >= *ratio
            }
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Always => write!(f, "always"),
            Gate::MinSuccesses { count } => write!(f, ">= {count} successes"),
            Gate::MinSuccessRatio { ratio } => write!(f, ">= {:.1}% success", ratio * 100.0),
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStage {
    pub name: String,
    pub discipline: Discipline,
    pub batch_size: usize,
    #[serde(default = "default_jitter_bound")]
    pub jitter_bound: f64,
    #[serde(default)]
    pub gate: Gate,
}

fn default_jitter_bound() -> f64 {
    crate::config::DEFAULT_JITTER_BOUND
}

impl ScenarioStage {
    pub fn single(name: impl Into<String>, jitter_bound: f64) -> Self {
        Self::sequential(name, 1, Duration::ZERO, jitter_bound)
    }

    pub fn sequential(
        name: impl Into<String>,
        batch_size: usize,
        pacing_delay: Duration,
        jitter_bound: f64,
    ) -> Self {
        Self {
            name: name.into(),
            discipline: Discipline::Sequential {
                pacing_delay_ms: as_millis(pacing_delay),
            },
            batch_size,
            jitter_bound,
            gate: Gate::Always,
        }
    }

    pub fn concurrent(name: impl Into<String>, batch_size: usize, jitter_bound: f64) -> Self {
        Self {
            name: name.into(),
            discipline: Discipline::Concurrent,
            batch_size,
            jitter_bound,
            gate: Gate::Always,
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }
}

/// Built-in stage plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Single order, paced sequential batch, then concurrent batches of growing
    /// size, each gated on the previous batch's success ratio.
    #[default]
    Escalation,
    /// Single order, unpaced sequential x10, concurrent 5 / 20 / 50, no gates.
    /// Fixed sizes: ignores `sequential_count` and `concurrent_batch_sizes`.
    Gradual,
    /// Paced sequential batch, concurrent 5, then concurrent 10 only if at
    /// least 3 of the 5 succeeded.
    Honest,
    /// One paced sequential batch.
    Sequential,
}

impl Plan {
    pub fn stages(&self, config: &BenchConfig) -> Vec<ScenarioStage> {
        let jitter = config.jitter_bound;
        let pacing = config.pacing_delay();
        let sequential = ScenarioStage::sequential(
            "sequential orders",
            config.sequential_count,
            pacing,
            jitter,
        );

        match self {
            Plan::Escalation => {
                let mut stages = vec![ScenarioStage::single("single order", jitter), sequential];
                for (i, &size) in config.concurrent_batch_sizes.iter().enumerate() {
                    let stage = ScenarioStage::concurrent(format!("concurrent x{size}"), size, jitter);
                    stages.push(if i == 0 {
                        stage
                    } else {
                        stage.gated(Gate::MinSuccessRatio {
                            ratio: config.escalation_min_success_ratio,
                        })
                    });
                }
                stages
            }
            Plan::Gradual => {
                let mut stages = vec![
                    ScenarioStage::single("single order", jitter),
                    ScenarioStage::sequential("sequential orders", 10, Duration::ZERO, jitter),
                ];
                stages.extend(
                    [5, 20, 50]
                        .map(|size| ScenarioStage::concurrent(format!("concurrent x{size}"), size, jitter)),
                );
                stages
            }
            Plan::Honest => vec![
                sequential,
                ScenarioStage::concurrent("concurrent x5", 5, jitter),
                ScenarioStage::concurrent("concurrent x10", 10, jitter)
                    .gated(Gate::MinSuccesses { count: 3 }),
            ],
            Plan::Sequential => vec![sequential],
        }
    }
}

/// Overall health of the service under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthRating {
    Good,
    Moderate,
    Poor,
}

impl fmt::Display for HealthRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthRating::Good => "GOOD",
            HealthRating::Moderate => "MODERATE",
            HealthRating::Poor => "POOR",
        })
    }
}

/// An executed stage: its stats, the throughput figure matching its
/// discipline, and the outcomes it produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRun {
    pub stats: AggregateStats,
    pub throughput_per_sec: Option<f64>,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Executed(StageRun),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: ScenarioStage,
    pub status: StageStatus,
}

impl StageResult {
    pub fn stats(&self) -> Option<&AggregateStats> {
        match &self.status {
            StageStatus::Executed(run) => Some(&run.stats),
            StageStatus::Skipped => None,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self.status, StageStatus::Skipped)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub run_label: String,
    pub stages: Vec<StageResult>,
    /// Stats over every executed outcome of the run.
    pub overall: AggregateStats,
    pub rating: HealthRating,
}

fn new_run_label() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_owned()
}

/// Drives a plan of stages against an [`Executor`].
#[derive(TypedBuilder)]
pub struct ScenarioRunner<E: Executor> {
    pub executor: E,
    pub stages: Vec<ScenarioStage>,
    /// Pause between two executed stages.
    #[builder(default = Duration::from_millis(DEFAULT_COOLDOWN_MS))]
    pub cooldown: Duration,
    #[builder(default)]
    pub thresholds: HealthThresholds,
    /// Prefix of every `client_id` of the run.
    #[builder(default = new_run_label(), setter(into))]
    pub run_label: String,
}

impl<E: Executor> ScenarioRunner<E> {
    pub fn from_config(executor: E, stages: Vec<ScenarioStage>, config: &BenchConfig) -> Self {
        Self {
            executor,
            stages,
            cooldown: config.cooldown(),
            thresholds: config.health,
            run_label: new_run_label(),
        }
    }

    /// Reject plans the runner cannot execute meaningfully.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(Error::InvalidPlan("no stages".into()));
        }
        for stage in &self.stages {
            if stage.batch_size == 0 {
                return Err(Error::InvalidPlan(format!(
                    "stage '{}' has a batch size of 0",
                    stage.name
                )));
            }
            if !(stage.jitter_bound.is_finite() && stage.jitter_bound >= 0.0) {
                return Err(Error::InvalidPlan(format!(
                    "stage '{}' has a jitter bound of {}",
                    stage.name, stage.jitter_bound
                )));
            }
            if let Gate::MinSuccessRatio { ratio } = stage.gate {
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(Error::InvalidPlan(format!(
                        "stage '{}' gates on a success ratio of {ratio}",
                        stage.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub async fn run(&self) -> Result<ScenarioReport> {
        self.validate()?;

        let total = self.stages.len();
        let mut results = Vec::with_capacity(total);
        let mut previous: Option<AggregateStats> = None;
        let mut executed: Vec<Outcome> = Vec::new();
        let mut executed_ms = 0u64;
        let mut any_executed = false;

        tracing::info!(run = %self.run_label, stages = total, "Starting scenario");
        for (position, stage) in self.stages.iter().enumerate() {
            let step = position + 1;

            if !stage.gate.allows(previous.as_ref()) {
                tracing::info!(
                    "Skipping stage {step}/{total} '{}': gate {} not met",
                    stage.name,
                    stage.gate
                );
                results.push(StageResult {
                    stage: stage.clone(),
                    status: StageStatus::Skipped,
                });
                previous = None;
                continue;
            }

            if any_executed && !self.cooldown.is_zero() {
                tracing::debug!(cooldown = ?self.cooldown, "Cooling down");
                tokio::time::sleep(self.cooldown).await;
            }
            any_executed = true;

            tracing::info!(
                "Running stage {step}/{total} '{}' ({}, {} orders)",
                stage.name,
                stage.discipline,
                stage.batch_size
            );
            let label = format!("{}-s{step}", self.run_label);
            let started = Instant::now();
            let outcomes = match stage.discipline {
                Discipline::Sequential { pacing_delay_ms } => {
                    self.executor
                        .run_sequential(
                            &label,
                            stage.batch_size,
                            Duration::from_millis(pacing_delay_ms),
                            stage.jitter_bound,
                        )
                        .await
                }
                Discipline::Concurrent => {
                    self.executor
                        .run_concurrent(&label, stage.batch_size, stage.jitter_bound)
                        .await
                }
            };
            let elapsed_ms = as_millis(started.elapsed());

            let stats = aggregate(&outcomes, elapsed_ms);
            let throughput_per_sec = stats.throughput(stage.discipline.throughput_kind());
            tracing::info!(
                "Finished stage {step}/{total}: {}/{} succeeded ({}) in {elapsed_ms}ms",
                stats.success_count,
                stats.sample_count,
                stats.success_percent()
            );

            executed.extend(outcomes.iter().cloned());
            executed_ms += elapsed_ms;
            previous = Some(stats.clone());
            results.push(StageResult {
                stage: stage.clone(),
                status: StageStatus::Executed(StageRun {
                    stats,
                    throughput_per_sec,
                    outcomes,
                }),
            });
        }

        let overall = aggregate(&executed, executed_ms);
        let rating = self.thresholds.classify(&overall);
        tracing::info!(
            run = %self.run_label,
            "Scenario finished: {} overall success, rated {rating}",
            overall.success_percent()
        );

        Ok(ScenarioReport {
            run_label: self.run_label.clone(),
            stages: results,
            overall,
            rating,
        })
    }
}
