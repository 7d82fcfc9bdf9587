//! Executors: issuing batches of orders under a concurrency discipline
//!
//! The [`Executor`] trait is what the scenario runner drives. It has two modes:
//!
//! - **Sequential**: requests go out one at a time in index order. Request `i + 1`
//!   is only built once request `i` has a terminal outcome, and a pacing delay is
//!   slept between requests (never after the last one). Latency is measured from
//!   each request's own dispatch, so the pacing delay is never charged to it.
//! - **Concurrent**: all requests are spawned back to back and joined. One
//!   batch-start instant is taken before the first spawn and every latency is
//!   measured against it, i.e. "how long after the batch started did this order
//!   resolve". The returned outcomes keep construction order regardless of the
//!   order in which the requests completed.
//!
//! In both modes a failure (network error, non-2xx, timeout) is recorded as a
//! failed [`Outcome`] and never retried, and it has no effect on any other
//! request in the batch.
//!
//! [`OrderExecutor`] is the built-in implementation on top of an
//! [`OrderGateway`]. It applies the per-request timeout itself so that every
//! gateway gets the same bound.
mod concurrent;
mod sequential;

use std::{future::Future, sync::Arc, time::Duration};

use typed_builder::TypedBuilder;

use crate::{
    config::BenchConfig,
    gateway::{OrderGateway, SubmitError},
    metric::Outcome,
    order::{Order, OrderFactory},
};

/// Issues batches of orders and reports one [`Outcome`] per order.
///
/// `label` identifies the batch; it prefixes every `client_id` of the batch and
/// must be unique within a run.
pub trait Executor
where
    Self: Send + Sync,
{
    /// Issue `n` requests strictly one after the other.
    fn run_sequential(
        &self,
        label: &str,
        n: usize,
        pacing_delay: Duration,
        jitter_bound: f64,
    ) -> impl Future<Output = Vec<Outcome>> + Send;

    /// Issue `n` requests at once and wait for all of them.
    fn run_concurrent(
        &self,
        label: &str,
        n: usize,
        jitter_bound: f64,
    ) -> impl Future<Output = Vec<Outcome>> + Send;
}

/// [`Executor`] that submits orders built by an [`OrderFactory`] through an
/// [`OrderGateway`].
#[derive(TypedBuilder)]
pub struct OrderExecutor<G: OrderGateway> {
    pub gateway: Arc<G>,
    #[builder(default = OrderFactory::builder().build())]
    pub factory: OrderFactory,
    /// How long a single request may stay outstanding.
    #[builder(default = Duration::from_millis(crate::config::DEFAULT_REQUEST_TIMEOUT_MS))]
    pub request_timeout: Duration,
}

impl<G: OrderGateway> OrderExecutor<G> {
    pub fn from_config(gateway: G, config: &BenchConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            factory: OrderFactory::from_config(config),
            request_timeout: config.request_timeout(),
        }
    }
}

impl<G: OrderGateway> Executor for OrderExecutor<G> {
    async fn run_sequential(
        &self,
        label: &str,
        n: usize,
        pacing_delay: Duration,
        jitter_bound: f64,
    ) -> Vec<Outcome> {
        sequential::run(self, label, n, pacing_delay, jitter_bound).await
    }

    async fn run_concurrent(&self, label: &str, n: usize, jitter_bound: f64) -> Vec<Outcome> {
        concurrent::run(self, label, n, jitter_bound).await
    }
}

/// Submit one order, forcing it to a timeout failure after `timeout`.
async fn dispatch<G: OrderGateway>(
    gateway: &G,
    order: &Order,
    timeout: Duration,
) -> Result<Option<String>, SubmitError> {
    match tokio::time::timeout(timeout, gateway.submit(order)).await {
        Ok(result) => result,
        Err(_) => Err(SubmitError::Timeout(timeout)),
    }
}

fn log_outcome(label: &str, index: usize, outcome: &Outcome) {
    match outcome.error_detail() {
        None => tracing::debug!(
            batch = label,
            index,
            latency_ms = outcome.latency_ms(),
            order_id = outcome.order_id().unwrap_or_default(),
            "Order accepted"
        ),
        Some(detail) => tracing::warn!(
            batch = label,
            index,
            latency_ms = outcome.latency_ms(),
            "Order failed: {detail}"
        ),
    }
}
