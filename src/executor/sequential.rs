use std::time::Duration;

use tokio::time::Instant;

use super::{OrderExecutor, dispatch, log_outcome};
use crate::{gateway::OrderGateway, metric::Outcome};

pub(super) async fn run<G: OrderGateway>(
    executor: &OrderExecutor<G>,
    label: &str,
    n: usize,
    pacing_delay: Duration,
    jitter_bound: f64,
) -> Vec<Outcome> {
    tracing::info!(batch = label, n, ?pacing_delay, "Starting sequential batch");
    let mut outcomes = Vec::with_capacity(n);

    for index in 0..n {
        let order = executor.factory.build_order(label, index, jitter_bound);

        let started = Instant::now();
        let result = dispatch(executor.gateway.as_ref(), &order, executor.request_timeout).await;
        let outcome = Outcome::from_result(started.elapsed(), result);

        log_outcome(label, index, &outcome);
        outcomes.push(outcome);

        // Paced after failures too; nothing follows the last request
        if index + 1 < n && !pacing_delay.is_zero() {
            tokio::time::sleep(pacing_delay).await;
        }
    }

    tracing::info!(batch = label, "Sequential batch finished");
    outcomes
}
