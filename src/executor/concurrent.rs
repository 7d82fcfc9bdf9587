use std::sync::Arc;

use futures::future::join_all;
use tokio::{task::JoinHandle, time::Instant};

use super::{OrderExecutor, dispatch, log_outcome};
use crate::{gateway::OrderGateway, metric::Outcome};

pub(super) async fn run<G: OrderGateway>(
    executor: &OrderExecutor<G>,
    label: &str,
    n: usize,
    jitter_bound: f64,
) -> Vec<Outcome> {
    tracing::info!(batch = label, n, "Spawning concurrent batch");

    // Shared anchor for every latency in the batch
    let batch_start = Instant::now();

    let handles: Vec<JoinHandle<Outcome>> = (0..n)
        .map(|index| {
            let order = executor.factory.build_order(label, index, jitter_bound);
            let gateway = Arc::clone(&executor.gateway);
            let timeout = executor.request_timeout;
            tokio::spawn(async move {
                let result = dispatch(gateway.as_ref(), &order, timeout).await;
                Outcome::from_result(batch_start.elapsed(), result)
            })
        })
        .collect();

    // join_all keeps the handles' order, so outcomes stay index aligned
    let outcomes: Vec<Outcome> = join_all(handles)
        .await
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(batch = label, index, "Request task panicked: {e}");
                Outcome::failure(batch_start.elapsed(), format!("request task failed: {e}"))
            }
        })
        .collect();

    for (index, outcome) in outcomes.iter().enumerate() {
        log_outcome(label, index, outcome);
    }
    tracing::info!(
        batch = label,
        elapsed_ms = batch_start.elapsed().as_millis() as u64,
        "Concurrent batch finished"
    );
    outcomes
}
