use std::{fmt::Debug, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use crate::{gateway::SubmitError, macros::metric};

/// A single observation produced by one request attempt.
///
/// Metrics are the most granular data the harness collects. They are folded into
/// an [`crate::Aggregate`] and from there into [`crate::AggregateStats`].
///
/// The `#[metric]` attribute adds the required derives and the impl.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialEq + Send + Sync + Debug + Clone,
{
}

/// The terminal result of one order submission.
///
/// Created once the outcome is known (response received, error raised or timeout
/// expired) and never modified afterwards. `error_detail` is only present on
/// failure. `order_id` is only present on success, and only when the service
/// returned one.
#[metric]
pub struct Outcome {
    success: bool,
    latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl Outcome {
    pub fn success(latency: Duration, order_id: impl Into<String>) -> Self {
        Self::accepted(latency, Some(order_id.into()))
    }

    /// A success whose response may or may not have carried an order id.
    pub fn accepted(latency: Duration, order_id: Option<String>) -> Self {
        Self {
            success: true,
            latency_ms: as_millis(latency),
            order_id,
            error_detail: None,
        }
    }

    pub fn failure(latency: Duration, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            latency_ms: as_millis(latency),
            order_id: None,
            error_detail: Some(detail.into()),
        }
    }

    /// Record the result of a submission that took `latency` to resolve.
    pub fn from_result(latency: Duration, result: Result<Option<String>, SubmitError>) -> Self {
        match result {
            Ok(order_id) => Self::accepted(latency, order_id),
            Err(e) => Self::failure(latency, e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}

pub(crate) fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
