//! The order-submission service as seen by the harness.
//!
//! [`OrderGateway`] is the seam between the executor and the network. The
//! production implementation is [`HttpGateway`]; tests plug in fakes.
use std::{error::Error as _, future::Future, time::Duration};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::order::Order;

/// Longest response body kept in a [`SubmitError::Status`] message.
const MAX_BODY_CHARS: usize = 200;

/// Why a single submission did not produce an order id.
///
/// The `Display` text of this error is what ends up in
/// [`crate::Outcome::error_detail`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The service could not be reached or the connection was reset.
    #[error("{0}")]
    Connect(String),

    /// Any other transport level failure.
    #[error("{0}")]
    Request(String),

    /// No terminal response arrived within the per-request bound.
    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    /// The service answered with a non-2xx status.
    #[error("request failed with status code {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        let message = describe(&e);
        if e.is_connect() {
            SubmitError::Connect(message)
        } else {
            SubmitError::Request(message)
        }
    }
}

/// Flatten an error and its sources into one line.
fn describe(e: &reqwest::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Something orders can be submitted to.
///
/// Any accepted submission is `Ok`, carrying the order id assigned by the
/// service when it returned one. Implementations should not enforce their own
/// timeout or retry; the executor bounds every call and records failures as
/// they are.
pub trait OrderGateway: Send + Sync + 'static {
    fn submit(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<Option<String>, SubmitError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OrderAck {
    order: AckedOrder,
}

#[derive(Debug, Deserialize)]
struct AckedOrder {
    order_id: Option<String>,
}

/// Order id from an acknowledgement body, if it carries one.
fn acked_order_id(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<OrderAck>(body)
        .ok()
        .and_then(|ack| ack.order.order_id)
}

/// Posts orders as JSON to `{base_url}/orders`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    orders_url: String,
}

impl HttpGateway {
    /// Build a gateway for `base_url`.
    ///
    /// With `keep_alive` off no idle connection is kept, so every request opens
    /// a fresh one.
    pub fn new(base_url: &str, keep_alive: bool) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if !keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }

        Ok(Self {
            client: builder.build()?,
            orders_url: format!("{}/orders", base_url.trim_end_matches('/')),
        })
    }

    pub fn orders_url(&self) -> &str {
        &self.orders_url
    }
}

impl OrderGateway for HttpGateway {
    async fn submit(&self, order: &Order) -> Result<Option<String>, SubmitError> {
        let response = self.client.post(&self.orders_url).json(order).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_BODY_CHARS).collect(),
            });
        }

        // Any 2xx is accepted; the body only contributes the id when it has one
        let body = response.bytes().await.unwrap_or_default();
        Ok(acked_order_id(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_url_joins_without_double_slash() {
        let gateway = HttpGateway::new("http://localhost:3000/", true).unwrap();
        assert_eq!(gateway.orders_url(), "http://localhost:3000/orders");

        let gateway = HttpGateway::new("http://localhost:3000", false).unwrap();
        assert_eq!(gateway.orders_url(), "http://localhost:3000/orders");
    }

    #[test]
    fn status_message_includes_body_when_present() {
        let err = SubmitError::Status {
            status: 503,
            body: "matching engine unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "request failed with status code 503: matching engine unavailable"
        );

        let err = SubmitError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "request failed with status code 500");
    }

    #[test]
    fn ack_reads_nested_order_id() {
        let body = br#"{"order":{"order_id":"abc","status":"accepted"},"fills":[]}"#;
        assert_eq!(acked_order_id(body), Some("abc".to_string()));
    }

    #[test]
    fn ack_without_id_yields_none() {
        assert_eq!(acked_order_id(b""), None);
        assert_eq!(acked_order_id(b"accepted"), None);
        assert_eq!(acked_order_id(br#"{"order":{}}"#), None);
        assert_eq!(acked_order_id(br#"{"status":"ok"}"#), None);
    }
}
