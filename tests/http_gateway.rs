use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use orderload::{Executor, HttpGateway, OrderExecutor, OrderFactory, OrderGateway, SubmitError};
use serde_json::{Value, json};
use tokio::net::TcpListener;

#[derive(Clone, Copy)]
enum Behavior {
    Accept,
    Fail,
    MissingId,
    NoContent,
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn create_order(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.received.lock().unwrap().push(body.clone());
    match state.behavior {
        Behavior::Accept => {
            let id = format!("srv-{}", body["client_id"].as_str().unwrap_or("?"));
            (StatusCode::CREATED, Json(json!({ "order": { "order_id": id } }))).into_response()
        }
        Behavior::Fail => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "matching engine unavailable" })),
        )
            .into_response(),
        Behavior::MissingId => (StatusCode::OK, Json(json!({ "order": {} }))).into_response(),
        Behavior::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn spawn_mock(behavior: Behavior) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        behavior,
        received: Arc::clone(&received),
    };
    let app = Router::new()
        .route("/orders", post(create_order))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

fn gateway(addr: SocketAddr) -> HttpGateway {
    HttpGateway::new(&format!("http://{addr}/"), true).unwrap()
}

#[tokio::test]
async fn accepted_order_returns_service_id() {
    let (addr, received) = spawn_mock(Behavior::Accept).await;
    let gateway = gateway(addr);
    let order = OrderFactory::builder().build().build_order("it", 0, 50.0);

    let id = gateway.submit(&order).await.unwrap();
    assert_eq!(id.as_deref(), Some("srv-it-0"));

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["client_id"], "it-0");
    assert_eq!(body["instrument"], "BTC-USD");
    assert_eq!(body["side"], "buy");
    assert_eq!(body["type"], "limit");
    assert_eq!(body["quantity"], 0.01);
    let price = body["price"].as_f64().unwrap();
    assert!((69_950.0..=70_050.0).contains(&price));
}

#[tokio::test]
async fn non_success_status_is_a_failure() {
    let (addr, _) = spawn_mock(Behavior::Fail).await;
    let order = OrderFactory::builder().build().build_order("it", 1, 0.0);

    let err = gateway(addr).submit(&order).await.unwrap_err();
    assert!(matches!(err, SubmitError::Status { status: 500, .. }));
    assert!(
        err.to_string()
            .starts_with("request failed with status code 500")
    );
    assert!(err.to_string().contains("matching engine unavailable"));
}

#[tokio::test]
async fn success_without_order_id_is_still_accepted() {
    let (addr, _) = spawn_mock(Behavior::MissingId).await;
    let order = OrderFactory::builder().build().build_order("it", 2, 0.0);

    let id = gateway(addr).submit(&order).await.unwrap();
    assert_eq!(id, None);
}

#[tokio::test]
async fn no_content_counts_as_success() {
    let (addr, received) = spawn_mock(Behavior::NoContent).await;
    let executor = OrderExecutor::builder()
        .gateway(Arc::new(gateway(addr)))
        .build();

    let outcomes = executor.run_concurrent("empty", 2, 0.0).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));
    assert!(outcomes.iter().all(|o| o.order_id().is_none()));
    assert!(outcomes.iter().all(|o| o.error_detail().is_none()));
    assert_eq!(received.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_service_is_a_failure() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let order = OrderFactory::builder().build().build_order("it", 3, 0.0);
    let err = gateway(addr).submit(&order).await.unwrap_err();
    assert!(matches!(err, SubmitError::Connect(_) | SubmitError::Request(_)));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn executor_runs_both_disciplines_against_live_service() {
    let (addr, received) = spawn_mock(Behavior::Accept).await;
    let executor = OrderExecutor::builder()
        .gateway(Arc::new(gateway(addr)))
        .request_timeout(Duration::from_secs(5))
        .build();

    let sequential = executor
        .run_sequential("seq", 3, Duration::from_millis(10), 50.0)
        .await;
    let concurrent = executor.run_concurrent("conc", 5, 50.0).await;

    assert_eq!(sequential.len(), 3);
    assert_eq!(concurrent.len(), 5);
    assert!(sequential.iter().chain(&concurrent).all(|o| o.is_success()));
    for (i, outcome) in concurrent.iter().enumerate() {
        assert_eq!(outcome.order_id(), Some(format!("srv-conc-{i}").as_str()));
    }

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 8);
    let seq_ids: Vec<&str> = bodies[..3]
        .iter()
        .map(|b| b["client_id"].as_str().unwrap())
        .collect();
    assert_eq!(seq_ids, vec!["seq-0", "seq-1", "seq-2"]);
}

#[tokio::test]
async fn failed_requests_are_recorded_not_retried() {
    let (addr, received) = spawn_mock(Behavior::Fail).await;
    let executor = OrderExecutor::builder()
        .gateway(Arc::new(gateway(addr)))
        .build();

    let outcomes = executor.run_concurrent("conc", 4, 0.0).await;

    assert!(outcomes.iter().all(|o| !o.is_success()));
    assert!(outcomes.iter().all(|o| o.order_id().is_none()));
    assert_eq!(received.lock().unwrap().len(), 4);
}
