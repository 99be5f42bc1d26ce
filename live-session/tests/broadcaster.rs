use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use live_net::telemetry;
use live_session::{BroadcasterController, SessionError, SessionState};
use signaling::{SignalingClient, StartBroadcastRequest};

/// Records every lifecycle call the fake gateway receives.
#[derive(Clone, Default)]
struct GatewayCalls {
    starts: Arc<Mutex<Vec<serde_json::Value>>>,
    stops: Arc<Mutex<Vec<String>>>,
    fail_stops: bool,
}

async fn handle_start(State(calls): State<GatewayCalls>, Json(body): Json<serde_json::Value>) -> Json<serde_json::Value> {
    calls.starts.lock().unwrap().push(body);
    Json(serde_json::json!({
        "sessionId": "s1",
        "roomName": "r1",
        "token": "tok",
        "url": "ws://127.0.0.1:1"
    }))
}

async fn handle_stop(
    State(calls): State<GatewayCalls>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let stream_id = body["streamId"].as_str().unwrap_or_default().to_string();
    calls.stops.lock().unwrap().push(stream_id);
    if calls.fail_stops {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "stop backend down" })),
        )
    } else {
        (StatusCode::OK, Json(serde_json::json!({})))
    }
}

async fn spawn_gateway(calls: GatewayCalls) -> SocketAddr {
    telemetry::init("broadcaster-test");

    let app = Router::new()
        .route("/live/start", post(handle_start))
        .route("/live/stop", post(handle_stop))
        .with_state(calls);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn controller_for(addr: SocketAddr, enabled: bool) -> BroadcasterController {
    let gateway = SignalingClient::new(&format!("http://{addr}")).expect("client");
    BroadcasterController::new(gateway, enabled)
}

#[tokio::test]
async fn broadcaster_start_stop_end_to_end() {
    let calls = GatewayCalls::default();
    let addr = spawn_gateway(calls.clone()).await;
    let mut controller = controller_for(addr, true);

    controller
        .request_start(StartBroadcastRequest {
            title: Some("Live from X".into()),
            tags: None,
        })
        .await
        .expect("start");

    assert_eq!(controller.state(), SessionState::Live);
    assert_eq!(controller.session_id(), Some("s1"));
    assert_eq!(controller.session().expect("session").room_name, "r1");
    let recorded = calls.starts.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0]["title"], "Live from X");
    drop(recorded);

    controller.request_stop().await.expect("stop");
    assert_eq!(controller.state(), SessionState::Ended);
    assert!(controller.session_id().is_none());
    assert_eq!(*calls.stops.lock().unwrap(), vec!["s1".to_string()]);
}

#[tokio::test]
async fn double_start_is_a_noop() {
    let calls = GatewayCalls::default();
    let addr = spawn_gateway(calls.clone()).await;
    let mut controller = controller_for(addr, true);

    controller
        .request_start(StartBroadcastRequest::default())
        .await
        .expect("first start");
    let held = controller.session_id().map(str::to_string);

    // Rapid second tap: no second gateway call, session id unchanged.
    controller
        .request_start(StartBroadcastRequest::default())
        .await
        .expect("second start is a noop");

    assert_eq!(calls.starts.lock().unwrap().len(), 1);
    assert_eq!(controller.session_id().map(str::to_string), held);
    assert_eq!(controller.state(), SessionState::Live);
}

#[tokio::test]
async fn failed_stop_still_ends_the_session() {
    let calls = GatewayCalls {
        fail_stops: true,
        ..GatewayCalls::default()
    };
    let addr = spawn_gateway(calls.clone()).await;
    let mut controller = controller_for(addr, true);

    controller
        .request_start(StartBroadcastRequest::default())
        .await
        .expect("start");

    // Best-effort stop: the 500 from the gateway is swallowed.
    controller.request_stop().await.expect("stop never errors");
    assert_eq!(controller.state(), SessionState::Ended);
    assert!(controller.session_id().is_none());
    assert_eq!(calls.stops.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_feature_makes_zero_gateway_calls() {
    let calls = GatewayCalls::default();
    let addr = spawn_gateway(calls.clone()).await;
    let mut controller = controller_for(addr, false);

    let err = controller
        .request_start(StartBroadcastRequest::default())
        .await
        .expect_err("disabled");

    assert!(matches!(err, SessionError::FeatureDisabled));
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(calls.starts.lock().unwrap().is_empty());
    assert!(calls.stops.lock().unwrap().is_empty());
}

#[tokio::test]
async fn drop_while_live_forces_exactly_one_stop() {
    let calls = GatewayCalls::default();
    let addr = spawn_gateway(calls.clone()).await;

    {
        let mut controller = controller_for(addr, true);
        controller
            .request_start(StartBroadcastRequest::default())
            .await
            .expect("start");
        assert_eq!(controller.state(), SessionState::Live);
        // Scope exit without request_stop.
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !calls.stops.lock().unwrap().is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "forced stop never reached the gateway"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*calls.stops.lock().unwrap(), vec!["s1".to_string()]);
}

#[tokio::test]
async fn start_failure_is_acknowledged_back_to_idle() {
    telemetry::init("broadcaster-test");

    let app = Router::new().route(
        "/live/start",
        post(|| async {
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "account not eligible" })),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let mut controller = controller_for(addr, true);
    let err = controller
        .request_start(StartBroadcastRequest::default())
        .await
        .expect_err("forbidden");

    match err {
        SessionError::StartFailed(reason) => assert!(reason.contains("account not eligible")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(controller.state(), SessionState::Error);
    assert!(controller.last_error().is_some());

    // The error is not sticky.
    controller.acknowledge_error();
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.last_error().is_none());
}
