//! 연결 수명 주기 통합 테스트.

mod common;

use std::time::Duration;

use common::{collector, hub_with, settle, test_config};
use perp_stream::{Channel, ConnectionState, FeedError, FeedEvent};
use serde_json::json;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn concurrent_connects_open_one_socket() {
    let (hub, connector) = hub_with(test_config());
    connector.set_delay(Duration::from_millis(50));

    let (a, b, c) = tokio::join!(hub.connect(None), hub.connect(None), hub.connect(None));
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(connector.connect_count(), 1);
    assert_eq!(hub.connection_state(), ConnectionState::Connected);

    hub.connect(None).await.unwrap();
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_subscribes_default_feeds_and_requests_metadata() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    settle().await;

    let mut server = connector.take_server();
    let frames = server.drain();

    assert!(frames.contains(&json!({"method": "subscribe", "subscription": {"type": "allMids"}})));
    assert!(frames.contains(&json!({
        "method": "subscribe",
        "subscription": {"type": "webData2", "user": "0x0000000000000000000000000000000000000000"}
    })));
    let post = frames
        .iter()
        .find(|f| f["method"] == "post")
        .expect("bootstrap request");
    assert_eq!(post["request"]["type"], "info");
    assert_eq!(post["request"]["payload"]["type"], "metaAndAssetCtxs");
    assert!(hub.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn reconnect_follows_backoff_schedule_then_fails() {
    let (hub, connector) = hub_with(test_config());
    let (listener, statuses) = collector();
    hub.subscribe(Channel::Connection, listener).unwrap();

    hub.connect(None).await.unwrap();
    let server = connector.take_server();

    connector.set_fail(true);
    let closed_at = Instant::now();
    server.close(Some(1006));
    settle().await;
    assert_eq!(hub.connection_state(), ConnectionState::Reconnecting);

    tokio::time::sleep(Duration::from_secs(200)).await;

    let attempts = connector.attempt_times();
    assert_eq!(attempts.len(), 11, "initial connect plus 10 retries");

    let mut previous = closed_at;
    let mut delays = Vec::new();
    for at in &attempts[1..] {
        delays.push((*at - previous).as_millis() as u64);
        previous = *at;
    }
    assert_eq!(
        delays,
        vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000, 30000, 30000]
    );

    assert_eq!(hub.connection_state(), ConnectionState::Failed);
    let last = statuses.lock().last().cloned();
    match last {
        Some(FeedEvent::Connection(status)) => {
            assert_eq!(status.state, ConnectionState::Failed);
            assert!(status.last_error.is_some());
        }
        other => panic!("expected connection status, got {:?}", other),
    }

    // 실패 이후에는 더 이상 시도하지 않음
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.connect_count(), 11);
}

#[tokio::test(start_paused = true)]
async fn reconnect_replays_subscriptions() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    hub.subscribe(Channel::trades("BTC"), |_: &FeedEvent| {})
        .unwrap();
    let server = connector.take_server();

    server.close(None);
    settle().await;
    tokio::time::sleep(Duration::from_millis(1001)).await;

    assert_eq!(connector.connect_count(), 2);
    assert_eq!(hub.connection_state(), ConnectionState::Connected);
    assert_eq!(hub.connection_status().attempts, 0);

    let mut replacement = connector.take_server();
    let frames = replacement.drain_subscriptions();
    assert!(frames.contains(&json!({
        "method": "subscribe",
        "subscription": {"type": "trades", "coin": "BTC"}
    })));
    assert!(frames.contains(&json!({"method": "subscribe", "subscription": {"type": "allMids"}})));
    assert!(frames.iter().all(|f| f["method"] == "subscribe"));
}

#[tokio::test(start_paused = true)]
async fn initial_failure_returns_error_and_schedules_retry() {
    let (hub, connector) = hub_with(test_config());
    connector.set_fail(true);

    let result = hub.connect(None).await;
    assert!(matches!(result, Err(FeedError::ConnectionFailed(_))));
    assert_eq!(hub.connection_state(), ConnectionState::Reconnecting);
    assert_eq!(hub.connection_status().next_retry_ms, Some(1000));

    connector.set_fail(false);
    tokio::time::sleep(Duration::from_millis(1001)).await;
    assert_eq!(connector.connect_count(), 2);
    assert!(hub.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn invalid_url_fails_without_retry() {
    let (hub, connector) = hub_with(test_config());
    let (listener, seen) = collector();
    hub.subscribe(Channel::Connection, listener).unwrap();
    connector.fail_with(FeedError::InvalidUrl("not a websocket url".into()));

    let result = hub.connect(None).await;
    assert!(matches!(result, Err(FeedError::InvalidUrl(_))));
    assert_eq!(hub.connection_state(), ConnectionState::Failed);
    assert_eq!(hub.connection_status().next_retry_ms, None);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.connect_count(), 1);

    let last = seen.lock().last().cloned();
    assert!(matches!(
        last,
        Some(FeedEvent::Connection(status)) if status.state == ConnectionState::Failed
    ));
}

#[tokio::test(start_paused = true)]
async fn no_reconnect_after_manual_disconnect() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let server = connector.take_server();

    server.close(Some(1006));
    settle().await;
    assert_eq!(hub.connection_state(), ConnectionState::Reconnecting);

    hub.disconnect();
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(connector.connect_count(), 1);
    assert_eq!(hub.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn disconnect_unsubscribes_everything_and_closes_normally() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let (listener, seen) = collector();
    hub.subscribe(Channel::trades("BTC"), listener).unwrap();
    settle().await;

    let mut server = connector.take_server();
    server.drain();

    hub.disconnect();
    let frames = server.drain();
    let (close, unsubscribes) = frames.split_last().unwrap();

    assert_eq!(close, &json!({"close": 1000}));
    assert_eq!(unsubscribes.len(), 3);
    assert!(unsubscribes.iter().all(|f| f["method"] == "unsubscribe"));
    assert!(hub.subscriptions().is_empty());
    assert_eq!(hub.listener_count(&Channel::trades("BTC")), 0);

    // 이후 도착한 메시지는 전달되지 않음
    server.push(json!({"channel": "trades", "data": [
        {"coin": "BTC", "side": "B", "px": "1", "sz": "1", "time": 1, "tid": 1}
    ]}));
    settle().await;
    assert!(seen.lock().is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.connect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn server_normal_close_does_not_reconnect() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let server = connector.take_server();

    server.close(Some(1000));
    settle().await;
    assert_eq!(hub.connection_state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.connect_count(), 1);

    // 다시 connect 하면 새 소켓
    hub.connect(None).await.unwrap();
    assert_eq!(connector.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_while_connected() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let mut server = connector.take_server();
    server.drain();

    tokio::time::sleep(Duration::from_secs(101)).await;
    let pings = server
        .drain()
        .into_iter()
        .filter(|f| f == &json!({"method": "ping"}))
        .count();
    assert_eq!(pings, 2);

    server.push(json!({"channel": "pong"}));
    settle().await;
    assert!(hub.is_healthy());
}
