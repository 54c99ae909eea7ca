//! 요청/응답 브리지와 메타데이터 부트스트랩 통합 테스트.

mod common;

use std::time::Duration;

use common::{collector, hub_with, meta_and_asset_ctxs, settle, test_config};
use perp_core::SnapshotSource;
use perp_stream::{Channel, FeedError, FeedEvent, InfoRequest};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn responses_are_matched_by_id() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    settle().await;
    let mut server = connector.take_server();
    let bootstrap = server.drain_posts();
    assert_eq!(bootstrap.len(), 1);

    let first = tokio::spawn({
        let hub = hub.clone();
        async move {
            hub.request(json!({"type": "info", "payload": {"type": "openOrders", "user": "0x0000000000000000000000000000000000000000"}}))
                .await
        }
    });
    let second = tokio::spawn({
        let hub = hub.clone();
        async move { hub.request_info(InfoRequest::AllMids).await }
    });
    settle().await;

    let posts = server.drain_posts();
    assert_eq!(posts.len(), 2);
    let bootstrap_id = bootstrap[0]["id"].as_u64().unwrap();
    assert!(posts.iter().all(|p| p["id"].as_u64().unwrap() > bootstrap_id));

    // 요청 종류를 그대로 돌려주되 역순으로 응답
    for post in posts.iter().rev() {
        let id = post["id"].as_u64().unwrap();
        server.respond(id, post["request"]["payload"]["type"].clone());
    }
    settle().await;

    assert_eq!(first.await.unwrap().unwrap(), json!("openOrders"));
    assert_eq!(second.await.unwrap().unwrap(), json!("allMids"));
}

#[tokio::test(start_paused = true)]
async fn error_response_becomes_api_error() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let mut server = connector.take_server();
    server.drain();

    let pending = tokio::spawn({
        let hub = hub.clone();
        async move { hub.request(json!({"type": "info", "payload": {"type": "bogus"}})).await }
    });
    settle().await;

    let id = server.drain_posts()[0]["id"].as_u64().unwrap();
    server.push(json!({
        "channel": "post",
        "data": {"id": id, "response": {"type": "error", "payload": "unknown request"}}
    }));
    settle().await;

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(FeedError::Api(msg)) if msg == "unknown request"));
}

#[tokio::test(start_paused = true)]
async fn request_without_connection_fails_immediately() {
    let (hub, _connector) = hub_with(test_config());
    let result = hub.request(json!({"type": "info"})).await;
    assert!(matches!(result, Err(FeedError::NotConnected)));
}

#[tokio::test(start_paused = true)]
async fn request_times_out() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let _server = connector.take_server();

    let pending = tokio::spawn({
        let hub = hub.clone();
        async move { hub.request(json!({"type": "info"})).await }
    });
    settle().await;

    tokio::time::sleep(Duration::from_millis(10_001)).await;
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(FeedError::Timeout(_))));
    assert!(hub.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn disconnect_fails_in_flight_requests() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let _server = connector.take_server();

    let pending = tokio::spawn({
        let hub = hub.clone();
        async move { hub.request(json!({"type": "info"})).await }
    });
    settle().await;

    hub.disconnect();
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(FeedError::Disconnected)));
}

#[tokio::test(start_paused = true)]
async fn connection_loss_fails_in_flight_requests() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    let server = connector.take_server();

    let pending = tokio::spawn({
        let hub = hub.clone();
        async move { hub.request(json!({"type": "info"})).await }
    });
    settle().await;

    server.close(Some(1006));
    settle().await;
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(FeedError::Disconnected)));
}

#[tokio::test(start_paused = true)]
async fn bootstrap_response_initializes_metadata() {
    let (hub, connector) = hub_with(test_config());
    let (listener, seen) = collector();
    hub.subscribe(Channel::Metadata, listener).unwrap();

    hub.connect(None).await.unwrap();
    settle().await;
    assert!(hub.is_healthy());
    assert!(!hub.is_fully_initialized());

    let waiter = tokio::spawn({
        let hub = hub.clone();
        async move { hub.wait_until_initialized(Duration::from_secs(5)).await }
    });

    let mut server = connector.take_server();
    let id = server.drain_posts()[0]["id"].as_u64().unwrap();
    server.respond(id, json!({"type": "metaAndAssetCtxs", "data": meta_and_asset_ctxs()}));
    settle().await;

    waiter.await.unwrap().unwrap();
    assert!(hub.is_fully_initialized());

    let snapshot = hub.market_snapshot().unwrap();
    assert_eq!(snapshot.source, SnapshotSource::Bootstrap);
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.market("ETH").map(|m| m.asset_id), Some(1));
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn most_recent_metadata_source_wins() {
    let (hub, connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();
    settle().await;
    let mut server = connector.take_server();
    let id = server.drain_posts()[0]["id"].as_u64().unwrap();

    server.respond(id, meta_and_asset_ctxs());
    settle().await;
    assert_eq!(hub.market_snapshot().unwrap().source, SnapshotSource::Bootstrap);

    server.push(json!({
        "channel": "webData2",
        "data": {
            "user": "0x0000000000000000000000000000000000000000",
            "meta": {"universe": [{"name": "BTC", "szDecimals": 5, "maxLeverage": 40}]},
            "assetCtxs": [{"funding": "0", "openInterest": "1", "oraclePx": "65100",
                "markPx": "65100", "dayNtlVlm": "0", "prevDayPx": "64000"}]
        }
    }));
    settle().await;

    let snapshot = hub.market_snapshot().unwrap();
    assert_eq!(snapshot.source, SnapshotSource::AccountFeed);
    assert_eq!(snapshot.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_until_initialized_times_out() {
    let (hub, _connector) = hub_with(test_config());
    hub.connect(None).await.unwrap();

    let result = hub.wait_until_initialized(Duration::from_millis(500)).await;
    assert!(matches!(
        result,
        Err(FeedError::InitializationTimeout(timeout)) if timeout == Duration::from_millis(500)
    ));
}

#[tokio::test(start_paused = true)]
async fn disconnect_clears_metadata() {
    let (hub, connector) = hub_with(test_config());
    hub.subscribe(Channel::Metadata, |_: &FeedEvent| {}).unwrap();
    hub.connect(None).await.unwrap();
    settle().await;
    let mut server = connector.take_server();
    let id = server.drain_posts()[0]["id"].as_u64().unwrap();
    server.respond(id, meta_and_asset_ctxs());
    settle().await;
    assert!(hub.market_snapshot().is_some());

    hub.disconnect();
    assert!(hub.market_snapshot().is_none());
    assert!(!hub.is_fully_initialized());
    assert_eq!(hub.listener_count(&Channel::Metadata), 0);
}
