//! 통합 테스트용 메모리 내 커넥터.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use perp_core::{FeedConfig, ThrottleConfig};
use perp_stream::{
    Connector, FeedError, FeedEvent, FeedResult, MarketHub, OutboundFrame, Transport,
    TransportEvent,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// 허브가 연결할 때마다 [`MockServer`]를 하나 만들어 보관합니다.
#[derive(Default)]
pub struct MockConnector {
    connects: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
    fail: AtomicBool,
    error: Mutex<Option<FeedError>>,
    delay: Mutex<Option<Duration>>,
    servers: Mutex<VecDeque<MockServer>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 이후 모든 연결 시도가 이 에러로 실패합니다.
    pub fn fail_with(&self, error: FeedError) {
        *self.error.lock() = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// 가장 오래된 미수령 서버를 꺼냅니다.
    pub fn take_server(&self) -> MockServer {
        self.servers
            .lock()
            .pop_front()
            .expect("no connection was opened")
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &str) -> FeedResult<Transport> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(Instant::now());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let error = self.error.lock().clone();
        if let Some(error) = error {
            return Err(error);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::ConnectionFailed("connection refused".into()));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        self.servers.lock().push_back(MockServer {
            outbound: out_rx,
            inbound: in_tx,
        });
        Ok(Transport {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// 허브 반대편 소켓.
pub struct MockServer {
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
}

impl MockServer {
    /// 지금까지 허브가 보낸 프레임. 텍스트는 JSON으로, 종료 프레임은
    /// `{"close": code}`로 돌려줍니다.
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(match frame {
                OutboundFrame::Text(text) => serde_json::from_str(&text).unwrap(),
                OutboundFrame::Close { code, .. } => json!({ "close": code }),
            });
        }
        frames
    }

    /// ping과 post를 뺀 구독/해제 프레임만.
    pub fn drain_subscriptions(&mut self) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|f| matches!(f["method"].as_str(), Some("subscribe" | "unsubscribe")))
            .collect()
    }

    /// post 요청 프레임만.
    pub fn drain_posts(&mut self) -> Vec<Value> {
        self.drain()
            .into_iter()
            .filter(|f| f["method"] == "post")
            .collect()
    }

    pub fn push(&self, message: Value) {
        let _ = self
            .inbound
            .send(TransportEvent::Text(message.to_string()));
    }

    pub fn close(&self, code: Option<u16>) {
        let _ = self.inbound.send(TransportEvent::Closed {
            code,
            reason: "test".into(),
        });
    }

    pub fn respond(&self, id: u64, payload: Value) {
        self.push(json!({
            "channel": "post",
            "data": {"id": id, "response": {"type": "info", "payload": payload}}
        }));
    }
}

pub fn test_config() -> FeedConfig {
    FeedConfig::default()
}

pub fn unthrottled_config() -> FeedConfig {
    FeedConfig {
        throttle: ThrottleConfig::disabled(),
        ..FeedConfig::default()
    }
}

pub fn hub_with(config: FeedConfig) -> (MarketHub, Arc<MockConnector>) {
    let connector = MockConnector::new();
    let hub = MarketHub::with_connector(config, connector.clone());
    (hub, connector)
}

/// 생성된 태스크가 큐에 쌓인 메시지를 처리할 기회를 줍니다.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// 이벤트를 모으는 리스너.
pub fn collector() -> (
    impl Fn(&FeedEvent) + Send + Sync + 'static,
    Arc<Mutex<Vec<FeedEvent>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (move |event: &FeedEvent| sink.lock().push(event.clone()), seen)
}

pub fn meta_and_asset_ctxs() -> Value {
    json!([
        {"universe": [
            {"name": "BTC", "szDecimals": 5, "maxLeverage": 40},
            {"name": "ETH", "szDecimals": 4, "maxLeverage": 25}
        ]},
        [
            {"funding": "0.0000125", "openInterest": "100.5", "oraclePx": "65000.0",
             "markPx": "65010.0", "dayNtlVlm": "1000000.0", "prevDayPx": "64000.0",
             "midPx": "65005.5", "premium": "0.0001"},
            {"funding": "-0.00001", "openInterest": "2000", "oraclePx": "3200.1",
             "markPx": "3201.0", "dayNtlVlm": "500000.0", "prevDayPx": "3100.0"}
        ]
    ])
}

pub fn l2_book(coin: &str, time: i64) -> Value {
    json!({
        "channel": "l2Book",
        "data": {
            "coin": coin,
            "time": time,
            "levels": [
                [{"px": "100.0", "sz": "1.5", "n": 2}, {"px": "99.5", "sz": "2", "n": 1}],
                [{"px": "100.5", "sz": "0.5", "n": 1}]
            ]
        }
    })
}
