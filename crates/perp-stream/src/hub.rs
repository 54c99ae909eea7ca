//! 소비자용 허브 파사드.
//!
//! [`MarketHub`]는 하나의 WebSocket 연결을 여러 논리 채널로 다중화합니다.
//! 한 번 만들어 복제해 전달하는 명시적 컨텍스트 객체입니다.
//!
//! # 구성
//!
//! ```text
//!   Connector ──> reader task ──> router ──┬──> Broadcaster ──> listeners
//!                                          ├──> RequestBridge ──> request()
//!                                          └──> SubscriptionRegistry (ack)
//!
//!   subscribe/unsubscribe ──> SubscriptionRegistry ──> WireAction ──> outbound
//! ```
//!
//! 공유 상태는 짧은 `parking_lot::Mutex` 임계 구역에서만 변경하며, 락을 쥔 채
//! `.await` 하거나 리스너를 호출하지 않습니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use perp_core::FeedConfig;
//! use perp_stream::{Channel, FeedEvent, MarketHub};
//!
//! let hub = MarketHub::new(FeedConfig::default());
//! hub.connect(None).await?;
//!
//! let id = hub.subscribe(Channel::trades("BTC"), |event: &FeedEvent| {
//!     println!("{:?}", event);
//! })?;
//! hub.unsubscribe(&Channel::trades("BTC"), id);
//! hub.disconnect();
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use perp_core::{Address, BookParams, CandleInterval, FeedConfig, MarketSnapshot, SnapshotSource};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::broadcaster::{Broadcaster, ListenerId};
use crate::channel::Channel;
use crate::connection::{
    ConnectionMachine, ConnectionState, ConnectionStatus, Connector, LossOutcome, OutboundFrame,
    Transport, TransportEvent, TungsteniteConnector, NORMAL_CLOSURE,
};
use crate::debounce::Debouncer;
use crate::error::{FeedError, FeedResult};
use crate::event::FeedEvent;
use crate::metadata::{parse_meta_and_asset_ctxs, MetadataStore};
use crate::registry::{SubscriptionRecord, SubscriptionRegistry, WireAction};
use crate::request::RequestBridge;
use crate::router::{self, Routed};
use crate::session::WalletSession;
use crate::wire::{InfoRequest, OutboundMessage};

/// 실시간 시세 허브 핸들.
#[derive(Clone)]
pub struct MarketHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    config: FeedConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<HubState>,
    broadcaster: Broadcaster,
    debouncer: Debouncer,
    requests: RequestBridge,
    metadata: MetadataStore,
}

struct HubState {
    machine: ConnectionMachine,
    outbound: Option<UnboundedSender<OutboundFrame>>,
    registry: SubscriptionRegistry,
    session: WalletSession,
    reconnect_timer: Option<AbortHandle>,
    reader: Option<AbortHandle>,
    heartbeat: Option<AbortHandle>,
    bootstrap: Option<AbortHandle>,
    last_error: Option<String>,
}

impl HubState {
    /// 연결되어 있으면 액션을 전송합니다. 연결이 없으면 레지스트리만 갱신된 상태로
    /// 남고 다음 연결 시 재생됩니다.
    fn send_actions(&self, actions: &[WireAction]) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        for action in actions {
            let Some(message) = action.to_message() else {
                continue;
            };
            match message.to_json() {
                Ok(text) => {
                    trace!(channel = %action.channel(), subscribe = action.is_subscribe(), "wire action");
                    if outbound.send(OutboundFrame::Text(text)).is_err() {
                        debug!("전송 채널이 닫힘, 나머지 액션 생략");
                        return;
                    }
                }
                Err(e) => warn!(channel = %action.channel(), error = %e, "구독 메시지 직렬화 실패"),
            }
        }
    }

    fn status(&self) -> ConnectionStatus {
        self.machine.status(self.last_error.clone())
    }

    fn is_healthy(&self) -> bool {
        self.machine.state() == ConnectionState::Connected
            && self.outbound.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    fn abort_tasks(&mut self) {
        for handle in [
            self.reconnect_timer.take(),
            self.reader.take(),
            self.heartbeat.take(),
            self.bootstrap.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }

    /// 세션을 교체하고 기본 피드 변경 액션을 반환합니다. 해제가 구독보다 먼저입니다.
    ///
    /// 이전 사용자 피드는 리스너가 있어도 제거됩니다. 그 리스너는 새 사용자의 같은
    /// 종류 채널로 옮겨지고, 대응하는 채널이 없으면 제거됩니다.
    fn switch_session(
        &mut self,
        address: Option<Address>,
        broadcaster: &Broadcaster,
    ) -> SessionChange {
        let Some(switch) = self.session.switch(address) else {
            return SessionChange::default();
        };

        let mut change = SessionChange::default();
        let mut moved = Vec::new();
        for channel in &switch.removed {
            change.actions.extend(self.registry.remove(channel));
            match switch.successor(channel) {
                Some(next) => {
                    let count = broadcaster.move_listeners(channel, next.clone());
                    if count > 0 {
                        moved.push((next.clone(), count));
                    }
                }
                None => change.dropped_listeners += broadcaster.remove_channel(channel),
            }
        }
        for channel in &switch.added {
            change.actions.extend(self.registry.pin(channel, None));
        }
        for (channel, count) in moved {
            self.registry.add_listeners(&channel, count);
            change.moved_listeners += count;
        }
        change
    }
}

/// 지갑 교체 결과.
#[derive(Debug, Default)]
struct SessionChange {
    actions: Vec<WireAction>,
    moved_listeners: usize,
    dropped_listeners: usize,
}

impl MarketHub {
    /// tokio-tungstenite 커넥터로 허브를 생성합니다.
    pub fn new(config: FeedConfig) -> Self {
        let connector = Arc::new(TungsteniteConnector::new(config.connect_timeout()));
        Self::with_connector(config, connector)
    }

    /// 커넥터를 지정해 허브를 생성합니다.
    pub fn with_connector(config: FeedConfig, connector: Arc<dyn Connector>) -> Self {
        let state = HubState {
            machine: ConnectionMachine::new(config.reconnect.clone()),
            outbound: None,
            registry: SubscriptionRegistry::new(),
            session: WalletSession::default(),
            reconnect_timer: None,
            reader: None,
            heartbeat: None,
            bootstrap: None,
            last_error: None,
        };

        Self {
            inner: Arc::new(HubInner {
                broadcaster: Broadcaster::new(config.throttle.clone()),
                debouncer: Debouncer::new(config.debounce_window()),
                requests: RequestBridge::new(),
                metadata: MetadataStore::new(),
                state: Mutex::new(state),
                connector,
                config,
            }),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    // ========================================================================
    // 연결 관리
    // ========================================================================

    /// 연결을 엽니다.
    ///
    /// 이미 연결 중이거나 연결되어 있으면 아무것도 하지 않습니다. 첫 시도가
    /// 실패하면 에러를 반환하고 재연결 스케줄이 시작됩니다.
    pub async fn connect(&self, user: Option<Address>) -> FeedResult<()> {
        let generation = {
            let mut state = self.inner.state.lock();
            let Some(generation) = state.machine.begin_connect() else {
                debug!(state = %state.machine.state(), "이미 연결 시도 중, connect 무시");
                return Ok(());
            };
            let change = state.switch_session(user, &self.inner.broadcaster);
            state.send_actions(&change.actions);
            state.last_error = None;
            generation
        };

        info!(url = %self.inner.config.ws_url, "연결 시작");
        self.inner.publish_status();
        self.inner.open_transport(generation).await
    }

    /// 연결을 종료합니다.
    ///
    /// 모든 와이어 구독을 해제하고 정상 종료 프레임을 보낸 뒤 레지스트리, 리스너,
    /// 디바운스 마커, 메타데이터를 비웁니다. 재연결은 일어나지 않습니다.
    pub fn disconnect(&self) {
        let status = {
            let mut state = self.inner.state.lock();
            state.abort_tasks();

            let actions = state.registry.drain();
            state.send_actions(&actions);
            if let Some(outbound) = state.outbound.take() {
                let _ = outbound.send(OutboundFrame::Close {
                    code: NORMAL_CLOSURE,
                    reason: "client disconnect".to_string(),
                });
            }

            state.machine.reset();
            state.last_error = None;
            state.status()
        };

        let failed = self.inner.requests.fail_all();
        self.inner.debouncer.clear();
        self.inner.metadata.clear();
        self.inner
            .broadcaster
            .publish(Channel::Connection, FeedEvent::Connection(status));
        self.inner.broadcaster.clear();
        info!(failed_requests = failed, "연결 종료");
    }

    /// 연결되어 있고 전송 채널이 살아 있는지 확인.
    pub fn is_healthy(&self) -> bool {
        self.inner.state.lock().is_healthy()
    }

    /// 연결되어 있고 마켓 스냅샷을 받았는지 확인.
    pub fn is_fully_initialized(&self) -> bool {
        self.is_healthy() && self.inner.metadata.is_loaded()
    }

    /// 완전히 초기화될 때까지 대기합니다.
    pub async fn wait_until_initialized(&self, timeout: Duration) -> FeedResult<()> {
        let deadline = Instant::now() + timeout;
        let poll = self.inner.config.init_poll_interval();

        loop {
            if self.is_fully_initialized() {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(FeedError::InitializationTimeout(timeout));
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.state.lock().status()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().machine.state()
    }

    // ========================================================================
    // 구독
    // ========================================================================

    /// 채널에 리스너를 등록합니다. 첫 리스너면 와이어 구독을 보냅니다.
    pub fn subscribe<F>(&self, channel: Channel, listener: F) -> FeedResult<ListenerId>
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe_with_params(channel, None, listener)
    }

    /// 호가 파라미터와 함께 리스너를 등록합니다.
    ///
    /// 기존 호가 구독과 파라미터가 다르면 이전 구독을 해제한 뒤 새 파라미터로
    /// 다시 구독합니다. `None`이면 기존 파라미터를 그대로 씁니다.
    pub fn subscribe_with_params<F>(
        &self,
        channel: Channel,
        params: Option<BookParams>,
        listener: F,
    ) -> FeedResult<ListenerId>
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        if let Some(params) = params {
            if !channel.supports_params() {
                return Err(FeedError::InvalidChannel(format!(
                    "{} does not accept book parameters",
                    channel
                )));
            }
            params.validate()?;
        }

        let id = self
            .inner
            .broadcaster
            .add_listener(channel.clone(), Arc::new(listener));

        let mut state = self.inner.state.lock();
        let actions = state.registry.acquire(&channel, params);
        state.send_actions(&actions);
        debug!(%channel, listener = %id, "리스너 등록");
        Ok(id)
    }

    /// 리스너를 제거합니다. 채널의 마지막 사용자였다면 와이어 구독을 해제합니다.
    pub fn unsubscribe(&self, channel: &Channel, id: ListenerId) -> bool {
        if !self.inner.broadcaster.remove_listener(channel, id) {
            return false;
        }

        let mut state = self.inner.state.lock();
        let actions = state.registry.release(channel);
        state.send_actions(&actions);
        debug!(%channel, listener = %id, "리스너 제거");
        true
    }

    /// 캔들 채널 구독.
    pub fn subscribe_to_candle<F>(
        &self,
        coin: impl Into<String>,
        interval: CandleInterval,
        listener: F,
    ) -> FeedResult<ListenerId>
    where
        F: Fn(&FeedEvent) + Send + Sync + 'static,
    {
        self.subscribe(Channel::candle(coin, interval), listener)
    }

    /// 심볼 단위 구독 (호가창, 체결, 자산 컨텍스트).
    ///
    /// 같은 (코인, 파라미터) 요청이 디바운스 창 안에서 반복되면 `Ok(false)`.
    pub fn subscribe_to_symbol(&self, coin: &str, params: Option<BookParams>) -> FeedResult<bool> {
        let key = params.unwrap_or_default();
        key.validate()?;

        let _span = perp_core::feed_span!("subscribe_to_symbol", "symbol", coin).entered();
        if !self.inner.debouncer.try_begin(coin, key) {
            debug!(params = %key, "디바운스 창 안의 중복 요청 무시");
            return Ok(false);
        }

        let mut state = self.inner.state.lock();
        let mut actions = state.registry.pin(&Channel::order_book(coin), Some(key));
        actions.extend(state.registry.pin(&Channel::trades(coin), None));
        actions.extend(state.registry.pin(&Channel::asset_context(coin), None));
        state.send_actions(&actions);
        info!(params = %key, "심볼 구독");
        Ok(true)
    }

    /// 심볼 단위 구독 해제. 리스너가 남아 있는 채널은 와이어 구독을 유지합니다.
    pub fn unsubscribe_from_symbol(&self, coin: &str, params: Option<BookParams>) {
        self.inner.debouncer.cancel(coin);

        let mut state = self.inner.state.lock();
        let mut actions = state.registry.unpin(&Channel::order_book(coin));
        actions.extend(state.registry.unpin(&Channel::trades(coin)));
        actions.extend(state.registry.unpin(&Channel::asset_context(coin)));
        state.send_actions(&actions);
        info!(coin, params = %params.unwrap_or_default(), released = actions.len(), "심볼 구독 해제");
    }

    /// 지갑 주소를 교체합니다.
    ///
    /// 이전 사용자 피드를 리스너와 무관하게 먼저 해제하고 새 피드를 구독하므로 공개
    /// 피드와 지갑 피드가 동시에 활성화되지 않습니다. 계정 피드 리스너는 새 사용자
    /// 채널로 옮겨집니다. 옮길 곳이 없는 리스너(지갑 → 공개 전환 시 과거 주문)는
    /// 제거되고 `Channel::Connection`에 상태 이벤트가 발행됩니다.
    ///
    /// `None`이면 공개 피드로 돌아갑니다. 같은 주소면 아무것도 하지 않습니다.
    pub fn update_wallet_address(&self, address: Option<Address>) {
        let (change, status) = {
            let mut state = self.inner.state.lock();
            let change = state.switch_session(address, &self.inner.broadcaster);
            if change.actions.is_empty() {
                return;
            }
            state.send_actions(&change.actions);
            info!(
                user = %state.session.feed_user(),
                moved = change.moved_listeners,
                dropped = change.dropped_listeners,
                "지갑 주소 변경"
            );
            (change, state.status())
        };

        if change.dropped_listeners > 0 {
            self.inner
                .broadcaster
                .publish(Channel::Connection, FeedEvent::Connection(status));
        }
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.inner.state.lock().session.address().cloned()
    }

    /// 현재 구독 레코드 목록.
    pub fn subscriptions(&self) -> Vec<(Channel, SubscriptionRecord)> {
        self.inner
            .state
            .lock()
            .registry
            .channels()
            .map(|(channel, record)| (channel.clone(), record.clone()))
            .collect()
    }

    pub fn subscription(&self, channel: &Channel) -> Option<SubscriptionRecord> {
        self.inner.state.lock().registry.get(channel).cloned()
    }

    pub fn listener_count(&self, channel: &Channel) -> usize {
        self.inner.broadcaster.listener_count(channel)
    }

    // ========================================================================
    // 요청/응답
    // ========================================================================

    /// `post` 요청을 보내고 같은 ID의 응답을 기다립니다.
    pub async fn request(&self, payload: Value) -> FeedResult<Value> {
        self.inner.request(payload).await
    }

    /// `info` 요청.
    pub async fn request_info(&self, request: InfoRequest) -> FeedResult<Value> {
        self.inner.request(request.to_request()?).await
    }

    /// 마켓 메타데이터와 자산 컨텍스트를 요청해 스냅샷으로 저장합니다.
    pub async fn fetch_meta_and_asset_ctxs(&self) -> FeedResult<Arc<MarketSnapshot>> {
        self.inner.fetch_meta_and_asset_ctxs().await
    }

    /// 가장 최근에 받은 마켓 스냅샷.
    pub fn market_snapshot(&self) -> Option<Arc<MarketSnapshot>> {
        self.inner.metadata.get()
    }
}

impl std::fmt::Debug for MarketHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MarketHub")
            .field("url", &self.inner.config.ws_url)
            .field("state", &state.machine.state())
            .field("subscriptions", &state.registry.len())
            .finish()
    }
}

impl HubInner {
    fn publish_status(&self) {
        let status = self.state.lock().status();
        self.broadcaster
            .publish(Channel::Connection, FeedEvent::Connection(status));
    }

    async fn open_transport(self: &Arc<Self>, generation: u64) -> FeedResult<()> {
        match self.connector.connect(&self.config.ws_url).await {
            Ok(transport) => {
                self.attach(generation, transport);
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "연결 실패");
                self.handle_connection_lost(generation, e.to_string());
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "복구할 수 없는 연결 실패, 재연결하지 않음");
                self.handle_fatal(generation, e.to_string());
                Err(e)
            }
        }
    }

    /// 열린 전송 채널을 연결 상태에 붙이고 구독을 재생합니다.
    fn attach(self: &Arc<Self>, generation: u64, transport: Transport) {
        let Transport { outbound, inbound } = transport;

        {
            let mut state = self.state.lock();
            if !state.machine.on_open(generation) {
                debug!(generation, "이미 교체된 연결 시도, 소켓 닫음");
                let _ = outbound.send(OutboundFrame::Close {
                    code: NORMAL_CLOSURE,
                    reason: "superseded".to_string(),
                });
                return;
            }

            // 현재 태스크가 재연결 타이머일 수 있으므로 abort 없이 버림
            state.reconnect_timer = None;
            state.outbound = Some(outbound.clone());
            state.last_error = None;

            let mut actions = state.registry.replay();
            let mut defaults = vec![Channel::AllMids];
            defaults.extend(state.session.default_channels());
            for channel in &defaults {
                actions.extend(state.registry.pin(channel, None));
            }
            state.send_actions(&actions);

            state.reader = Some(self.spawn_reader(generation, inbound));
            state.heartbeat = Some(self.spawn_heartbeat(outbound));
            state.bootstrap = Some(self.spawn_bootstrap());
            info!(generation, subscriptions = state.registry.len(), "연결됨");
        }

        self.publish_status();
    }

    /// 비정상 종료 처리: 재연결을 예약하거나 `Failed`로 전환합니다.
    fn handle_connection_lost(self: &Arc<Self>, generation: u64, reason: String) {
        {
            let mut state = self.state.lock();
            let outcome = state.machine.on_lost(generation);
            if outcome == LossOutcome::Ignored {
                return;
            }

            state.outbound = None;
            state.last_error = Some(reason.clone());
            for handle in [state.reader.take(), state.heartbeat.take(), state.bootstrap.take()]
                .into_iter()
                .flatten()
            {
                handle.abort();
            }

            match outcome {
                LossOutcome::Retry { attempt, delay } => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, reason = %reason, "연결 끊김, 재연결 예약");
                    state.reconnect_timer = Some(self.spawn_retry(delay));
                }
                LossOutcome::Failed { attempts } => {
                    error!(attempts, reason = %reason, "재연결 한도 초과, 연결 실패");
                }
                LossOutcome::Ignored => {}
            }
        }

        self.requests.fail_all();
        self.publish_status();
    }

    fn handle_fatal(&self, generation: u64, reason: String) {
        {
            let mut state = self.state.lock();
            if !state.machine.on_fatal(generation) {
                return;
            }
            state.outbound = None;
            state.reconnect_timer = None;
            state.last_error = Some(reason);
        }

        self.requests.fail_all();
        self.publish_status();
    }

    fn handle_clean_close(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if !state.machine.on_clean_close(generation) {
                return;
            }
            state.outbound = None;
            for handle in [state.reader.take(), state.heartbeat.take(), state.bootstrap.take()]
                .into_iter()
                .flatten()
            {
                handle.abort();
            }
        }

        info!(generation, "서버가 연결을 정상 종료함");
        self.requests.fail_all();
        self.publish_status();
    }

    async fn retry(self: Arc<Self>) {
        let generation = {
            let mut state = self.state.lock();
            match state.machine.begin_retry() {
                Some(generation) => generation,
                None => return,
            }
        };

        info!(generation, "재연결 시도");
        if let Err(e) = self.open_transport(generation).await {
            debug!(error = %e, "재연결 시도 실패");
        }
    }

    fn spawn_retry(self: &Arc<Self>, delay: Duration) -> AbortHandle {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.retry().await;
            }
        })
        .abort_handle()
    }

    fn spawn_reader(
        self: &Arc<Self>,
        generation: u64,
        mut inbound: UnboundedReceiver<TransportEvent>,
    ) -> AbortHandle {
        let weak: Weak<Self> = Arc::downgrade(self);
        let task = async move {
            while let Some(event) = inbound.recv().await {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if event.is_clean_close() {
                    inner.handle_clean_close(generation);
                    return;
                }
                match event {
                    TransportEvent::Text(text) => inner.handle_text(&text),
                    TransportEvent::Closed { code, reason } => {
                        let reason = match code {
                            Some(code) => format!("closed with code {}: {}", code, reason),
                            None => format!("closed: {}", reason),
                        };
                        inner.handle_connection_lost(generation, reason);
                        return;
                    }
                    TransportEvent::Error(e) => {
                        inner.handle_connection_lost(generation, e);
                        return;
                    }
                }
            }

            if let Some(inner) = weak.upgrade() {
                inner.handle_connection_lost(generation, "transport dropped".to_string());
            }
        };

        tokio::spawn(task.instrument(tracing::info_span!("ws_reader", generation)))
            .abort_handle()
    }

    fn spawn_heartbeat(&self, outbound: UnboundedSender<OutboundFrame>) -> AbortHandle {
        let period = self.config.heartbeat_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let ping = match OutboundMessage::Ping.to_json() {
                    Ok(ping) => ping,
                    Err(e) => {
                        warn!(error = %e, "ping 직렬화 실패");
                        return;
                    }
                };
                if outbound.send(OutboundFrame::Text(ping)).is_err() {
                    return;
                }
                trace!("ping");
            }
        })
        .abort_handle()
    }

    fn spawn_bootstrap(self: &Arc<Self>) -> AbortHandle {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match inner.fetch_meta_and_asset_ctxs().await {
                Ok(snapshot) => debug!(markets = snapshot.len(), "부트스트랩 메타데이터 수신"),
                Err(e) => warn!(error = %e, "부트스트랩 메타데이터 요청 실패"),
            }
        })
        .abort_handle()
    }

    fn handle_text(&self, text: &str) {
        match router::route(text) {
            Ok(Routed::Publish(events)) => {
                for (channel, event) in events {
                    if let FeedEvent::Metadata(snapshot) = &event {
                        self.metadata.update(Arc::clone(snapshot));
                    }
                    self.broadcaster.publish(channel, event);
                }
            }
            Ok(Routed::PostResponse { id, outcome }) => {
                self.requests.resolve(id, outcome);
            }
            Ok(Routed::SubscriptionAck {
                channel,
                subscribed,
            }) => {
                if subscribed {
                    self.state.lock().registry.mark_active(&channel);
                }
                trace!(%channel, subscribed, "구독 확인");
            }
            Ok(Routed::Pong) => trace!("pong"),
            Ok(Routed::ServerError(message)) => warn!(message = %message, "서버 에러 메시지"),
            Err(e) => warn!(error = %e, "인바운드 메시지 처리 실패, 무시"),
        }
    }

    async fn request(&self, payload: Value) -> FeedResult<Value> {
        let (id, rx) = {
            let state = self.state.lock();
            let outbound = match &state.outbound {
                Some(tx) if state.machine.state() == ConnectionState::Connected => tx,
                _ => return Err(FeedError::NotConnected),
            };

            let (id, rx) = self.requests.register();
            let frame = OutboundMessage::Post {
                id,
                request: payload,
            }
            .to_json();
            let sent = match frame {
                Ok(text) => outbound.send(OutboundFrame::Text(text)).is_ok(),
                Err(e) => {
                    self.requests.cancel(id);
                    return Err(e.into());
                }
            };
            if !sent {
                self.requests.cancel(id);
                return Err(FeedError::NotConnected);
            }
            (id, rx)
        };

        trace!(request_id = id, "post 요청 전송");
        match tokio::time::timeout(self.config.request_timeout(), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FeedError::Disconnected),
            Err(_) => {
                self.requests.cancel(id);
                Err(FeedError::Timeout(format!("request {}", id)))
            }
        }
    }

    async fn fetch_meta_and_asset_ctxs(&self) -> FeedResult<Arc<MarketSnapshot>> {
        let payload = self.request(InfoRequest::MetaAndAssetCtxs.to_request()?).await?;
        let snapshot = Arc::new(parse_meta_and_asset_ctxs(&payload, SnapshotSource::Bootstrap)?);

        self.metadata.update(Arc::clone(&snapshot));
        self.broadcaster
            .publish(Channel::Metadata, FeedEvent::Metadata(Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}
