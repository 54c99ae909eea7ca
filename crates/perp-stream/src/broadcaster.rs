//! 채널별 팬아웃 브로드캐스터.
//!
//! 리스너는 발행 시점에 동기적으로 호출됩니다. 패닉한 리스너는 로그만 남기고
//! 나머지 리스너 전달은 계속됩니다.
//!
//! 스로틀이 설정된 채널은 간격마다 최대 한 번 전달합니다. 간격 안에 도착한
//! 업데이트는 가장 최신 것 하나만 보관했다가 간격이 끝날 때 전달합니다.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use perp_core::ThrottleConfig;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{error, trace, warn};

use crate::channel::Channel;
use crate::event::FeedEvent;

/// 리스너 콜백.
pub type Listener = Arc<dyn Fn(&FeedEvent) + Send + Sync>;

/// 리스너 등록 핸들.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ThrottleSlot {
    last_delivery: Option<Instant>,
    pending: Option<FeedEvent>,
    flush: Option<AbortHandle>,
}

impl ThrottleSlot {
    fn new() -> Self {
        Self {
            last_delivery: None,
            pending: None,
            flush: None,
        }
    }

    fn cancel(&mut self) {
        self.pending = None;
        if let Some(handle) = self.flush.take() {
            handle.abort();
        }
    }
}

#[derive(Default)]
struct BroadcastState {
    listeners: HashMap<Channel, Vec<(ListenerId, Listener)>>,
    throttles: HashMap<Channel, ThrottleSlot>,
}

impl BroadcastState {
    fn snapshot(&self, channel: &Channel) -> Vec<(ListenerId, Listener)> {
        self.listeners.get(channel).cloned().unwrap_or_default()
    }
}

/// 채널별 리스너 레지스트리 + 스로틀.
#[derive(Clone)]
pub struct Broadcaster {
    state: Arc<Mutex<BroadcastState>>,
    next_id: Arc<AtomicU64>,
    throttle: ThrottleConfig,
}

impl Broadcaster {
    pub fn new(throttle: ThrottleConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BroadcastState::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            throttle,
        }
    }

    /// 채널 종류별 최소 전달 간격.
    pub fn interval_for(&self, channel: &Channel) -> Duration {
        let ms = match channel {
            Channel::OrderBook { .. } => self.throttle.order_book_ms,
            Channel::Trades { .. } => self.throttle.trades_ms,
            Channel::Candle { .. } => self.throttle.candle_ms,
            Channel::AllMids => self.throttle.all_mids_ms,
            Channel::AssetContext { .. } => self.throttle.asset_context_ms,
            _ => 0,
        };
        Duration::from_millis(ms)
    }

    pub fn add_listener(&self, channel: Channel, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state
            .lock()
            .listeners
            .entry(channel)
            .or_default()
            .push((id, listener));
        id
    }

    /// 리스너를 제거합니다. 채널의 마지막 리스너였다면 대기 중인 전달도 취소합니다.
    pub fn remove_listener(&self, channel: &Channel, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let Some(list) = state.listeners.get_mut(channel) else {
            return false;
        };

        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;

        if list.is_empty() {
            state.listeners.remove(channel);
            if let Some(mut slot) = state.throttles.remove(channel) {
                slot.cancel();
            }
        }
        removed
    }

    pub fn listener_count(&self, channel: &Channel) -> usize {
        self.state
            .lock()
            .listeners
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// 한 채널의 리스너를 다른 채널로 옮깁니다. 옮긴 리스너 수를 반환합니다.
    ///
    /// 리스너 ID는 그대로 유지되며, 이후 해제는 새 채널 키로 해야 합니다.
    pub fn move_listeners(&self, from: &Channel, to: Channel) -> usize {
        let mut state = self.state.lock();
        if let Some(mut slot) = state.throttles.remove(from) {
            slot.cancel();
        }
        let Some(moved) = state.listeners.remove(from) else {
            return 0;
        };
        let count = moved.len();
        state.listeners.entry(to).or_default().extend(moved);
        count
    }

    /// 채널의 모든 리스너를 제거합니다. 제거한 리스너 수를 반환합니다.
    pub fn remove_channel(&self, channel: &Channel) -> usize {
        let mut state = self.state.lock();
        if let Some(mut slot) = state.throttles.remove(channel) {
            slot.cancel();
        }
        state.listeners.remove(channel).map_or(0, |list| list.len())
    }

    /// 이벤트를 발행합니다. 리스너가 없으면 아무것도 하지 않습니다.
    pub fn publish(&self, channel: Channel, event: FeedEvent) {
        let interval = self.interval_for(&channel);
        let mut state = self.state.lock();
        if !state.listeners.contains_key(&channel) {
            return;
        }

        if interval.is_zero() {
            let targets = state.snapshot(&channel);
            drop(state);
            deliver(&channel, &targets, &event);
            return;
        }

        let now = Instant::now();
        let slot = state
            .throttles
            .entry(channel.clone())
            .or_insert_with(ThrottleSlot::new);

        // 트레일링 전달이 예약되어 있으면 최신 값으로 교체
        if slot.flush.is_some() {
            trace!(%channel, "throttled, replacing pending update");
            slot.pending = Some(event);
            return;
        }

        let due = match slot.last_delivery {
            Some(last) if now < last + interval => last + interval,
            _ => {
                slot.last_delivery = Some(now);
                let targets = state.snapshot(&channel);
                drop(state);
                deliver(&channel, &targets, &event);
                return;
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            // 트레일링 전달을 예약할 수 없으므로 스로틀 없이 전달
            warn!(%channel, "tokio 런타임 밖에서 발행됨, 즉시 전달");
            slot.last_delivery = Some(now);
            let targets = state.snapshot(&channel);
            drop(state);
            deliver(&channel, &targets, &event);
            return;
        };

        slot.pending = Some(event);
        slot.flush = Some(self.spawn_flush(&runtime, channel, due));
    }

    /// 모든 리스너와 대기 중인 전달을 제거합니다.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        for slot in state.throttles.values_mut() {
            slot.cancel();
        }
        state.throttles.clear();
        state.listeners.clear();
    }

    fn spawn_flush(&self, runtime: &Handle, channel: Channel, due: Instant) -> AbortHandle {
        let state = Arc::clone(&self.state);

        let task = runtime.spawn(async move {
            tokio::time::sleep_until(due).await;

            let (event, targets) = {
                let mut state = state.lock();
                let Some(slot) = state.throttles.get_mut(&channel) else {
                    return;
                };
                slot.flush = None;
                let Some(event) = slot.pending.take() else {
                    return;
                };
                slot.last_delivery = Some(Instant::now());
                (event, state.snapshot(&channel))
            };

            deliver(&channel, &targets, &event);
        });
        task.abort_handle()
    }
}

fn deliver(channel: &Channel, targets: &[(ListenerId, Listener)], event: &FeedEvent) {
    for (id, listener) in targets {
        if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
            error!(%channel, listener = %id, kind = event.kind(), "리스너 패닉, 다음 리스너로 계속");
        }
    }
}
