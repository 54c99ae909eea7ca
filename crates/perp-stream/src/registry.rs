//! 구독 레지스트리.
//!
//! 채널 키마다 와이어 구독은 최대 하나입니다. 레지스트리는 순수한 장부로,
//! 각 연산은 허브가 전송해야 할 [`WireAction`] 목록을 반환합니다.
//!
//! 레코드는 두 가지 이유로 유지됩니다:
//! - 리스너 수 (소비자 구독)
//! - `pinned` 플래그 (심볼 구독, 기본 피드처럼 허브가 직접 보유하는 구독)

use std::collections::HashMap;

use perp_core::BookParams;
use tracing::debug;

use crate::channel::Channel;
use crate::wire::OutboundMessage;

/// 와이어 구독 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireState {
    /// 구독 메시지 전송됨 (확인 대기)
    Pending,
    /// 거래소가 구독을 확인함
    Active,
}

/// 채널별 구독 레코드.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub state: WireState,
    /// 호가창 채널의 집계 파라미터 (다른 채널은 `None`)
    pub params: Option<BookParams>,
    pub listeners: usize,
    pub pinned: bool,
}

impl SubscriptionRecord {
    fn is_unused(&self) -> bool {
        self.listeners == 0 && !self.pinned
    }
}

/// 허브가 거래소로 보내야 하는 구독 변경.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireAction {
    Subscribe {
        channel: Channel,
        params: Option<BookParams>,
    },
    Unsubscribe {
        channel: Channel,
        params: Option<BookParams>,
    },
}

impl WireAction {
    pub fn channel(&self) -> &Channel {
        match self {
            WireAction::Subscribe { channel, .. } | WireAction::Unsubscribe { channel, .. } => {
                channel
            }
        }
    }

    pub fn is_subscribe(&self) -> bool {
        matches!(self, WireAction::Subscribe { .. })
    }

    /// 아웃바운드 메시지로 변환합니다. 로컬 전용 채널이면 `None`.
    pub fn to_message(&self) -> Option<OutboundMessage> {
        match self {
            WireAction::Subscribe { channel, params } => Some(OutboundMessage::Subscribe {
                subscription: channel.to_subscription(*params)?,
            }),
            WireAction::Unsubscribe { channel, params } => Some(OutboundMessage::Unsubscribe {
                subscription: channel.to_subscription(*params)?,
            }),
        }
    }
}

/// 구독 레지스트리.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    records: HashMap<Channel, SubscriptionRecord>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너 하나를 위해 채널을 확보합니다.
    ///
    /// `params`가 `None`이면 기존 호가 파라미터를 그대로 사용합니다.
    pub fn acquire(&mut self, channel: &Channel, params: Option<BookParams>) -> Vec<WireAction> {
        let actions = self.ensure(channel, params);
        if let Some(record) = self.records.get_mut(channel) {
            record.listeners += 1;
        }
        actions
    }

    /// 리스너 하나를 해제합니다. 마지막 사용자였다면 구독 해제 액션을 반환합니다.
    pub fn release(&mut self, channel: &Channel) -> Vec<WireAction> {
        match self.records.get_mut(channel) {
            Some(record) => {
                record.listeners = record.listeners.saturating_sub(1);
                self.remove_if_unused(channel)
            }
            None => Vec::new(),
        }
    }

    /// 허브가 직접 보유하는 구독으로 고정합니다.
    pub fn pin(&mut self, channel: &Channel, params: Option<BookParams>) -> Vec<WireAction> {
        let actions = self.ensure(channel, params);
        if let Some(record) = self.records.get_mut(channel) {
            record.pinned = true;
        }
        actions
    }

    /// 고정을 해제합니다. 리스너가 없으면 구독 해제 액션을 반환합니다.
    pub fn unpin(&mut self, channel: &Channel) -> Vec<WireAction> {
        match self.records.get_mut(channel) {
            Some(record) => {
                record.pinned = false;
                self.remove_if_unused(channel)
            }
            None => Vec::new(),
        }
    }

    /// 리스너와 고정 여부에 관계없이 레코드를 제거합니다. 지갑 교체처럼 이전 사용자
    /// 피드가 절대 남아 있으면 안 되는 경우에 사용합니다.
    pub fn remove(&mut self, channel: &Channel) -> Vec<WireAction> {
        match self.records.remove(channel) {
            Some(record) => vec![WireAction::Unsubscribe {
                channel: channel.clone(),
                params: record.params,
            }],
            None => Vec::new(),
        }
    }

    /// 다른 채널에서 옮겨 온 리스너 수를 더합니다. 레코드가 없으면 무시합니다.
    pub fn add_listeners(&mut self, channel: &Channel, count: usize) {
        if let Some(record) = self.records.get_mut(channel) {
            record.listeners += count;
        }
    }

    /// 거래소의 구독 확인을 반영합니다.
    pub fn mark_active(&mut self, channel: &Channel) -> bool {
        match self.records.get_mut(channel) {
            Some(record) => {
                record.state = WireState::Active;
                true
            }
            None => false,
        }
    }

    /// 재연결 후 모든 레코드를 다시 구독합니다.
    pub fn replay(&mut self) -> Vec<WireAction> {
        self.records
            .iter_mut()
            .map(|(channel, record)| {
                record.state = WireState::Pending;
                WireAction::Subscribe {
                    channel: channel.clone(),
                    params: record.params,
                }
            })
            .collect()
    }

    /// 모든 레코드를 제거하고 구독 해제 액션을 반환합니다.
    pub fn drain(&mut self) -> Vec<WireAction> {
        self.records
            .drain()
            .map(|(channel, record)| WireAction::Unsubscribe {
                channel,
                params: record.params,
            })
            .collect()
    }

    pub fn get(&self, channel: &Channel) -> Option<&SubscriptionRecord> {
        self.records.get(channel)
    }

    pub fn contains(&self, channel: &Channel) -> bool {
        self.records.contains_key(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&Channel, &SubscriptionRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure(&mut self, channel: &Channel, params: Option<BookParams>) -> Vec<WireAction> {
        if !channel.is_wire() {
            return Vec::new();
        }

        let params = if channel.supports_params() {
            params
        } else {
            if params.is_some() {
                debug!(%channel, "호가 파라미터가 필요 없는 채널, 무시");
            }
            None
        };

        match self.records.get_mut(channel) {
            Some(record) => {
                let current = record.params.unwrap_or_default();
                match params {
                    Some(requested) if requested != current => {
                        debug!(%channel, from = %current, to = %requested, "호가 파라미터 변경");
                        record.params = Some(requested);
                        record.state = WireState::Pending;
                        vec![
                            WireAction::Unsubscribe {
                                channel: channel.clone(),
                                params: Some(current),
                            },
                            WireAction::Subscribe {
                                channel: channel.clone(),
                                params: Some(requested),
                            },
                        ]
                    }
                    _ => Vec::new(),
                }
            }
            None => {
                let params = if channel.supports_params() {
                    Some(params.unwrap_or_default())
                } else {
                    None
                };
                self.records.insert(
                    channel.clone(),
                    SubscriptionRecord {
                        state: WireState::Pending,
                        params,
                        listeners: 0,
                        pinned: false,
                    },
                );
                vec![WireAction::Subscribe {
                    channel: channel.clone(),
                    params,
                }]
            }
        }
    }

    fn remove_if_unused(&mut self, channel: &Channel) -> Vec<WireAction> {
        match self.records.get(channel) {
            Some(record) if record.is_unused() => {
                let params = record.params;
                self.records.remove(channel);
                vec![WireAction::Unsubscribe {
                    channel: channel.clone(),
                    params,
                }]
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(n: u8) -> BookParams {
        BookParams::sig_figs(n).unwrap()
    }

    #[test]
    fn test_acquire_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::trades("BTC");

        assert_eq!(registry.acquire(&channel, None).len(), 1);
        assert!(registry.acquire(&channel, None).is_empty());
        assert_eq!(registry.get(&channel).unwrap().listeners, 2);
    }

    #[test]
    fn test_release_last_listener_unsubscribes_once() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::trades("BTC");
        registry.acquire(&channel, None);
        registry.acquire(&channel, None);

        assert!(registry.release(&channel).is_empty());
        let actions = registry.release(&channel);
        assert_eq!(actions.len(), 1);
        assert!(!actions[0].is_subscribe());
        assert!(registry.release(&channel).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_param_change_unsubscribes_old_first() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::order_book("ETH");
        registry.acquire(&channel, Some(sig(3)));

        let actions = registry.acquire(&channel, Some(sig(5)));
        assert_eq!(
            actions,
            vec![
                WireAction::Unsubscribe {
                    channel: channel.clone(),
                    params: Some(sig(3))
                },
                WireAction::Subscribe {
                    channel: channel.clone(),
                    params: Some(sig(5))
                },
            ]
        );
        assert_eq!(registry.get(&channel).unwrap().params, Some(sig(5)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_none_params_reuse_existing() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::order_book("ETH");
        registry.acquire(&channel, Some(sig(4)));

        assert!(registry.acquire(&channel, None).is_empty());
        assert_eq!(registry.get(&channel).unwrap().params, Some(sig(4)));
    }

    #[test]
    fn test_pinned_record_survives_release() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::asset_context("SOL");
        registry.pin(&channel, None);
        registry.acquire(&channel, None);

        assert!(registry.release(&channel).is_empty());
        assert!(registry.contains(&channel));
        assert_eq!(registry.unpin(&channel).len(), 1);
        assert!(!registry.contains(&channel));
    }

    #[test]
    fn test_remove_ignores_listeners_and_pin() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::account(perp_core::Address::public());
        registry.pin(&channel, None);
        registry.acquire(&channel, None);

        let actions = registry.remove(&channel);
        assert_eq!(
            actions,
            vec![WireAction::Unsubscribe {
                channel: channel.clone(),
                params: None
            }]
        );
        assert!(!registry.contains(&channel));
        assert!(registry.remove(&channel).is_empty());
    }

    #[test]
    fn test_add_listeners_keeps_record_after_unpin() {
        let mut registry = SubscriptionRegistry::new();
        let channel = Channel::AllMids;
        registry.pin(&channel, None);
        registry.add_listeners(&channel, 2);

        assert!(registry.unpin(&channel).is_empty());
        assert_eq!(registry.get(&channel).unwrap().listeners, 2);
        registry.release(&channel);
        assert_eq!(registry.release(&channel).len(), 1);
    }

    #[test]
    fn test_local_channels_are_not_tracked() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.acquire(&Channel::Connection, None).is_empty());
        assert!(registry.acquire(&Channel::Raw("x".into()), None).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replay_and_drain() {
        let mut registry = SubscriptionRegistry::new();
        registry.acquire(&Channel::AllMids, None);
        registry.pin(&Channel::order_book("BTC"), Some(sig(2)));
        registry.mark_active(&Channel::AllMids);

        let replay = registry.replay();
        assert_eq!(replay.len(), 2);
        assert!(replay.iter().all(WireAction::is_subscribe));
        assert_eq!(registry.get(&Channel::AllMids).unwrap().state, WireState::Pending);

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.iter().all(|a| !a.is_subscribe()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_action_to_message() {
        let action = WireAction::Subscribe {
            channel: Channel::order_book("BTC"),
            params: Some(sig(3)),
        };
        let json = action.to_message().unwrap().to_json().unwrap();
        assert!(json.contains(r#""nSigFigs":3"#));
        assert!(json.contains(r#""method":"subscribe""#));
    }
}
