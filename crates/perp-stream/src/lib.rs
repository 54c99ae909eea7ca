//! Hyperliquid 실시간 시세 스트림 허브.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 연결 관리: 상태 머신, 지수 백오프 재연결, 하트비트
//! - 전송 계층: `Connector` trait 및 tokio-tungstenite 구현
//! - 와이어 코덱과 인바운드 메시지 라우터
//! - 구독 레지스트리 (채널당 와이어 구독 하나)
//! - 심볼 구독 디바운서와 채널별 스로틀 브로드캐스터
//! - 같은 소켓을 통한 요청/응답 (`post`)
//! - 소비자용 [`MarketHub`] 파사드

pub mod broadcaster;
pub mod channel;
pub mod connection;
pub mod debounce;
pub mod error;
pub mod event;
pub mod hub;
pub mod metadata;
pub mod registry;
pub mod request;
pub mod router;
pub mod session;
pub mod wire;

pub use broadcaster::{Broadcaster, Listener, ListenerId};
pub use channel::Channel;
pub use connection::{
    ConnectionMachine, ConnectionState, ConnectionStatus, Connector, LossOutcome, OutboundFrame,
    Transport, TransportEvent, TungsteniteConnector, NORMAL_CLOSURE,
};
pub use debounce::Debouncer;
pub use error::*;
pub use event::FeedEvent;
pub use hub::MarketHub;
pub use metadata::MetadataStore;
pub use registry::{SubscriptionRecord, SubscriptionRegistry, WireAction, WireState};
pub use request::RequestBridge;
pub use router::Routed;
pub use session::{SessionSwitch, WalletSession};
pub use wire::{InfoRequest, OutboundMessage, SubscriptionPayload};
