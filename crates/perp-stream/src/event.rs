//! 리스너에게 전달되는 이벤트.

use std::collections::HashMap;
use std::sync::Arc;

use perp_core::{
    AccountSnapshot, AssetContext, Candle, Coin, HistoricalOrders, MarketSnapshot, OrderBook,
    Price, Trade,
};
use serde_json::Value;

use crate::connection::ConnectionStatus;

/// 정규화된 피드 이벤트.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// 호가창 스냅샷
    OrderBook(OrderBook),
    /// 체결 배치
    Trades(Vec<Trade>),
    /// 캔들 업데이트
    Candle(Candle),
    /// 코인 → 중간가
    AllMids(HashMap<Coin, Price>),
    /// 자산 컨텍스트
    AssetContext(AssetContext),
    /// 계정 스냅샷
    Account(AccountSnapshot),
    /// 과거 주문
    HistoricalOrders(HistoricalOrders),
    /// 마켓 메타데이터
    Metadata(Arc<MarketSnapshot>),
    /// 연결 상태 변경
    Connection(ConnectionStatus),
    /// 알 수 없는 채널의 원본 데이터
    Raw { channel: String, data: Value },
}

impl FeedEvent {
    /// 로그용 이벤트 종류 이름.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::OrderBook(_) => "order_book",
            FeedEvent::Trades(_) => "trades",
            FeedEvent::Candle(_) => "candle",
            FeedEvent::AllMids(_) => "all_mids",
            FeedEvent::AssetContext(_) => "asset_context",
            FeedEvent::Account(_) => "account",
            FeedEvent::HistoricalOrders(_) => "historical_orders",
            FeedEvent::Metadata(_) => "metadata",
            FeedEvent::Connection(_) => "connection",
            FeedEvent::Raw { .. } => "raw",
        }
    }
}
