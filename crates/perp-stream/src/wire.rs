//! 거래소 WebSocket 와이어 포맷.
//!
//! 아웃바운드: `subscribe` / `unsubscribe` / `post` / `ping`.
//! 인바운드: `{channel, data}` 봉투와 채널별 원시 페이로드.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// 아웃바운드 메시지
// ============================================================================

/// 구독 대상 설명.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_sig_figs: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mantissa: Option<u8>,
}

impl SubscriptionPayload {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            coin: None,
            user: None,
            interval: None,
            n_sig_figs: None,
            mantissa: None,
        }
    }
}

/// 클라이언트 → 거래소 메시지.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum OutboundMessage {
    Subscribe { subscription: SubscriptionPayload },
    Unsubscribe { subscription: SubscriptionPayload },
    Post { id: u64, request: Value },
    Ping,
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `post` 요청으로 보낼 수 있는 info 조회.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    /// 유니버스 메타데이터 + 자산 컨텍스트
    MetaAndAssetCtxs,
    /// 전체 중간가
    AllMids,
    /// 사용자 마진/포지션 상태
    ClearinghouseState { user: String },
    /// 사용자 미체결 주문
    OpenOrders { user: String },
}

impl InfoRequest {
    /// `post` 메시지의 `request` 필드 값을 생성합니다.
    pub fn to_request(&self) -> Result<Value, serde_json::Error> {
        Ok(serde_json::json!({
            "type": "info",
            "payload": serde_json::to_value(self)?,
        }))
    }
}

// ============================================================================
// 인바운드 메시지
// ============================================================================

/// 거래소 → 클라이언트 봉투.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    pub channel: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct RawLevel {
    pub px: String,
    pub sz: String,
    pub n: u32,
}

#[derive(Debug, Deserialize)]
pub struct RawBook {
    pub coin: String,
    pub time: i64,
    /// `[bids, asks]`
    pub levels: Vec<Vec<RawLevel>>,
}

#[derive(Debug, Deserialize)]
pub struct RawTrade {
    pub coin: String,
    pub side: String,
    pub px: String,
    pub sz: String,
    pub time: i64,
    #[serde(default)]
    pub hash: Option<String>,
    pub tid: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawCandle {
    /// 시작 시각 (ms)
    pub t: i64,
    /// 종료 시각 (ms)
    #[serde(rename = "T")]
    pub close_time: i64,
    pub s: String,
    pub i: String,
    pub o: String,
    pub c: String,
    pub h: String,
    pub l: String,
    pub v: String,
    pub n: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawAllMids {
    pub mids: HashMap<String, String>,
}

/// 자산 컨텍스트. `activeAssetCtx`, `metaAndAssetCtxs`, `webData2`가 같은 형태를 씁니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssetCtx {
    pub funding: String,
    pub open_interest: String,
    pub oracle_px: String,
    pub mark_px: String,
    pub day_ntl_vlm: String,
    pub prev_day_px: String,
    #[serde(default)]
    pub mid_px: Option<String>,
    #[serde(default)]
    pub premium: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawActiveAssetCtx {
    pub coin: String,
    pub ctx: RawAssetCtx,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUniverseEntry {
    pub name: String,
    pub sz_decimals: u32,
    pub max_leverage: u32,
    #[serde(default)]
    pub only_isolated: bool,
    #[serde(default)]
    pub is_delisted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMeta {
    pub universe: Vec<RawUniverseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarginSummary {
    pub account_value: String,
    pub total_ntl_pos: String,
    pub total_margin_used: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLeverage {
    pub value: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    pub coin: String,
    pub szi: String,
    #[serde(default)]
    pub entry_px: Option<String>,
    #[serde(default)]
    pub liquidation_px: Option<String>,
    pub unrealized_pnl: String,
    pub position_value: String,
    #[serde(default)]
    pub leverage: Option<RawLeverage>,
}

#[derive(Debug, Deserialize)]
pub struct RawAssetPosition {
    pub position: RawPosition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClearinghouseState {
    pub margin_summary: RawMarginSummary,
    #[serde(default)]
    pub asset_positions: Vec<RawAssetPosition>,
    #[serde(default)]
    pub withdrawable: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub coin: String,
    pub side: String,
    pub limit_px: String,
    pub sz: String,
    pub oid: u64,
    pub timestamp: i64,
    #[serde(default)]
    pub orig_sz: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWebData2 {
    pub user: String,
    #[serde(default)]
    pub clearinghouse_state: Option<RawClearinghouseState>,
    #[serde(default)]
    pub open_orders: Vec<RawOrder>,
    #[serde(default)]
    pub meta: Option<RawMeta>,
    #[serde(default)]
    pub asset_ctxs: Option<Vec<RawAssetCtx>>,
    #[serde(default)]
    pub server_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoricalEntry {
    pub order: RawOrder,
    pub status: String,
    pub status_timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHistoricalOrders {
    pub user: String,
    #[serde(default)]
    pub is_snapshot: bool,
    #[serde(default)]
    pub order_history: Vec<RawHistoricalEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RawPostBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct RawPostResponse {
    pub id: u64,
    pub response: RawPostBody,
}

#[derive(Debug, Deserialize)]
pub struct RawSubscriptionAck {
    pub method: String,
    pub subscription: SubscriptionPayload,
}
