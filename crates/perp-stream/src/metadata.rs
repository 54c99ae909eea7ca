//! 마켓 메타데이터 처리.
//!
//! 부트스트랩 `metaAndAssetCtxs` 응답과 `webData2` 계정 피드에 포함된 메타데이터는
//! 모두 [`build_snapshot`]을 거쳐 같은 `MarketSnapshot`이 됩니다.
//! 두 경로가 연달아 도착하면 나중에 도착한 스냅샷이 우선합니다.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use perp_core::{
    parse_decimal, parse_decimal_opt, AssetContext, MarketSnapshot, PerpMarket, SnapshotSource,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::wire::{RawAssetCtx, RawMeta};

pub(crate) fn decimal(field: &'static str, value: &str) -> FeedResult<Decimal> {
    parse_decimal(field, value).map_err(|e| FeedError::Parse(e.to_string()))
}

/// 원시 자산 컨텍스트를 변환합니다.
pub fn asset_context(coin: &str, raw: &RawAssetCtx) -> FeedResult<AssetContext> {
    Ok(AssetContext {
        coin: coin.to_string(),
        mark_price: decimal("markPx", &raw.mark_px)?,
        oracle_price: decimal("oraclePx", &raw.oracle_px)?,
        mid_price: parse_decimal_opt(raw.mid_px.as_deref()),
        prev_day_price: decimal("prevDayPx", &raw.prev_day_px)?,
        funding: decimal("funding", &raw.funding)?,
        open_interest: decimal("openInterest", &raw.open_interest)?,
        day_notional_volume: decimal("dayNtlVlm", &raw.day_ntl_vlm)?,
        premium: parse_decimal_opt(raw.premium.as_deref()),
    })
}

/// 유니버스 메타데이터와 자산 컨텍스트를 결합해 스냅샷을 만듭니다.
///
/// 두 배열은 같은 순서(유니버스 인덱스)로 정렬되어 있어야 합니다.
pub fn build_snapshot(
    meta: &RawMeta,
    ctxs: &[RawAssetCtx],
    source: SnapshotSource,
) -> FeedResult<MarketSnapshot> {
    if meta.universe.len() != ctxs.len() {
        warn!(
            universe = meta.universe.len(),
            contexts = ctxs.len(),
            ?source,
            "메타데이터와 자산 컨텍스트 개수 불일치"
        );
    }

    let markets = meta
        .universe
        .iter()
        .zip(ctxs)
        .enumerate()
        .map(|(index, (entry, ctx))| {
            Ok(PerpMarket {
                asset_id: index as u32,
                coin: entry.name.clone(),
                sz_decimals: entry.sz_decimals,
                max_leverage: entry.max_leverage,
                only_isolated: entry.only_isolated,
                is_delisted: entry.is_delisted,
                context: asset_context(&entry.name, ctx)?,
            })
        })
        .collect::<FeedResult<Vec<_>>>()?;

    debug!(markets = markets.len(), ?source, "마켓 스냅샷 생성");

    Ok(MarketSnapshot {
        markets,
        source,
        received_at: Utc::now(),
    })
}

/// `metaAndAssetCtxs` 응답 페이로드를 파싱합니다.
///
/// `{type, data: [meta, ctxs]}`와 `[meta, ctxs]` 형태를 모두 받습니다.
pub fn parse_meta_and_asset_ctxs(
    payload: &Value,
    source: SnapshotSource,
) -> FeedResult<MarketSnapshot> {
    let data = payload.get("data").unwrap_or(payload);
    let (meta, ctxs) = match data.as_array().map(Vec::as_slice) {
        Some([meta, ctxs]) => (meta, ctxs),
        _ => {
            return Err(FeedError::Parse(
                "metaAndAssetCtxs: expected [meta, assetCtxs]".to_string(),
            ))
        }
    };

    let meta: RawMeta = serde_json::from_value(meta.clone())?;
    let ctxs: Vec<RawAssetCtx> = serde_json::from_value(ctxs.clone())?;
    build_snapshot(&meta, &ctxs, source)
}

/// 가장 최근 마켓 스냅샷 보관소.
#[derive(Debug, Default)]
pub struct MetadataStore {
    current: RwLock<Option<Arc<MarketSnapshot>>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 스냅샷으로 교체합니다.
    pub fn update(&self, snapshot: Arc<MarketSnapshot>) {
        *self.current.write() = Some(snapshot);
    }

    pub fn get(&self) -> Option<Arc<MarketSnapshot>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn clear(&self) {
        *self.current.write() = None;
    }
}
