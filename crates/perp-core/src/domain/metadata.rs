//! 마켓 메타데이터 스냅샷.
//!
//! 거래소는 유니버스 메타데이터와 자산 컨텍스트를 두 경로로 전달합니다:
//! 전용 `metaAndAssetCtxs` 요청 응답과 계정 피드(`webData2`)에 포함된 사본.
//! 두 경로 모두 동일한 `MarketSnapshot`으로 변환됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetContext;
use crate::types::Coin;

/// 스냅샷 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// 부트스트랩 `metaAndAssetCtxs` 요청 응답
    Bootstrap,
    /// 계정 피드에 포함된 메타데이터
    AccountFeed,
}

/// 무기한 선물 마켓 하나의 메타데이터와 현재 컨텍스트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerpMarket {
    /// 유니버스 인덱스 (주문 시 자산 ID)
    pub asset_id: u32,
    /// 코인
    pub coin: Coin,
    /// 수량 소수점 자릿수
    pub sz_decimals: u32,
    /// 최대 레버리지
    pub max_leverage: u32,
    /// 격리 마진 전용 여부
    pub only_isolated: bool,
    /// 상장 폐지 여부
    pub is_delisted: bool,
    /// 현재 자산 컨텍스트
    pub context: AssetContext,
}

impl PerpMarket {
    /// 가격 소수점 자릿수 (거래소 규칙: 6 - szDecimals).
    pub fn price_decimals(&self) -> u32 {
        6u32.saturating_sub(self.sz_decimals)
    }
}

/// 전체 마켓 메타데이터 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// 유니버스 순서의 마켓 목록
    pub markets: Vec<PerpMarket>,
    /// 출처
    pub source: SnapshotSource,
    /// 수신 시각
    pub received_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// 코인 이름으로 마켓을 찾습니다.
    pub fn market(&self, coin: &str) -> Option<&PerpMarket> {
        self.markets.iter().find(|m| m.coin == coin)
    }

    /// 상장 폐지되지 않은 마켓만 반환합니다.
    pub fn active_markets(&self) -> impl Iterator<Item = &PerpMarket> {
        self.markets.iter().filter(|m| !m.is_delisted)
    }

    /// 마켓 수.
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// 출처와 수신 시각을 제외한 내용이 같은지 비교합니다.
    pub fn same_markets(&self, other: &MarketSnapshot) -> bool {
        self.markets == other.markets
    }
}
