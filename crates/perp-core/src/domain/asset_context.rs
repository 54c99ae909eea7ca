//! 자산 컨텍스트 (오라클 가격, 펀딩, 미결제약정, 거래대금).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Coin, Price};

/// 거래소가 제공하는 코인별 시장 통계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetContext {
    /// 코인
    pub coin: Coin,
    /// 마크 가격
    pub mark_price: Price,
    /// 오라클 가격
    pub oracle_price: Price,
    /// 중간 가격 (호가가 없으면 None)
    pub mid_price: Option<Price>,
    /// 전일 가격
    pub prev_day_price: Price,
    /// 현재 펀딩비 (시간당)
    pub funding: Decimal,
    /// 미결제약정 (기준 자산 단위)
    pub open_interest: Decimal,
    /// 24시간 명목 거래대금
    pub day_notional_volume: Decimal,
    /// 프리미엄
    pub premium: Option<Decimal>,
}

impl AssetContext {
    /// 전일 대비 변동률 (0.01 = 1%).
    pub fn change_24h_pct(&self) -> Option<Decimal> {
        if self.prev_day_price.is_zero() {
            return None;
        }
        Some((self.mark_price - self.prev_day_price) / self.prev_day_price)
    }

    /// 미결제약정의 명목 가치 (미결제약정 × 오라클 가격).
    pub fn open_interest_notional(&self) -> Decimal {
        self.open_interest * self.oracle_price
    }

    /// 연환산 펀딩비 (시간당 펀딩 × 24 × 365).
    pub fn annualized_funding(&self) -> Decimal {
        self.funding * Decimal::from(24 * 365)
    }
}
