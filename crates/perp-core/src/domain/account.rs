//! 사용자 계정 피드 데이터.
//!
//! - `AccountSnapshot` - 마진 요약, 포지션, 미체결 주문
//! - `HistoricalOrders` - 과거 주문 내역 피드

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::types::{Address, Coin, Price, Size};

/// 교차 마진 요약.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    /// 계정 가치
    pub account_value: Decimal,
    /// 총 포지션 명목 가치
    pub total_notional_position: Decimal,
    /// 사용 중인 마진
    pub total_margin_used: Decimal,
    /// 출금 가능 금액
    pub withdrawable: Decimal,
}

impl MarginSummary {
    /// 마진 사용률 (0.5 = 50%).
    pub fn margin_usage(&self) -> Option<Decimal> {
        if self.account_value.is_zero() {
            return None;
        }
        Some(self.total_margin_used / self.account_value)
    }
}

/// 보유 포지션 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    /// 코인
    pub coin: Coin,
    /// 부호 있는 수량 (양수 = 롱, 음수 = 숏)
    pub size: Size,
    /// 평균 진입가
    pub entry_price: Option<Price>,
    /// 청산 가격
    pub liquidation_price: Option<Price>,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 레버리지
    pub leverage: Option<u32>,
    /// 포지션 명목 가치
    pub position_value: Decimal,
}

impl PositionSummary {
    /// 롱 포지션 여부.
    pub fn is_long(&self) -> bool {
        self.size > Decimal::ZERO
    }
}

/// 미체결 주문.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    /// 주문 ID
    pub oid: u64,
    /// 코인
    pub coin: Coin,
    /// 방향
    pub side: Side,
    /// 지정가
    pub limit_price: Price,
    /// 남은 수량
    pub size: Size,
    /// 최초 수량
    pub orig_size: Option<Size>,
    /// 주문 시각
    pub timestamp: DateTime<Utc>,
}

/// 사용자 계정 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// 피드 대상 주소 (공개 피드면 영(0) 주소)
    pub user: Address,
    /// 교차 마진 요약
    pub margin: MarginSummary,
    /// 보유 포지션
    pub positions: Vec<PositionSummary>,
    /// 미체결 주문
    pub open_orders: Vec<OpenOrder>,
    /// 서버 시각
    pub server_time: Option<DateTime<Utc>>,
}

impl AccountSnapshot {
    /// 코인별 포지션을 찾습니다.
    pub fn position(&self, coin: &str) -> Option<&PositionSummary> {
        self.positions.iter().find(|p| p.coin == coin)
    }
}

/// 과거 주문 한 건.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOrder {
    /// 주문 ID
    pub oid: u64,
    /// 코인
    pub coin: Coin,
    /// 방향
    pub side: Side,
    /// 지정가
    pub limit_price: Price,
    /// 남은 수량
    pub size: Size,
    /// 최초 수량
    pub orig_size: Option<Size>,
    /// 최종 상태 (filled, canceled, rejected 등)
    pub status: String,
    /// 상태 변경 시각
    pub status_time: DateTime<Utc>,
}

/// 과거 주문 피드 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOrders {
    /// 대상 주소
    pub user: Address,
    /// 초기 스냅샷 여부 (false면 증분 업데이트)
    pub is_snapshot: bool,
    /// 주문 목록
    pub orders: Vec<HistoricalOrder>,
}
