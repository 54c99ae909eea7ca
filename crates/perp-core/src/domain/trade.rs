//! 체결 데이터.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Coin, Price, Size};

/// 체결 방향 (테이커 기준).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 거래소 방향 코드에서 변환합니다 ("B" = 매수, "A" = 매도).
    pub fn from_wire(code: &str) -> Option<Self> {
        match code {
            "B" | "b" => Some(Side::Buy),
            "A" | "a" => Some(Side::Sell),
            _ => None,
        }
    }

    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 정규화된 체결 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// 코인
    pub coin: Coin,
    /// 체결 방향
    pub side: Side,
    /// 가격
    pub price: Price,
    /// 수량
    pub size: Size,
    /// 체결 시각
    pub timestamp: DateTime<Utc>,
    /// 체결 ID
    pub tid: u64,
    /// 트랜잭션 해시
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Trade {
    /// 체결 금액 (가격 × 수량).
    pub fn notional(&self) -> rust_decimal::Decimal {
        self.price * self.size
    }
}
