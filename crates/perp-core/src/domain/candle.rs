//! OHLCV 캔들 데이터.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CandleInterval, Coin, Price, Size};

/// (코인, 간격)으로 식별되는 OHLCV 캔들.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 코인
    pub coin: Coin,
    /// 캔들 간격
    pub interval: CandleInterval,
    /// 캔들 시작 시각
    pub open_time: DateTime<Utc>,
    /// 캔들 종료 시각
    pub close_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량 (기준 자산 단위)
    pub volume: Size,
    /// 체결 건수
    pub trades: u64,
}

impl Candle {
    /// 캔들 범위(고가 - 저가).
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉 여부.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 주어진 시각에 캔들이 이미 마감되었는지 확인합니다.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        now > self.close_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_helpers() {
        let open_time = Utc::now();
        let candle = Candle {
            coin: "SOL".to_string(),
            interval: CandleInterval::M1,
            open_time,
            close_time: open_time + Duration::seconds(59),
            open: dec!(150),
            high: dec!(152),
            low: dec!(149),
            close: dec!(151),
            volume: dec!(1200),
            trades: 42,
        };

        assert_eq!(candle.range(), dec!(3));
        assert!(candle.is_bullish());
        assert!(!candle.is_closed_at(open_time));
        assert!(candle.is_closed_at(open_time + Duration::seconds(60)));
    }
}
