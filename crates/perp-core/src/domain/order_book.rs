//! 호가창 타입 및 집계 파라미터.
//!
//! - `BookParams` - 호가 집계 단위 (유효숫자/가수)
//! - `BookLevel` - 누적 잔량이 포함된 호가 레벨
//! - `OrderBook` - 정규화된 호가창 스냅샷

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Coin, Price, Size};

/// 호가창 구독의 집계(틱 사이즈) 파라미터.
///
/// 둘 다 `None`이면 거래소의 전체 정밀도 호가를 받습니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookParams {
    /// 가격 유효숫자 (2~5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_sig_figs: Option<u8>,
    /// 가수 (1, 2, 5). `n_sig_figs == 5`일 때만 허용됩니다.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mantissa: Option<u8>,
}

impl BookParams {
    /// 전체 정밀도 파라미터.
    pub const FULL_PRECISION: BookParams = BookParams {
        n_sig_figs: None,
        mantissa: None,
    };

    /// 파라미터를 생성하고 검증합니다.
    pub fn new(n_sig_figs: Option<u8>, mantissa: Option<u8>) -> Result<Self, CoreError> {
        let params = Self {
            n_sig_figs,
            mantissa,
        };
        params.validate()?;
        Ok(params)
    }

    /// 유효숫자만 지정한 파라미터를 생성합니다.
    pub fn sig_figs(n: u8) -> Result<Self, CoreError> {
        Self::new(Some(n), None)
    }

    /// 거래소가 허용하는 조합인지 검증합니다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(n) = self.n_sig_figs {
            if !(2..=5).contains(&n) {
                return Err(CoreError::InvalidBookParams(format!(
                    "nSigFigs must be 2..=5, got {}",
                    n
                )));
            }
        }

        if let Some(m) = self.mantissa {
            if self.n_sig_figs != Some(5) {
                return Err(CoreError::InvalidBookParams(
                    "mantissa requires nSigFigs = 5".to_string(),
                ));
            }
            if !matches!(m, 1 | 2 | 5) {
                return Err(CoreError::InvalidBookParams(format!(
                    "mantissa must be 1, 2 or 5, got {}",
                    m
                )));
            }
        }

        Ok(())
    }

    /// 전체 정밀도인지 확인합니다.
    pub fn is_full_precision(&self) -> bool {
        self.n_sig_figs.is_none() && self.mantissa.is_none()
    }
}

impl std::fmt::Display for BookParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.n_sig_figs, self.mantissa) {
            (None, _) => write!(f, "full"),
            (Some(n), None) => write!(f, "sig{}", n),
            (Some(n), Some(m)) => write!(f, "sig{}m{}", n, m),
        }
    }
}

/// 호가창 가격 레벨.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// 가격
    pub price: Price,
    /// 잔량
    pub size: Size,
    /// 주문 수
    pub orders: u32,
    /// 최우선 호가부터 이 레벨까지의 누적 잔량
    pub total: Size,
}

impl BookLevel {
    /// 누적 잔량이 계산되지 않은 레벨을 생성합니다.
    pub fn new(price: Price, size: Size, orders: u32) -> Self {
        Self {
            price,
            size,
            orders,
            total: Decimal::ZERO,
        }
    }
}

/// 정규화된 호가창.
///
/// 매수/매도 모두 최우선 호가가 인덱스 0이며, `total`은 최우선 호가부터의
/// 누적 잔량입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    /// 코인
    pub coin: Coin,
    /// 매수 호가 - 가격 내림차순
    pub bids: Vec<BookLevel>,
    /// 매도 호가 - 가격 오름차순
    pub asks: Vec<BookLevel>,
    /// 거래소 타임스탬프
    pub time: DateTime<Utc>,
}

impl OrderBook {
    /// 정렬 및 누적 잔량 계산을 거쳐 호가창을 생성합니다.
    pub fn new(
        coin: impl Into<Coin>,
        mut bids: Vec<BookLevel>,
        mut asks: Vec<BookLevel>,
        time: DateTime<Utc>,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        accumulate(&mut bids);
        accumulate(&mut asks);

        Self {
            coin: coin.into(),
            bids,
            asks,
            time,
        }
    }

    /// 최우선 매수 호가.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    /// 최우선 매도 호가.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// 스프레드.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// 중간 가격.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// 매수 측 전체 잔량.
    pub fn bid_depth(&self) -> Size {
        self.bids.last().map(|l| l.total).unwrap_or(Decimal::ZERO)
    }

    /// 매도 측 전체 잔량.
    pub fn ask_depth(&self) -> Size {
        self.asks.last().map(|l| l.total).unwrap_or(Decimal::ZERO)
    }
}

fn accumulate(levels: &mut [BookLevel]) {
    let mut running = Decimal::ZERO;
    for level in levels.iter_mut() {
        running += level.size;
        level.total = running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel::new(price, size, 1)
    }

    #[test]
    fn test_book_params_validation() {
        assert!(BookParams::sig_figs(5).is_ok());
        assert!(BookParams::sig_figs(1).is_err());
        assert!(BookParams::sig_figs(6).is_err());
        assert!(BookParams::new(Some(5), Some(2)).is_ok());
        assert!(BookParams::new(Some(4), Some(2)).is_err());
        assert!(BookParams::new(Some(5), Some(3)).is_err());
        assert!(BookParams::new(None, Some(1)).is_err());
        assert!(BookParams::FULL_PRECISION.is_full_precision());
    }

    #[test]
    fn test_book_params_display() {
        assert_eq!(BookParams::FULL_PRECISION.to_string(), "full");
        assert_eq!(BookParams::sig_figs(3).unwrap().to_string(), "sig3");
        assert_eq!(
            BookParams::new(Some(5), Some(2)).unwrap().to_string(),
            "sig5m2"
        );
    }

    #[test]
    fn test_order_book_sorting_and_totals() {
        let book = OrderBook::new(
            "BTC",
            vec![level(dec!(99), dec!(2)), level(dec!(100), dec!(1)), level(dec!(98), dec!(3))],
            vec![level(dec!(102), dec!(4)), level(dec!(101), dec!(0.5))],
            Utc::now(),
        );

        let bid_prices: Vec<_> = book.bids.iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![dec!(100), dec!(99), dec!(98)]);
        let bid_totals: Vec<_> = book.bids.iter().map(|l| l.total).collect();
        assert_eq!(bid_totals, vec![dec!(1), dec!(3), dec!(6)]);

        let ask_prices: Vec<_> = book.asks.iter().map(|l| l.price).collect();
        assert_eq!(ask_prices, vec![dec!(101), dec!(102)]);
        let ask_totals: Vec<_> = book.asks.iter().map(|l| l.total).collect();
        assert_eq!(ask_totals, vec![dec!(0.5), dec!(4.5)]);

        assert_eq!(book.spread(), Some(dec!(1)));
        assert_eq!(book.mid_price(), Some(dec!(100.5)));
        assert_eq!(book.bid_depth(), dec!(6));
        assert_eq!(book.ask_depth(), dec!(4.5));
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new("ETH", vec![], vec![], Utc::now());
        assert_eq!(book.spread(), None);
        assert_eq!(book.bid_depth(), Decimal::ZERO);
    }
}
