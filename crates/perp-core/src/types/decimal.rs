//! 가격/수량 계산을 위한 Decimal 유틸리티.
//!
//! 거래소는 모든 가격과 수량을 문자열로 전송하므로,
//! 정밀도 손실 없이 `Decimal`로 변환하는 헬퍼를 제공합니다.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// 가격 타입.
pub type Price = Decimal;

/// 수량(계약 크기) 타입.
pub type Size = Decimal;

/// 거래소 문자열 숫자를 `Decimal`로 파싱합니다.
///
/// `field`는 에러 메시지에 포함될 필드 이름입니다.
pub fn parse_decimal(field: &'static str, value: &str) -> CoreResult<Decimal> {
    Decimal::from_str(value.trim())
        .or_else(|_| Decimal::from_scientific(value.trim()))
        .map_err(|_| CoreError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// 값이 없거나 파싱할 수 없으면 `None`을 반환합니다.
pub fn parse_decimal_opt(value: Option<&str>) -> Option<Decimal> {
    value.and_then(|v| Decimal::from_str(v.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("px", "97123.5").unwrap(), dec!(97123.5));
        assert_eq!(parse_decimal("sz", " 0.001 ").unwrap(), dec!(0.001));
        assert_eq!(parse_decimal("funding", "1.25e-5").unwrap(), dec!(0.0000125));
        assert!(parse_decimal("px", "nan?").is_err());
    }

    #[test]
    fn test_parse_decimal_opt() {
        assert_eq!(parse_decimal_opt(Some("1.5")), Some(dec!(1.5)));
        assert_eq!(parse_decimal_opt(Some("bad")), None);
        assert_eq!(parse_decimal_opt(None), None);
    }
}
