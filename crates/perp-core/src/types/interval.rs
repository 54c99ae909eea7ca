//! 캔들 구독을 위한 간격 정의.
//!
//! 거래소가 지원하는 캔들 간격만 표현합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// 캔들 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CandleInterval {
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 2시간봉
    H2,
    /// 4시간봉
    H4,
    /// 8시간봉
    H8,
    /// 12시간봉
    H12,
    /// 일봉
    D1,
    /// 3일봉
    D3,
    /// 주봉
    W1,
    /// 월봉
    Mo1,
}

impl CandleInterval {
    /// 지원하는 모든 간격.
    pub const ALL: [CandleInterval; 14] = [
        CandleInterval::M1,
        CandleInterval::M3,
        CandleInterval::M5,
        CandleInterval::M15,
        CandleInterval::M30,
        CandleInterval::H1,
        CandleInterval::H2,
        CandleInterval::H4,
        CandleInterval::H8,
        CandleInterval::H12,
        CandleInterval::D1,
        CandleInterval::D3,
        CandleInterval::W1,
        CandleInterval::Mo1,
    ];

    /// 와이어 프로토콜 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::M1 => "1m",
            CandleInterval::M3 => "3m",
            CandleInterval::M5 => "5m",
            CandleInterval::M15 => "15m",
            CandleInterval::M30 => "30m",
            CandleInterval::H1 => "1h",
            CandleInterval::H2 => "2h",
            CandleInterval::H4 => "4h",
            CandleInterval::H8 => "8h",
            CandleInterval::H12 => "12h",
            CandleInterval::D1 => "1d",
            CandleInterval::D3 => "3d",
            CandleInterval::W1 => "1w",
            CandleInterval::Mo1 => "1M",
        }
    }

    /// 이 간격의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        const MIN: u64 = 60;
        const HOUR: u64 = 60 * MIN;
        const DAY: u64 = 24 * HOUR;
        let secs = match self {
            CandleInterval::M1 => MIN,
            CandleInterval::M3 => 3 * MIN,
            CandleInterval::M5 => 5 * MIN,
            CandleInterval::M15 => 15 * MIN,
            CandleInterval::M30 => 30 * MIN,
            CandleInterval::H1 => HOUR,
            CandleInterval::H2 => 2 * HOUR,
            CandleInterval::H4 => 4 * HOUR,
            CandleInterval::H8 => 8 * HOUR,
            CandleInterval::H12 => 12 * HOUR,
            CandleInterval::D1 => DAY,
            CandleInterval::D3 => 3 * DAY,
            CandleInterval::W1 => 7 * DAY,
            CandleInterval::Mo1 => 30 * DAY, // 근사값
        };
        Duration::from_secs(secs)
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandleInterval::ALL
            .iter()
            .copied()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| CoreError::InvalidInterval(s.to_string()))
    }
}

impl TryFrom<String> for CandleInterval {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CandleInterval> for String {
    fn from(value: CandleInterval) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parse() {
        assert_eq!("15m".parse::<CandleInterval>().unwrap(), CandleInterval::M15);
        assert_eq!("1M".parse::<CandleInterval>().unwrap(), CandleInterval::Mo1);
        assert_eq!("1m".parse::<CandleInterval>().unwrap(), CandleInterval::M1);
        assert!("6h".parse::<CandleInterval>().is_err());
    }

    #[test]
    fn test_interval_duration() {
        assert_eq!(CandleInterval::M1.duration().as_secs(), 60);
        assert_eq!(CandleInterval::H4.duration().as_secs(), 4 * 3600);
        assert_eq!(CandleInterval::D1.duration().as_secs(), 86400);
    }

    #[test]
    fn test_every_interval_roundtrips() {
        for interval in CandleInterval::ALL {
            assert_eq!(interval.as_str().parse::<CandleInterval>().unwrap(), interval);
        }
    }
}
