//! 코인 및 지갑 주소 정의.
//!
//! - `Coin` - 거래소 자산 이름 (예: "BTC", "ETH")
//! - `Address` - 20바이트 EVM 지갑 주소

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 거래소 자산 이름 (예: "BTC").
pub type Coin = String;

/// 지갑이 연결되지 않았을 때 공개 데이터 피드에 사용하는 영(0) 주소.
pub const PUBLIC_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// 소문자로 정규화된 EVM 지갑 주소.
///
/// 거래소는 주소를 대소문자 구분 없이 처리하지만, 채널 키 비교를 위해
/// 항상 소문자 `0x` + 40자리 16진수로 저장합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// 문자열에서 주소를 파싱합니다.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| CoreError::InvalidAddress(value.to_string()))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidAddress(value.to_string()));
        }

        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// 공개 피드용 영(0) 주소를 반환합니다.
    pub fn public() -> Self {
        Self(PUBLIC_ADDRESS.to_string())
    }

    /// 공개 피드용 영(0) 주소인지 확인합니다.
    pub fn is_public(&self) -> bool {
        self.0 == PUBLIC_ADDRESS
    }

    /// 주소 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 로그용 축약 표기 (예: "0x1234…abcd").
    pub fn short(&self) -> String {
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}
