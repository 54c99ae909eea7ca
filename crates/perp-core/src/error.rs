//! 도메인 값 검증 에러 타입.
//!
//! 주소, 캔들 간격, 호가 집계 파라미터, 설정 값의 검증 실패를 표현합니다.

use thiserror::Error;

/// 핵심 도메인 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 잘못된 지갑 주소
    #[error("잘못된 주소: {0}")]
    InvalidAddress(String),

    /// 지원하지 않는 캔들 간격
    #[error("잘못된 캔들 간격: {0}")]
    InvalidInterval(String),

    /// 호가 집계 파라미터 오류
    #[error("잘못된 호가 파라미터: {0}")]
    InvalidBookParams(String),

    /// 숫자 파싱 에러
    #[error("숫자 파싱 에러: {field}={value}")]
    InvalidNumber { field: &'static str, value: String },

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidNumber {
            field: "px",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "숫자 파싱 에러: px=abc");

        let err = CoreError::InvalidAddress("0x12".to_string());
        assert!(err.to_string().contains("0x12"));
    }
}
