//! 시세 허브 에러 타입.

use std::time::Duration;

use perp_core::CoreError;
use thiserror::Error;

/// 시세 허브 관련 에러.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    /// 연결되지 않은 상태에서 전송 시도
    #[error("Not connected")]
    NotConnected,

    /// 응답 대기 중 연결이 종료됨
    #[error("Disconnected while waiting for a response")]
    Disconnected,

    /// 연결 수립 실패
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// 연결할 수 없는 URL (재시도하지 않음)
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// WebSocket 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 메타데이터 초기화 대기 시간 초과
    #[error("Initialization timed out after {0:?}")]
    InitializationTimeout(Duration),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 거래소가 반환한 에러 응답
    #[error("API error: {0}")]
    Api(String),

    /// 잘못된 채널 사용
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// 도메인 값 검증 에러
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl FeedError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FeedError::NotConnected
                | FeedError::Disconnected
                | FeedError::ConnectionFailed(_)
                | FeedError::WebSocket(_)
                | FeedError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::WebSocket(err.to_string())
    }
}

/// 시세 허브 작업을 위한 Result 타입.
pub type FeedResult<T> = Result<T, FeedError>;
