//! 설정 관리.
//!
//! 이 모듈은 시세 허브와 로깅 설정을 정의하고, TOML 파일과 `PERP__` 접두사
//! 환경 변수에서 로드합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CoreError;

/// 메인넷 WebSocket 엔드포인트.
pub const MAINNET_WS_URL: &str = "wss://api.hyperliquid.xyz/ws";

/// 테스트넷 WebSocket 엔드포인트.
pub const TESTNET_WS_URL: &str = "wss://api.hyperliquid-testnet.xyz/ws";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 시세 허브 설정
    #[serde(default)]
    pub feed: FeedConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 재연결 백오프 설정.
///
/// N번째 재연결 시도 전 대기 시간은 `min(base × 2^(N-1), max)`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconnectConfig {
    /// 기본 대기 시간 (밀리초)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// 최대 재연결 시도 횟수
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_base_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30_000
}
fn default_max_attempts() -> u32 {
    10
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectConfig {
    /// N번째(1부터 시작) 재연결 시도 전 대기 시간.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// 시도 횟수가 한도 이내인지 확인합니다.
    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

/// 채널 종류별 전달 간격 제한 (밀리초, 0 = 제한 없음).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThrottleConfig {
    /// 호가창
    #[serde(default = "default_book_throttle")]
    pub order_book_ms: u64,
    /// 체결
    #[serde(default = "default_trades_throttle")]
    pub trades_ms: u64,
    /// 캔들
    #[serde(default = "default_book_throttle")]
    pub candle_ms: u64,
    /// 전체 중간가
    #[serde(default = "default_book_throttle")]
    pub all_mids_ms: u64,
    /// 자산 컨텍스트
    #[serde(default = "default_book_throttle")]
    pub asset_context_ms: u64,
}

fn default_book_throttle() -> u64 {
    100
}
fn default_trades_throttle() -> u64 {
    50
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            order_book_ms: default_book_throttle(),
            trades_ms: default_trades_throttle(),
            candle_ms: default_book_throttle(),
            all_mids_ms: default_book_throttle(),
            asset_context_ms: default_book_throttle(),
        }
    }
}

impl ThrottleConfig {
    /// 모든 채널의 제한을 해제한 설정.
    pub fn disabled() -> Self {
        Self {
            order_book_ms: 0,
            trades_ms: 0,
            candle_ms: 0,
            all_mids_ms: 0,
            asset_context_ms: 0,
        }
    }
}

/// 시세 허브 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// WebSocket URL
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// 연결 타임아웃 (밀리초)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// 재연결 설정
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// 동일 구독 요청 병합 구간 (밀리초)
    #[serde(default = "default_debounce")]
    pub debounce_window_ms: u64,
    /// 채널별 전달 간격 제한
    #[serde(default)]
    pub throttle: ThrottleConfig,
    /// post 요청 응답 대기 시간 (밀리초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// 초기화 대기 폴링 간격 (밀리초)
    #[serde(default = "default_init_poll")]
    pub init_poll_interval_ms: u64,
    /// ping 전송 간격 (초)
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,
}

fn default_ws_url() -> String {
    MAINNET_WS_URL.to_string()
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_debounce() -> u64 {
    100
}
fn default_request_timeout() -> u64 {
    10_000
}
fn default_init_poll() -> u64 {
    100
}
fn default_heartbeat() -> u64 {
    50
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            connect_timeout_ms: default_connect_timeout(),
            reconnect: ReconnectConfig::default(),
            debounce_window_ms: default_debounce(),
            throttle: ThrottleConfig::default(),
            request_timeout_ms: default_request_timeout(),
            init_poll_interval_ms: default_init_poll(),
            heartbeat_interval_secs: default_heartbeat(),
        }
    }
}

impl FeedConfig {
    /// 테스트넷 엔드포인트를 사용하는 기본 설정.
    pub fn testnet() -> Self {
        Self {
            ws_url: TESTNET_WS_URL.to_string(),
            ..Default::default()
        }
    }

    /// 연결 타임아웃.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// 구독 병합 구간.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// 요청 타임아웃.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 초기화 폴링 간격.
    pub fn init_poll_interval(&self) -> Duration {
        Duration::from_millis(self.init_poll_interval_ms)
    }

    /// ping 간격.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(CoreError::Config(format!(
                "ws_url must be a ws:// or wss:// URL: {}",
                self.ws_url
            )));
        }
        if self.reconnect.base_delay_ms == 0 {
            return Err(CoreError::Config(
                "reconnect.base_delay_ms must be positive".to_string(),
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(CoreError::Config(
                "reconnect.max_delay_ms must be >= base_delay_ms".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(CoreError::Config("timeouts must be positive".to_string()));
        }
        if self.init_poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "init_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 || self.heartbeat_interval_secs >= 60 {
            return Err(CoreError::Config(
                "heartbeat_interval_secs must be in 1..60".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (없으면 기본값 사용)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("PERP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.feed.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, CoreError> {
        Self::load("config/default.toml")
    }
}
