//! 연결 상태 머신.
//!
//! # 상태 전이
//!
//! ```text
//! Disconnected ──[connect]──> Connecting ──[open]──> Connected
//!                                  │                     │
//!                              [실패]              [비정상 종료]
//!                                  ↓                     ↓
//!                Connected <──[open]── Reconnecting <────┘
//!                                  │        ↑
//!                     [시도 한도 초과]   [재시도 실패]
//!                                  ↓
//!                                Failed <──[복구 불가 에러]── Connecting/Reconnecting
//!
//! 모든 상태 ──[disconnect]──> Disconnected
//! ```
//!
//! 재연결 타이머는 `Reconnecting` 상태에서만 시도를 시작하므로, 수동
//! `disconnect()` 이후에는 재연결이 일어나지 않습니다. 세대 번호는 교체된
//! 소켓에서 뒤늦게 도착한 종료 이벤트를 걸러냅니다.

use std::time::Duration;

use perp_core::ReconnectConfig;
use serde::Serialize;

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// 새 연결을 시작할 수 있는 상태인지 확인.
    pub fn can_connect(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// 소비자에게 공개되는 연결 상태 스냅샷.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// 현재까지의 재연결 시도 횟수
    pub attempts: u32,
    /// 다음 재연결까지 대기 시간 (밀리초)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_ms: Option<u64>,
    /// 마지막 연결 실패 원인
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// 연결 끊김 처리 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossOutcome {
    /// 이미 교체된 연결의 이벤트 (무시)
    Ignored,
    /// `delay` 후 `attempt`번째 재연결 시도
    Retry { attempt: u32, delay: Duration },
    /// 시도 한도 초과
    Failed { attempts: u32 },
}

/// 연결 상태 머신.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    attempts: u32,
    generation: u64,
    backoff: ReconnectConfig,
    next_retry: Option<Duration>,
}

impl ConnectionMachine {
    pub fn new(backoff: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            generation: 0,
            backoff,
            next_retry: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `connect()` 요청. 이미 연결 중이거나 연결되어 있으면 `None`.
    pub fn begin_connect(&mut self) -> Option<u64> {
        if !self.state.can_connect() {
            return None;
        }
        self.state = ConnectionState::Connecting;
        self.attempts = 0;
        self.next_retry = None;
        self.generation += 1;
        Some(self.generation)
    }

    /// 재연결 타이머 만료. `Reconnecting` 상태가 아니면 `None`.
    pub fn begin_retry(&mut self) -> Option<u64> {
        if self.state != ConnectionState::Reconnecting {
            return None;
        }
        self.next_retry = None;
        self.generation += 1;
        Some(self.generation)
    }

    /// 소켓 열림. 세대가 다르거나 연결 시도 중이 아니면 `false`.
    pub fn on_open(&mut self, generation: u64) -> bool {
        let attempting = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        );
        if generation != self.generation || !attempting {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.next_retry = None;
        true
    }

    /// 비정상 종료 또는 연결 시도 실패.
    pub fn on_lost(&mut self, generation: u64) -> LossOutcome {
        let live = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        );
        if generation != self.generation || !live {
            return LossOutcome::Ignored;
        }

        self.attempts += 1;
        if !self.backoff.allows_attempt(self.attempts) {
            self.state = ConnectionState::Failed;
            self.next_retry = None;
            return LossOutcome::Failed {
                attempts: self.attempts - 1,
            };
        }

        let delay = self.backoff.delay_for_attempt(self.attempts);
        self.state = ConnectionState::Reconnecting;
        self.next_retry = Some(delay);
        LossOutcome::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    /// 재시도해도 성공할 수 없는 연결 실패. 백오프 없이 `Failed`로 전환합니다.
    pub fn on_fatal(&mut self, generation: u64) -> bool {
        let attempting = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        );
        if generation != self.generation || !attempting {
            return false;
        }
        self.state = ConnectionState::Failed;
        self.next_retry = None;
        true
    }

    /// 서버가 정상 종료 코드로 연결을 닫음.
    pub fn on_clean_close(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connected {
            return false;
        }
        self.state = ConnectionState::Disconnected;
        self.generation += 1;
        true
    }

    /// 수동 종료. 진행 중인 모든 시도의 세대를 무효화합니다.
    pub fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
        self.next_retry = None;
        self.generation += 1;
    }

    pub fn status(&self, last_error: Option<String>) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            attempts: self.attempts,
            next_retry_ms: self.next_retry.map(|d| d.as_millis() as u64),
            last_error,
        }
    }
}
