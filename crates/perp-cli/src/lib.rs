//! `perp` CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 호가창, 체결, 캔들, 중간가, 자산 컨텍스트 실시간 출력
//! - 계정 피드 출력
//! - 마켓 메타데이터 덤프

pub mod commands;

pub use commands::*;
