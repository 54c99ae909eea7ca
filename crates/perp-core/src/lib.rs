//! # Perp Core
//!
//! 무기한 선물 실시간 시세 허브의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 허브 전반에서 사용되는 기본 타입을 제공합니다:
//! - 코인, 지갑 주소, 캔들 간격 정의
//! - 호가창, 체결, 캔들, 자산 컨텍스트 구조체
//! - 마켓 메타데이터 스냅샷 및 계정 스냅샷
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
