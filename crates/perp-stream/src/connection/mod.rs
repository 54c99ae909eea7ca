//! 물리 연결 관리.
//!
//! - `state` - 연결 상태 머신과 재연결 백오프
//! - `transport` - 전송 계층 추상화와 tokio-tungstenite 구현

mod state;
mod transport;

pub use state::*;
pub use transport::*;
