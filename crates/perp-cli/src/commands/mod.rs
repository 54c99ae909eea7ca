//! CLI 명령어 구현 모듈.

pub mod meta;
pub mod render;
pub mod watch;
