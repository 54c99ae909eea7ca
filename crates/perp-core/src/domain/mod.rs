//! 실시간 시세 허브의 도메인 모델.

mod account;
mod asset_context;
mod candle;
mod metadata;
mod order_book;
mod trade;

pub use account::*;
pub use asset_context::*;
pub use candle::*;
pub use metadata::*;
pub use order_book::*;
pub use trade::*;
