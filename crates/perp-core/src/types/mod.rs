//! 허브 전반에서 사용되는 공통 타입.

mod address;
mod decimal;
mod interval;

pub use address::*;
pub use decimal::*;
pub use interval::*;
