//! 도메인 모델.
//!
//! - `Bar` - 일봉 OHLCV 데이터
//! - `PriceSeries` - 한 종목의 검증된 일봉 시계열

mod bar;
mod series;

pub use bar::*;
pub use series::*;
