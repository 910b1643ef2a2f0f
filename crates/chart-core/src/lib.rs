//! # Chart Core
//!
//! 차트 패턴 분석 엔진의 핵심 도메인 모델과 공용 인프라를 제공합니다.
//!
//! 이 크레이트는 분석 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - OHLCV 일봉(`Bar`)과 검증된 시계열(`PriceSeries`)
//! - 에러 타입(`ChartError`)
//! - 분석 설정(`AnalysisConfig`) 로드 및 검증
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
