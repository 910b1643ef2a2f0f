//! 차트 패턴 분석 CLI.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - OHLCV CSV 로드
//! - 분석 실행 및 JSON 출력
//! - 기본 설정 파일 생성

pub mod commands;

pub use commands::*;
