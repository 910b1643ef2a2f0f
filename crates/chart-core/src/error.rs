//! 차트 분석 시스템의 에러 타입.
//!
//! 입력 시계열이 근본적으로 잘못되었거나 설정이 유효하지 않은 경우에만
//! 사용됩니다. 데이터 부족 같은 품질 문제는 분석 결과 안의 마커로 표현됩니다.

use chrono::NaiveDate;
use thiserror::Error;

/// 핵심 차트 분석 에러.
#[derive(Debug, Error)]
pub enum ChartError {
    /// 빈 시계열
    #[error("빈 시계열: {0}")]
    EmptySeries(String),

    /// 날짜가 엄격하게 증가하지 않음
    #[error("날짜 순서 오류 (index {index}): {previous} 다음에 {current}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    /// 봉 불변식 위반
    #[error("잘못된 봉 (index {index}): {reason}")]
    InvalidBar { index: usize, reason: String },

    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 입출력 에러
    #[error("입출력 에러: {0}")]
    Io(String),
}

/// 차트 분석 작업을 위한 Result 타입.
pub type ChartResult<T> = Result<T, ChartError>;

impl ChartError {
    /// 호출자가 넘긴 시계열 자체가 잘못된 경우인지 확인합니다.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ChartError::EmptySeries(_)
                | ChartError::NonMonotonicDates { .. }
                | ChartError::InvalidBar { .. }
                | ChartError::InvalidInput(_)
        )
    }

    /// 설정 검증 실패인지 확인합니다.
    pub fn is_config_error(&self) -> bool {
        matches!(self, ChartError::Config(_))
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(err: serde_json::Error) -> Self {
        ChartError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for ChartError {
    fn from(err: toml::ser::Error) -> Self {
        ChartError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ChartError {
    fn from(err: config::ConfigError) -> Self {
        ChartError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ChartError {
    fn from(err: std::io::Error) -> Self {
        ChartError::Io(err.to_string())
    }
}
