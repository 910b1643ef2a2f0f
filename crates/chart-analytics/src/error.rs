//! 분석 단계 에러 타입.

use chart_core::ChartError;
use thiserror::Error;

/// 개별 분석 단계의 실패 원인.
///
/// 오케스트레이터는 이 값을 섹션별 마커로 기록하고 다음 단계로 진행합니다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// 데이터 부족
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 퇴화된 기하 구조 (평행선, 0 범위 등)
    #[error("퇴화된 구조: {0}")]
    Degenerate(String),

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),

    /// 계산 오류
    #[error("계산 오류: {0}")]
    CalculationError(String),
}

/// 분석 단계 결과 타입.
pub type StageResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// 데이터 부족 에러를 생성합니다.
    pub fn insufficient(required: usize, provided: usize) -> Self {
        AnalysisError::InsufficientData { required, provided }
    }

    /// 최소 길이를 확인합니다.
    pub fn require_len(provided: usize, required: usize) -> StageResult<()> {
        if provided < required {
            Err(Self::insufficient(required, provided))
        } else {
            Ok(())
        }
    }
}

impl From<AnalysisError> for ChartError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidParameter(msg) => ChartError::Config(msg),
            other => ChartError::InvalidInput(other.to_string()),
        }
    }
}
