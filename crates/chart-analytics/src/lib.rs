//! 차트 패턴 및 추세선 분석 엔진.
//!
//! 단일 종목의 일봉 시계열을 받아 차트 구조를 결정적으로 분석합니다.
//! 같은 입력과 설정은 항상 같은 결과를 만듭니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 가우시안 평활과 미분 기반 극값 탐지
//! - 조합형 추세선 적합과 터치 점수
//! - 조건별 통과/실패 진단을 포함한 패턴 분류 (Head and Shoulders,
//!   Double Top/Bottom, Triangle/Wedge, Flag, Cup and Handle, Rounding)
//! - 트레이딩 셋업 제안과 신뢰도 점수
//! - 피보나치 되돌림/확장 레벨
//! - 수학적 레짐 지표 (Hurst, 프랙탈 차원, 엔트로피, Lyapunov, DFA)
//! - 시장 레짐 분류와 지배 주기 탐지
//! - 거래량 수준/추세, 이상 거래량, 패턴별 거래량 확인
//!
//! # 사용 예
//!
//! ```ignore
//! use chart_analytics::ChartAnalyzer;
//!
//! let analyzer = ChartAnalyzer::new(config)?;
//! let result = analyzer.analyze(&series, "005930", Some(300))?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! ```

pub mod analyzer;
pub mod cycles;
pub mod error;
pub mod extrema;
pub mod fibonacci;
pub mod indicators;
pub mod math;
pub mod patterns;
pub mod regime;
pub mod reliability;
pub mod setup;
pub mod smoothing;
pub mod trendline;
pub mod volume;

#[cfg(test)]
mod test_support;

// 오케스트레이터 re-exports
pub use analyzer::{
    analyze, AnalysisResult, AnalysisSummary, AnalysisWindow, ChartAnalyzer, PatternReport,
    SectionOutcome, SectionStatus, TrendlineSet,
};

// 단계별 re-exports
pub use cycles::{CycleDetector, DominantCycle};
pub use error::{AnalysisError, StageResult};
pub use extrema::{Extrema, ExtremaDetector, ExtremumKind, ExtremumPoint};
pub use fibonacci::{
    compute_levels, FibonacciAnalysis, FibonacciAnalyzer, FibonacciLevel, LevelKind,
    SwingAnchor, TrendDirection,
};
pub use indicators::{IndicatorBattery, IndicatorSet, IndicatorValue};
pub use patterns::{
    Bias, ConditionResult, PatternClassifier, PatternFamily, PatternKind, PatternRecord,
    RejectedPattern,
};
pub use regime::{MarketRegime, RegimeAnalysis, RegimeDetector};
pub use reliability::{ReliabilityFactors, ReliabilityScore, ReliabilityScorer};
pub use setup::{suggest_setups, TradingSetup};
pub use smoothing::{SmoothedPrices, SmoothedSeries};
pub use trendline::{LineRole, TrendlineCandidate, TrendlineEngine, TrendlineRecord};
pub use volume::{
    PatternVolume, VolumeAnalysis, VolumeAnalyzer, VolumeAnomaly, VolumeExpectation, VolumeLevel,
    VolumeTrend,
};
