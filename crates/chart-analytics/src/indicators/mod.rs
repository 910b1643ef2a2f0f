//! 수학적 레짐 지표.
//!
//! 원본(비평활) 종가에 대해 다섯 가지 스칼라 통계를 독립적으로 계산합니다.
//! 각 지표는 자체 최소 표본 수를 가지며, 하나의 실패가 다른 지표를
//! 막지 않도록 결과를 개별 마커로 기록합니다.
//!
//! - Hurst 지수: 추세 지속성 (0.5 = 랜덤워크)
//! - 프랙탈 차원 (Higuchi): 거칠기 (1 = 매끈, 2 = 잡음)
//! - Shannon 엔트로피: 로그 수익률 분포의 무작위성 (비트)
//! - Lyapunov 지수: 궤적 발산 (양수 = 혼돈)
//! - DFA 지수: 장기 상관

pub mod dfa;
pub mod entropy;
pub mod fractal;
pub mod hurst;
pub mod lyapunov;

use chart_core::IndicatorConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, StageResult};
use crate::math::linear_fit;

pub use dfa::dfa_exponent;
pub use entropy::shannon_entropy;
pub use fractal::higuchi_fractal_dimension;
pub use hurst::hurst_exponent;
pub use lyapunov::lyapunov_exponent;

/// 지표 하나의 계산 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorValue {
    /// 정상 계산
    Value { value: f64 },
    /// 최소 표본 수 미달
    InsufficientData { required: usize, provided: usize },
    /// 계산 불가 (0 분산, 비유한 결과 등)
    Degenerate { reason: String },
}

impl IndicatorValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            IndicatorValue::Value { value } => Some(*value),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, IndicatorValue::Value { .. })
    }
}

impl From<StageResult<f64>> for IndicatorValue {
    fn from(result: StageResult<f64>) -> Self {
        match result {
            Ok(value) if value.is_finite() => IndicatorValue::Value { value },
            Ok(value) => IndicatorValue::Degenerate {
                reason: format!("비유한 결과: {}", value),
            },
            Err(AnalysisError::InsufficientData { required, provided }) => {
                IndicatorValue::InsufficientData { required, provided }
            }
            Err(other) => IndicatorValue::Degenerate {
                reason: other.to_string(),
            },
        }
    }
}

/// 다섯 지표 묶음.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub hurst_exponent: IndicatorValue,
    pub fractal_dimension: IndicatorValue,
    pub shannon_entropy: IndicatorValue,
    pub lyapunov_exponent: IndicatorValue,
    pub dfa_exponent: IndicatorValue,
}

/// 지표 배터리.
#[derive(Debug, Clone)]
pub struct IndicatorBattery {
    config: IndicatorConfig,
}

impl IndicatorBattery {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(IndicatorConfig::default())
    }

    /// 종가 배열로 다섯 지표를 계산합니다.
    pub fn compute(&self, closes: &[f64]) -> IndicatorSet {
        let c = &self.config;
        let set = IndicatorSet {
            hurst_exponent: hurst_exponent(closes, c.hurst_min_points, c.hurst_max_lag).into(),
            fractal_dimension: higuchi_fractal_dimension(
                closes,
                c.fractal_min_points,
                c.fractal_kmax,
            )
            .into(),
            shannon_entropy: shannon_entropy(closes, c.entropy_min_points, c.entropy_bins).into(),
            lyapunov_exponent: lyapunov_exponent(
                closes,
                c.lyapunov_min_points,
                c.lyapunov_embedding,
                c.lyapunov_delay,
                c.lyapunov_steps,
            )
            .into(),
            dfa_exponent: dfa_exponent(
                closes,
                c.dfa_min_points,
                (c.dfa_min_scale, c.dfa_max_scale, c.dfa_scale_step),
            )
            .into(),
        };
        debug!(
            hurst = ?set.hurst_exponent.value(),
            fractal = ?set.fractal_dimension.value(),
            entropy = ?set.shannon_entropy.value(),
            lyapunov = ?set.lyapunov_exponent.value(),
            dfa = ?set.dfa_exponent.value(),
            "Indicators computed"
        );
        set
    }
}

/// log-log 회귀 기울기. 양수가 아닌 값이 있으면 `Degenerate`.
pub(crate) fn log_log_slope(x: &[f64], y: &[f64], what: &str) -> StageResult<f64> {
    if x.iter().chain(y).any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(AnalysisError::Degenerate(format!(
            "{}: 로그를 취할 수 없는 값이 있습니다",
            what
        )));
    }
    let log_x: Vec<f64> = x.iter().map(|v| v.ln()).collect();
    let log_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
    linear_fit(&log_x, &log_y)
        .map(|(slope, _)| slope)
        .ok_or_else(|| AnalysisError::Degenerate(format!("{}: 회귀 불가", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_marker_serialization() {
        let value = IndicatorValue::from(StageResult::Ok(0.5));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"status":"value","value":0.5}"#
        );

        let short = IndicatorValue::from(Err::<f64, _>(AnalysisError::insufficient(100, 60)));
        assert_eq!(
            serde_json::to_string(&short).unwrap(),
            r#"{"status":"insufficient_data","required":100,"provided":60}"#
        );

        let nan = IndicatorValue::from(StageResult::Ok(f64::NAN));
        assert!(matches!(nan, IndicatorValue::Degenerate { .. }));
    }

    #[test]
    fn test_log_log_slope() {
        let x = [1.0, 2.0, 4.0, 8.0];
        let y: Vec<f64> = x.iter().map(|v: &f64| v.powf(0.7)).collect();
        assert!((log_log_slope(&x, &y, "test").unwrap() - 0.7).abs() < 1e-9);
        assert!(log_log_slope(&x, &[1.0, 0.0, 1.0, 1.0], "test").is_err());
    }

    #[test]
    fn test_battery_isolates_failures() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let set = IndicatorBattery::with_defaults().compute(&closes);
        assert!(set.fractal_dimension.is_value());
        assert!(set.shannon_entropy.is_value());
        assert_eq!(
            set.hurst_exponent,
            IndicatorValue::InsufficientData {
                required: 100,
                provided: 60
            }
        );
        assert!(matches!(
            set.dfa_exponent,
            IndicatorValue::InsufficientData { .. }
        ));
        assert!(matches!(
            set.lyapunov_exponent,
            IndicatorValue::InsufficientData { .. }
        ));
    }
}
