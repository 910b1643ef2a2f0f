//! 지배 주기 탐지.
//!
//! 평활 종가에서 선형 추세를 제거한 뒤 이산 푸리에 변환으로 진폭이 큰
//! 주기를 찾습니다. 입력 길이가 수백 봉 수준이므로 직접 DFT를 사용합니다.

use std::f64::consts::PI;

use chart_core::CycleConfig;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, StageResult};
use crate::math::linear_fit_indexed;

/// 지배 주기.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantCycle {
    /// 주기 (봉)
    pub period_bars: f64,
    /// 봉당 주파수
    pub frequency: f64,
    pub magnitude: f64,
    /// 전체 검사 대역 파워 대비 비율
    pub relative_power: f64,
}

/// 주기 탐지기.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    config: CycleConfig,
}

impl CycleDetector {
    pub fn new(config: CycleConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CycleConfig::default())
    }

    /// 상위 `top_n`개 주기. 진폭 내림차순, 동률은 낮은 주파수 우선.
    pub fn detect(&self, smoothed_close: &[f64]) -> StageResult<Vec<DominantCycle>> {
        let n = smoothed_close.len();
        AnalysisError::require_len(n, self.config.min_points.max(8))?;

        let detrended: Vec<f64> = match linear_fit_indexed(smoothed_close) {
            Some((slope, intercept)) => smoothed_close
                .iter()
                .enumerate()
                .map(|(i, v)| v - (slope * i as f64 + intercept))
                .collect(),
            None => smoothed_close.to_vec(),
        };

        // 주기 2 < n/k <= n/2
        let spectrum: Vec<(usize, f64)> = (2..=n / 2)
            .filter(|&k| n as f64 / k as f64 > 2.0)
            .map(|k| {
                let (mut re, mut im) = (0.0, 0.0);
                for (t, value) in detrended.iter().enumerate() {
                    let angle = 2.0 * PI * (k * t) as f64 / n as f64;
                    re += value * angle.cos();
                    im -= value * angle.sin();
                }
                (k, (re * re + im * im).sqrt())
            })
            .collect();

        let total_power: f64 = spectrum.iter().map(|(_, m)| m * m).sum();
        let energy: f64 = smoothed_close.iter().map(|v| v * v).sum::<f64>() * n as f64;
        if !total_power.is_finite() || total_power <= f64::EPSILON * energy {
            return Err(AnalysisError::Degenerate(
                "추세 제거 후 주기 성분이 없습니다".into(),
            ));
        }

        let mut ranked = spectrum;
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(ranked
            .into_iter()
            .take(self.config.top_n)
            .map(|(k, magnitude)| DominantCycle {
                period_bars: n as f64 / k as f64,
                frequency: k as f64 / n as f64,
                magnitude,
                relative_power: magnitude * magnitude / total_power,
            })
            .collect())
    }
}
