//! Higuchi 프랙탈 차원.

use crate::error::{AnalysisError, StageResult};
use crate::indicators::log_log_slope;

/// 지연 `k`에서의 평균 곡선 길이 L(k).
fn curve_length(values: &[f64], k: usize) -> f64 {
    let n = values.len();
    let mut total = 0.0;
    let mut count = 0usize;
    for m in 0..k {
        let steps = (n - 1 - m) / k;
        if steps == 0 {
            continue;
        }
        let length: f64 = (1..=steps)
            .map(|i| (values[m + i * k] - values[m + (i - 1) * k]).abs())
            .sum();
        let normalization = (n - 1) as f64 / (steps * k) as f64;
        total += length * normalization / k as f64;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// FD = -(log L(k) 대 log k 기울기), k = 1..=k_max.
pub fn higuchi_fractal_dimension(closes: &[f64], min_points: usize, k_max: usize) -> StageResult<f64> {
    AnalysisError::require_len(closes.len(), min_points.max(k_max + 1))?;
    if k_max < 2 {
        return Err(AnalysisError::InvalidParameter(format!(
            "k_max는 2 이상이어야 합니다: {}",
            k_max
        )));
    }

    let ks: Vec<f64> = (1..=k_max).map(|k| k as f64).collect();
    let lengths: Vec<f64> = (1..=k_max).map(|k| curve_length(closes, k)).collect();
    log_log_slope(&ks, &lengths, "Higuchi").map(|slope| -slope)
}
