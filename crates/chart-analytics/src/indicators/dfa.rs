//! 추세 제거 변동 분석(DFA).

use crate::error::{AnalysisError, StageResult};
use crate::indicators::log_log_slope;
use crate::math::{linear_fit_indexed, mean};

/// 한 스케일의 변동 함수 F(s).
fn fluctuation(profile: &[f64], scale: usize) -> f64 {
    let segments = profile.len() / scale;
    let mut total = 0.0;
    for v in 0..segments {
        let segment = &profile[v * scale..(v + 1) * scale];
        let residual = match linear_fit_indexed(segment) {
            Some((slope, intercept)) => {
                segment
                    .iter()
                    .enumerate()
                    .map(|(i, y)| (y - (slope * i as f64 + intercept)).powi(2))
                    .sum::<f64>()
                    / scale as f64
            }
            None => 0.0,
        };
        total += residual;
    }
    (total / segments as f64).sqrt()
}

/// DFA 지수 α. `scales`는 (최소, 최대, 간격)이며 n/4를 넘는 스케일은 제외합니다.
///
/// α ≈ 0.5는 무상관, 1보다 크면 비정상(non-stationary) 지속성입니다.
pub fn dfa_exponent(
    closes: &[f64],
    min_points: usize,
    scales: (usize, usize, usize),
) -> StageResult<f64> {
    AnalysisError::require_len(closes.len(), min_points)?;
    let (min_scale, max_scale, step) = scales;
    if min_scale < 2 || step == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "DFA 스케일 설정 오류: 최소 {}, 간격 {}",
            min_scale, step
        )));
    }

    let limit = max_scale.min(closes.len() / 4);
    let scales: Vec<usize> = (min_scale..=limit).step_by(step).collect();
    if scales.len() < 4 {
        return Err(AnalysisError::Degenerate(format!(
            "DFA 스케일 수 부족: {}",
            scales.len()
        )));
    }

    let m = mean(closes);
    let profile: Vec<f64> = closes
        .iter()
        .scan(0.0, |acc, x| {
            *acc += x - m;
            Some(*acc)
        })
        .collect();

    let x: Vec<f64> = scales.iter().map(|&s| s as f64).collect();
    let f: Vec<f64> = scales.iter().map(|&s| fluctuation(&profile, s)).collect();
    log_log_slope(&x, &f, "DFA")
}
