//! 최대 Lyapunov 지수 추정.
//!
//! 지연 좌표로 위상 공간을 재구성하고, 각 점의 최근접 이웃과의 거리가
//! `steps`봉 뒤 얼마나 벌어지는지 평균 로그 비율로 측정합니다.

use crate::error::{AnalysisError, StageResult};
use crate::math::mean;

fn distance(embedded: &[Vec<f64>], a: usize, b: usize) -> f64 {
    embedded[a]
        .iter()
        .zip(&embedded[b])
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// λ = mean(ln(d_final / d_initial)) / steps.
///
/// 이웃 후보는 시간적으로 `(m-1)τ + 1`봉보다 떨어진 점만 사용합니다.
pub fn lyapunov_exponent(
    closes: &[f64],
    min_points: usize,
    embedding: usize,
    delay: usize,
    steps: usize,
) -> StageResult<f64> {
    AnalysisError::require_len(closes.len(), min_points)?;
    if embedding == 0 || delay == 0 || steps == 0 {
        return Err(AnalysisError::InvalidParameter(
            "embedding, delay, steps는 1 이상이어야 합니다".into(),
        ));
    }

    let span = (embedding - 1) * delay;
    if closes.len() <= span + steps + 1 {
        return Err(AnalysisError::insufficient(span + steps + 2, closes.len()));
    }
    let embedded: Vec<Vec<f64>> = (0..closes.len() - span)
        .map(|i| (0..embedding).map(|d| closes[i + d * delay]).collect())
        .collect();

    let usable = embedded.len() - steps;
    let exclusion = span + 1;
    let mut divergences = Vec::new();

    for i in 0..usable {
        let nearest = (0..usable)
            .filter(|&j| i.abs_diff(j) > exclusion)
            .map(|j| (j, distance(&embedded, i, j)))
            .filter(|&(_, d)| d > 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let Some((j, initial)) = nearest else {
            continue;
        };
        let final_distance = distance(&embedded, i + steps, j + steps);
        if final_distance > 0.0 {
            divergences.push((final_distance / initial).ln());
        }
    }

    if divergences.is_empty() {
        return Err(AnalysisError::Degenerate(
            "유효한 이웃 궤적이 없습니다".into(),
        ));
    }
    Ok(mean(&divergences) / steps as f64)
}
