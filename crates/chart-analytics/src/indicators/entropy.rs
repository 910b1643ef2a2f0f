//! 로그 수익률 Shannon 엔트로피.

use crate::error::{AnalysisError, StageResult};
use crate::math::{max_of, min_of};

/// `bins`개 구간 히스토그램의 Shannon 엔트로피 (비트).
///
/// 모든 가격이 양수여야 하며, 수익률이 전부 같으면 `Degenerate`입니다.
pub fn shannon_entropy(closes: &[f64], min_points: usize, bins: usize) -> StageResult<f64> {
    AnalysisError::require_len(closes.len(), min_points.max(2))?;
    if bins == 0 {
        return Err(AnalysisError::InvalidParameter("bins는 1 이상이어야 합니다".into()));
    }
    if closes.iter().any(|&p| p.is_nan() || p <= 0.0) {
        return Err(AnalysisError::Degenerate(
            "로그 수익률에는 양수 가격이 필요합니다".into(),
        ));
    }

    let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let (lo, hi) = (min_of(&returns), max_of(&returns));
    let width = hi - lo;
    if width.is_nan() || width <= 0.0 {
        return Err(AnalysisError::Degenerate("수익률 분산이 0입니다".into()));
    }

    let mut counts = vec![0usize; bins];
    for r in &returns {
        // 마지막 구간은 상한 포함
        let bin = (((r - lo) / width) * bins as f64) as usize;
        counts[bin.min(bins - 1)] += 1;
    }

    let total = returns.len() as f64;
    Ok(counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum())
}
