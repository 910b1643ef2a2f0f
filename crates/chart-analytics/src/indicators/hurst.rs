//! Hurst 지수.

use crate::error::{AnalysisError, StageResult};
use crate::indicators::log_log_slope;

/// 2부터 `max_lag`까지 기하 간격의 지연 목록 (중복 제거).
fn geometric_lags(max_lag: usize) -> Vec<usize> {
    const COUNT: usize = 20;
    if max_lag < 2 {
        return Vec::new();
    }
    let ratio = (max_lag as f64 / 2.0).ln() / (COUNT - 1) as f64;
    let mut lags: Vec<usize> = (0..COUNT)
        .map(|i| (2.0 * (ratio * i as f64).exp()).round() as usize)
        .map(|lag| lag.clamp(2, max_lag))
        .collect();
    lags.dedup();
    lags
}

/// 지연 차분의 RMS를 지연에 대해 log-log 회귀한 기울기.
///
/// 랜덤워크는 약 0.5, 추세 지속 시계열은 0.5보다 큽니다.
pub fn hurst_exponent(closes: &[f64], min_points: usize, max_lag: usize) -> StageResult<f64> {
    AnalysisError::require_len(closes.len(), min_points)?;

    let lags = geometric_lags(max_lag.min(closes.len() / 4));
    if lags.len() < 4 {
        return Err(AnalysisError::Degenerate(format!(
            "Hurst 지연 수 부족: {}",
            lags.len()
        )));
    }

    let mut rms = Vec::with_capacity(lags.len());
    for &lag in &lags {
        let sum_sq: f64 = closes
            .iter()
            .zip(&closes[lag..])
            .map(|(a, b)| (b - a).powi(2))
            .sum();
        rms.push((sum_sq / (closes.len() - lag) as f64).sqrt());
    }

    let x: Vec<f64> = lags.iter().map(|&l| l as f64).collect();
    log_log_slope(&x, &rms, "Hurst")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lags_are_geometric_and_unique() {
        let lags = geometric_lags(100);
        assert_eq!(lags.first(), Some(&2));
        assert_eq!(lags.last(), Some(&100));
        assert!(lags.windows(2).all(|w| w[0] < w[1]));
        assert!(lags.len() >= 15);
    }

    #[test]
    fn test_linear_trend_is_persistent() {
        let closes: Vec<f64> = (0..400).map(|i| 100.0 + 0.5 * i as f64).collect();
        let h = hurst_exponent(&closes, 100, 100).unwrap();
        assert!((h - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let closes = vec![100.0; 200];
        assert!(matches!(
            hurst_exponent(&closes, 100, 100),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_short_series() {
        assert_eq!(
            hurst_exponent(&[1.0; 50], 100, 100),
            Err(AnalysisError::insufficient(100, 50))
        );
    }
}
