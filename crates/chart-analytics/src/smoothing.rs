//! 가우시안 평활 및 미분.
//!
//! 종가/고가/저가 배열에서 단일 봉 노이즈를 제거하고, 평활된 종가의
//! 1차 미분(모멘텀)과 2차 미분(곡률)을 계산합니다.

use chart_core::{PriceSeries, SmoothingConfig};
use serde::{Deserialize, Serialize};

/// 평활된 배열과 그 미분.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSeries {
    /// 평활된 값
    pub values: Vec<f64>,
    /// 1차 미분 (봉당 기울기)
    pub slope: Vec<f64>,
    /// 2차 미분 (곡률)
    pub curvature: Vec<f64>,
    /// 실제로 평활이 적용되었는지 (커널보다 짧으면 원본 유지)
    pub applied: bool,
}

impl SmoothedSeries {
    /// 원본 배열을 평활하고 미분을 계산합니다.
    pub fn compute(values: &[f64], sigma: f64) -> Self {
        let (smoothed, applied) = match gaussian_smooth(values, sigma) {
            Some(s) => (s, true),
            None => (values.to_vec(), false),
        };
        let slope = gradient(&smoothed);
        let curvature = gradient(&slope);
        Self {
            values: smoothed,
            slope,
            curvature,
            applied,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 한 번의 분석에서 사용하는 평활 가격 묶음.
///
/// 분석 실행마다 새로 만들어지며 다른 시계열과 공유되지 않습니다.
#[derive(Debug, Clone)]
pub struct SmoothedPrices {
    pub close: SmoothedSeries,
    pub high: SmoothedSeries,
    pub low: SmoothedSeries,
}

impl SmoothedPrices {
    /// 시계열의 종가/고가/저가를 평활합니다.
    pub fn from_series(series: &PriceSeries, config: &SmoothingConfig) -> Self {
        Self {
            close: SmoothedSeries::compute(&series.closes(), config.sigma),
            high: SmoothedSeries::compute(&series.highs(), config.sigma),
            low: SmoothedSeries::compute(&series.lows(), config.sigma),
        }
    }
}

/// 커널 반경 (4σ에서 절단).
pub fn kernel_radius(sigma: f64) -> usize {
    (4.0 * sigma + 0.5).floor().max(0.0) as usize
}

/// 합이 1로 정규화된 가우시안 커널.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = kernel_radius(sigma) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// 반사 경계(`d c b a | a b c d | d c b a`)를 사용한 가우시안 평활.
///
/// 배열이 커널 폭보다 짧거나 σ가 양수가 아니면 `None`.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Option<Vec<f64>> {
    if sigma.is_nan() || sigma <= 0.0 {
        return None;
    }
    let radius = kernel_radius(sigma);
    let n = values.len();
    if n < 2 * radius + 1 {
        return None;
    }

    let kernel = gaussian_kernel(sigma);
    let reflect = |j: isize| -> usize {
        if j < 0 {
            (-j - 1) as usize
        } else if j >= n as isize {
            (2 * n as isize - j - 1) as usize
        } else {
            j as usize
        }
    };

    let smoothed = (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[reflect(i + k as isize - radius as isize)])
                .sum::<f64>()
        })
        .collect();
    Some(smoothed)
}

/// 이산 미분. 내부는 중심 차분, 양 끝은 단측 차분입니다.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 17);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[0] - kernel[16]).abs() < 1e-15);
        assert!(kernel[8] > kernel[7]);
    }

    #[test]
    fn test_short_series_returned_unsmoothed() {
        let values = vec![1.0, 5.0, 2.0, 8.0];
        let smoothed = SmoothedSeries::compute(&values, 2.0);
        assert!(!smoothed.applied);
        assert_eq!(smoothed.values, values);
        assert_eq!(smoothed.slope.len(), 4);
    }

    #[test]
    fn test_constant_series_stays_constant() {
        let values = vec![42.0; 40];
        let smoothed = gaussian_smooth(&values, 2.0).unwrap();
        assert!(smoothed.iter().all(|v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn test_linear_series_preserved_in_interior() {
        let values: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let smoothed = SmoothedSeries::compute(&values, 2.0);
        assert!((smoothed.values[25] - 25.0).abs() < 1e-9);
        assert!((smoothed.slope[25] - 1.0).abs() < 1e-9);
        assert!(smoothed.curvature[25].abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_suppresses_spike() {
        let mut values = vec![10.0; 40];
        values[20] = 20.0;
        let smoothed = gaussian_smooth(&values, 2.0).unwrap();
        assert!(smoothed[20] < 13.0);
        assert!(smoothed[20] > 10.0);
    }

    #[test]
    fn test_gradient_edges() {
        assert_eq!(gradient(&[1.0, 3.0, 7.0]), vec![2.0, 3.0, 4.0]);
        assert_eq!(gradient(&[5.0]), vec![0.0]);
        assert!(gradient(&[]).is_empty());
    }
}
