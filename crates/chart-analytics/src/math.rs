//! 통계 및 회귀 헬퍼.
//!
//! 모든 함수는 `f64` 배열을 받으며, 빈 입력에는 0을 반환합니다.

/// 산술 평균.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 모표준편차.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// 중앙값.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 최소제곱 직선 적합. `(기울기, 절편)`을 반환하며 x 분산이 0이면 `None`.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let x_mean = mean(&x[..n]);
    let y_mean = mean(&y[..n]);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let dx = x[i] - x_mean;
        numerator += dx * (y[i] - y_mean);
        denominator += dx * dx;
    }

    if denominator.abs() < f64::EPSILON {
        return None;
    }
    let slope = numerator / denominator;
    Some((slope, y_mean - slope * x_mean))
}

/// x = 0, 1, 2, ... 에 대한 직선 적합.
pub fn linear_fit_indexed(y: &[f64]) -> Option<(f64, f64)> {
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    linear_fit(&x, y)
}

/// 마지막 `period`개 값의 단순 이동평균.
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(mean(&values[values.len() - period..]))
}

/// 슬라이스 최댓값.
pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// 슬라이스 최솟값.
pub fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// 유한하지 않은 값을 대체값으로 바꿉니다.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// 분모가 0에 가까우면 0을 반환하는 나눗셈.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        finite_or(numerator / denominator, 0.0)
    }
}
