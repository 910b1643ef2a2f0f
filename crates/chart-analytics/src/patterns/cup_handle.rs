//! 컵앤핸들(Cup and Handle) 분류기.
//!
//! 연속된 두 피크를 컵의 양 림(rim)으로 보고, 사이의 최저 밸리를 컵 바닥으로,
//! 오른쪽 림 이후의 짧은 되돌림을 핸들로 평가합니다.
//!
//! 핸들 깊이는 오른쪽 림 위치의 평활 종가와 이후 구간 평활 종가의 최저값으로
//! 측정합니다.

use chart_core::CupHandleConfig;

use super::{
    all_passed, extreme_between, ClassifierOutput, ConditionResult, KeyPoint, PatternClassifier,
    PatternContext, PatternFamily, PatternGeometry, PatternKind, PatternRecord, RejectedPattern,
    TimeRange,
};
use crate::error::StageResult;
use crate::math::{min_of, safe_ratio};

/// 컵앤핸들 분류기.
#[derive(Debug, Clone)]
pub struct CupHandleClassifier {
    config: CupHandleConfig,
}

impl CupHandleClassifier {
    pub fn new(config: CupHandleConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(CupHandleConfig::default())
    }
}

impl PatternClassifier for CupHandleClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::CupAndHandle
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();
        let closes = &ctx.smoothed.close.values;
        let last_index = ctx.last_index();

        for pair in ctx.extrema.peaks.windows(2) {
            let (left_rim, right_rim) = (&pair[0], &pair[1]);
            let Some(bottom) =
                extreme_between(&ctx.extrema.valleys, left_rim.index, right_rim.index, true)
            else {
                continue;
            };

            let rim_level = left_rim.price.min(right_rim.price);
            let depth = (rim_level - bottom.price) / rim_level;
            let asymmetry = (left_rim.price - right_rim.price).abs() / left_rim.price;
            let duration = (right_rim.index - left_rim.index) as f64;

            // 오른쪽 림 이후 최대 handle_window 봉
            let handle_bars = (last_index - right_rim.index).min(self.config.handle_window);
            let handle_end = right_rim.index + handle_bars;
            let rim_close = closes[right_rim.index];
            let (handle_low, handle_low_index) = if handle_bars > 0 {
                let window = &closes[right_rim.index + 1..=handle_end];
                let low = min_of(window);
                let offset = window.iter().position(|&v| v == low).unwrap_or(0);
                (low, right_rim.index + 1 + offset)
            } else {
                // 핸들 봉이 없으면 깊이 0
                (rim_close, right_rim.index)
            };
            let handle_depth = safe_ratio(rim_close - handle_low, rim_close);

            let conditions = vec![
                ConditionResult::between(
                    "cup_depth",
                    depth,
                    self.config.min_depth,
                    self.config.max_depth,
                ),
                ConditionResult::below("rim_symmetry", asymmetry, self.config.max_asymmetry),
                ConditionResult::above("cup_duration", duration, self.config.min_duration as f64),
                ConditionResult::above("handle_window", handle_bars as f64, 5.0),
                ConditionResult::between(
                    "handle_depth",
                    handle_depth,
                    self.config.handle_min_depth,
                    self.config.handle_max_depth,
                ),
            ];

            let time_range = TimeRange::new(ctx.series, left_rim.index, handle_end)?;
            let mut key_points = vec![
                KeyPoint::from_extremum("left_rim", left_rim),
                KeyPoint::from_extremum("cup_bottom", bottom),
                KeyPoint::from_extremum("right_rim", right_rim),
            ];
            if handle_bars > 0 {
                key_points.push(KeyPoint::at(
                    "handle_low",
                    ctx.series,
                    handle_low_index,
                    handle_low,
                )?);
            }

            if !all_passed(&conditions) {
                output.rejected.push(RejectedPattern::for_kind(
                    PatternKind::CupAndHandle,
                    PatternFamily::CupAndHandle,
                    time_range,
                    key_points,
                    conditions,
                ));
                continue;
            }

            let cup_height = right_rim.price - bottom.price;
            output.accepted.push(PatternRecord::new(
                PatternKind::CupAndHandle,
                time_range,
                self.config.confidence,
                key_points,
                conditions,
                PatternGeometry::Cup {
                    rim_price: right_rim.price,
                    bottom_price: bottom.price,
                    depth,
                    asymmetry,
                    handle_low,
                    handle_depth,
                },
                Some(right_rim.price + cup_height),
            ));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrema::{Extrema, ExtremumKind, ExtremumPoint};
    use crate::smoothing::SmoothedPrices;
    use crate::test_support::{series_from_closes, series_with_range};
    use chart_core::PriceSeries;

    /// 림 (10, 120) / 바닥 (25, 90) / 림 (40, 119.5) 이후 47번 봉까지 `handle_low`로
    /// 되돌렸다가 118로 회복하는 80봉 종가.
    fn cup_closes(handle_low: f64) -> Vec<f64> {
        let lerp = |a: f64, b: f64, i0: usize, i1: usize, i: usize| {
            a + (b - a) * (i - i0) as f64 / (i1 - i0) as f64
        };
        (0..80)
            .map(|i| match i {
                0..=10 => 110.0 + i as f64,
                11..=25 => lerp(120.0, 90.0, 10, 25, i),
                26..=40 => lerp(90.0, 119.5, 25, 40, i),
                41..=47 => lerp(119.5, handle_low, 40, 47, i),
                48..=60 => lerp(handle_low, 118.0, 47, 60, i),
                _ => 118.0,
            })
            .collect()
    }

    fn run(series: &PriceSeries, peaks: &[(usize, f64)], valleys: &[(usize, f64)]) -> ClassifierOutput {
        let point = |(index, price): (usize, f64), kind| ExtremumPoint {
            index,
            date: series.date_at(index).unwrap(),
            price,
            kind,
            strength: 1.0,
        };
        let extrema = Extrema {
            peaks: peaks.iter().map(|&p| point(p, ExtremumKind::Peak)).collect(),
            valleys: valleys.iter().map(|&v| point(v, ExtremumKind::Valley)).collect(),
            prominence_threshold: 0.5,
        };
        let closes = series.closes();
        let smoothed = SmoothedPrices::from_series(series, &Default::default());
        let ctx = PatternContext {
            series,
            closes: &closes,
            smoothed: &smoothed,
            extrema: &extrema,
            resistance: &[],
            support: &[],
            mean_price: crate::math::mean(&closes),
        };
        CupHandleClassifier::with_defaults().classify(&ctx).unwrap()
    }

    const RIMS: [(usize, f64); 2] = [(10, 120.0), (40, 119.5)];
    const BOTTOM: [(usize, f64); 1] = [(25, 90.0)];

    #[test]
    fn test_cup_with_handle_accepted() {
        // 평활 종가: 림 약 117.1, 핸들 최저 약 113.0 → 깊이 약 3.5%
        let series = series_from_closes(&cup_closes(112.0));
        let output = run(&series, &RIMS, &BOTTOM);

        assert_eq!(output.accepted.len(), 1);
        let cup = &output.accepted[0];
        assert_eq!(cup.pattern_id, "CH_0010");
        assert_eq!(cup.time_range.end_index, 55);
        assert!((cup.price_target.unwrap() - 149.0).abs() < 1e-9);
        assert!((cup.base_confidence - 0.83).abs() < 1e-12);
        match &cup.geometry {
            PatternGeometry::Cup { handle_depth, depth, .. } => {
                assert!(*handle_depth > 0.03 && *handle_depth < 0.04);
                // 낮은 림 기준: (119.5 - 90) / 119.5
                assert!((depth - 29.5 / 119.5).abs() < 1e-12);
            }
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_missing_handle_rejected() {
        let series = series_from_closes(&vec![115.0; 80]);
        let output = run(&series, &[(40, 120.0), (76, 119.0)], &[(60, 90.0)]);
        assert!(output.accepted.is_empty());
        assert_eq!(output.rejected.len(), 1);
        assert!(output.rejected[0]
            .failed
            .contains(&"handle_window".to_string()));
    }

    #[test]
    fn test_deep_handle_rejected() {
        // 평활 종가 기준 핸들 깊이 약 18.8%
        let series = series_from_closes(&cup_closes(88.0));
        let output = run(&series, &RIMS, &BOTTOM);
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].failed, vec!["handle_depth".to_string()]);
    }

    #[test]
    fn test_wide_bar_range_is_not_a_handle() {
        // 림 이후 종가가 그대로이고 고가/저가만 ±2.5인 봉
        let series = series_with_range(&vec![115.0; 80], 2.5);
        let output = run(&series, &[(10, 120.0), (40, 119.0)], &BOTTOM);

        assert!(output.accepted.is_empty());
        let rejected = &output.rejected[0];
        assert_eq!(rejected.failed, vec!["handle_depth".to_string()]);
        let depth = rejected
            .conditions
            .iter()
            .find(|c| c.name == "handle_depth")
            .unwrap();
        assert!(depth.value.abs() < 1e-9);
    }
}
