//! 깃발(Flag) 분류기.
//!
//! 평활 종가에서 강한 방향성 구간(깃대)을 찾고, 바로 뒤 구간이
//! 완만한 기울기와 낮은 변동성으로 횡보(깃발)하는지 확인합니다.

use chart_core::FlagConfig;

use super::{
    all_passed, ClassifierOutput, ConditionResult, KeyPoint, PatternClassifier, PatternContext,
    PatternFamily, PatternGeometry, PatternKind, PatternRecord, RejectedPattern, TimeRange,
};
use crate::error::StageResult;
use crate::math::{linear_fit_indexed, max_of, min_of, std_dev};

/// 깃발 분류기.
#[derive(Debug, Clone)]
pub struct FlagClassifier {
    config: FlagConfig,
}

impl FlagClassifier {
    pub fn new(config: FlagConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FlagConfig::default())
    }
}

impl PatternClassifier for FlagClassifier {
    fn family(&self) -> PatternFamily {
        PatternFamily::Flag
    }

    fn classify(&self, ctx: &PatternContext<'_>) -> StageResult<ClassifierOutput> {
        let mut output = ClassifierOutput::default();
        let values = &ctx.smoothed.close.values;
        let pole_len = self.config.pole_window;
        let flag_len = self.config.flag_window;
        let total = pole_len + flag_len;
        let bars = ctx.series.bars();

        let mut start = 0;
        while start + total <= values.len() {
            let pole = &values[start..start + pole_len];
            let flag = &values[start + pole_len..start + total];
            let pole_start = pole[0];
            let pole_end = pole[pole_len - 1];
            let pole_move = (pole_end - pole_start) / pole_start;

            if !pole_move.is_finite() || pole_move.abs() < self.config.min_pole_move {
                start += 1;
                continue;
            }

            let pole_slope = (pole_end - pole_start) / (pole_len - 1) as f64;
            let flag_slope = linear_fit_indexed(flag).map(|(s, _)| s).unwrap_or(0.0);
            let pole_std = std_dev(pole);
            let flag_std = std_dev(flag);

            let conditions = vec![
                ConditionResult::above("pole_move", pole_move.abs(), self.config.min_pole_move),
                ConditionResult::below(
                    "flag_slope",
                    flag_slope.abs(),
                    pole_slope.abs() * self.config.max_slope_ratio,
                ),
                ConditionResult::below("flag_variance", flag_std, pole_std),
            ];

            let kind = if pole_move > 0.0 {
                PatternKind::BullFlag
            } else {
                PatternKind::BearFlag
            };
            let pole_top = start + pole_len - 1;
            let end = start + total - 1;
            let time_range = TimeRange::new(ctx.series, start, end)?;
            let key_points = vec![
                KeyPoint::at("pole_start", ctx.series, start, ctx.closes[start])?,
                KeyPoint::at("pole_end", ctx.series, pole_top, ctx.closes[pole_top])?,
                KeyPoint::at("flag_end", ctx.series, end, ctx.closes[end])?,
            ];

            if !all_passed(&conditions) {
                output.rejected.push(RejectedPattern::for_kind(
                    kind,
                    PatternFamily::Flag,
                    time_range,
                    key_points,
                    conditions,
                ));
                start += flag_len;
                continue;
            }

            let flag_bars = &bars[start + pole_len..start + total];
            let flag_high = max_of(
                &flag_bars
                    .iter()
                    .map(|b| chart_core::to_f64(b.high))
                    .collect::<Vec<_>>(),
            );
            let flag_low = min_of(
                &flag_bars
                    .iter()
                    .map(|b| chart_core::to_f64(b.low))
                    .collect::<Vec<_>>(),
            );
            let flag_close = ctx.closes[end];
            let pole_change = pole_end - pole_start;

            output.accepted.push(PatternRecord::new(
                kind,
                time_range,
                self.config.confidence,
                key_points,
                conditions,
                PatternGeometry::Flag {
                    pole_move,
                    pole_change,
                    pole_slope,
                    flag_slope,
                    pole_std,
                    flag_std,
                    flag_high,
                    flag_low,
                    flag_close,
                },
                Some(flag_close + pole_change),
            ));
            start += total;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrema::Extrema;
    use crate::smoothing::SmoothedPrices;
    use crate::test_support::series_from_closes;

    fn classify(closes: &[f64]) -> ClassifierOutput {
        let series = series_from_closes(closes);
        let closes = series.closes();
        let smoothed = SmoothedPrices::from_series(&series, &Default::default());
        let extrema = Extrema::default();
        let ctx = PatternContext {
            series: &series,
            closes: &closes,
            smoothed: &smoothed,
            extrema: &extrema,
            resistance: &[],
            support: &[],
            mean_price: 100.0,
        };
        FlagClassifier::with_defaults().classify(&ctx).unwrap()
    }

    #[test]
    fn test_bull_flag_after_sharp_rally() {
        // 30봉 횡보, 15봉 급등(+15), 이후 거의 평탄한 횡보
        let mut closes = vec![100.0; 30];
        closes.extend((1..=15).map(|i| 100.0 + i as f64));
        closes.extend((0..30).map(|i| 115.0 - 0.02 * i as f64));

        let output = classify(&closes);
        assert!(!output.accepted.is_empty());
        let flag = &output.accepted[0];
        assert_eq!(flag.kind, PatternKind::BullFlag);
        assert_eq!(flag.bias, super::super::Bias::Bullish);
        assert!(flag.price_target.unwrap() > 115.0);
    }

    #[test]
    fn test_flat_series_has_no_attempts() {
        let output = classify(&vec![50.0; 80]);
        assert!(output.accepted.is_empty());
        assert!(output.rejected.is_empty());
    }

    #[test]
    fn test_trend_without_pause_is_rejected() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let output = classify(&closes);
        assert!(output.accepted.is_empty());
        assert!(!output.rejected.is_empty());
        assert!(output.rejected[0]
            .failed
            .contains(&"flag_slope".to_string()));
    }
}
