//! 패턴별 트레이딩 셋업 제안.
//!
//! 채택된 패턴의 기하 정보로 진입 트리거, 목표가, 손절가를 계산합니다.
//! 모든 가격은 평활 가격 또는 패턴 기하에서 유도되며, 주문 실행과는 무관한
//! 정보성 출력입니다.

use serde::{Deserialize, Serialize};

use crate::patterns::{Bias, PatternGeometry, PatternKind, PatternRecord};

/// 트레이딩 셋업.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSetup {
    pub direction: Bias,
    /// 예: "Breakout above resistance"
    pub label: String,
    pub entry_trigger: f64,
    /// 1차, 2차 목표가
    pub targets: Vec<f64>,
    pub stop_loss: f64,
    /// 1차 목표 기준 손익비. 위험이 0이면 `None`.
    pub risk_reward: Option<f64>,
}

impl TradingSetup {
    fn new(direction: Bias, label: &str, entry: f64, targets: Vec<f64>, stop: f64) -> Self {
        let targets: Vec<f64> = targets.into_iter().map(|t| t.max(0.0)).collect();
        let stop = stop.max(0.0);
        let risk = (entry - stop).abs();
        let risk_reward = match targets.first() {
            Some(first) if risk > f64::EPSILON => Some((first - entry).abs() / risk),
            _ => None,
        };
        Self {
            direction,
            label: label.to_string(),
            entry_trigger: entry,
            targets,
            stop_loss: stop,
            risk_reward,
        }
    }

    fn breakout(resistance: f64, support: f64) -> Self {
        let height = resistance - support;
        Self::new(
            Bias::Bullish,
            "Breakout above resistance",
            resistance * 1.005,
            vec![resistance + height * 0.618, resistance + height],
            support * 0.99,
        )
    }

    fn breakdown(resistance: f64, support: f64) -> Self {
        let height = resistance - support;
        Self::new(
            Bias::Bearish,
            "Breakdown below support",
            support * 0.995,
            vec![support - height * 0.618, support - height],
            resistance * 1.01,
        )
    }
}

fn key_price(record: &PatternRecord, label: &str) -> Option<f64> {
    record
        .key_points
        .iter()
        .find(|p| p.label == label)
        .map(|p| p.price)
}

/// 패턴 하나에 대한 셋업 목록.
///
/// 삼각형/쐐기는 `last_index` 시점의 두 추세선 값을 사용합니다.
pub fn suggest_setups(record: &PatternRecord, last_index: usize) -> Vec<TradingSetup> {
    match (&record.kind, &record.geometry) {
        (
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle
            | PatternKind::RisingWedge
            | PatternKind::FallingWedge,
            PatternGeometry::Converging {
                resistance,
                support,
                ..
            },
        ) => {
            let r = resistance.value_at(last_index as f64);
            let s = support.value_at(last_index as f64);
            let height = r - s;
            if height.is_nan() || height <= 0.0 {
                return Vec::new();
            }
            match record.kind {
                PatternKind::AscendingTriangle | PatternKind::FallingWedge => {
                    vec![TradingSetup::breakout(r, s)]
                }
                PatternKind::DescendingTriangle | PatternKind::RisingWedge => {
                    vec![TradingSetup::breakdown(r, s)]
                }
                _ => vec![TradingSetup::breakout(r, s), TradingSetup::breakdown(r, s)],
            }
        }
        (PatternKind::HeadAndShoulders, PatternGeometry::Neckline { .. }) => {
            let (Some(neckline), Some(shoulder), Some(target)) = (
                key_price(record, "right_valley"),
                key_price(record, "right_shoulder"),
                record.price_target,
            ) else {
                return Vec::new();
            };
            vec![TradingSetup::new(
                Bias::Bearish,
                "Neckline breakdown",
                neckline * 0.995,
                vec![target],
                shoulder * 1.02,
            )]
        }
        (
            PatternKind::DoubleTop,
            PatternGeometry::DoubleExtremum {
                first_price,
                second_price,
                intervening_price,
                ..
            },
        ) => {
            let valley = *intervening_price;
            let height = first_price.min(*second_price) - valley;
            vec![TradingSetup::new(
                Bias::Bearish,
                "Break below intervening valley",
                valley * 0.995,
                vec![valley - height],
                first_price.max(*second_price) * 1.02,
            )]
        }
        (
            PatternKind::DoubleBottom,
            PatternGeometry::DoubleExtremum {
                first_price,
                second_price,
                intervening_price,
                ..
            },
        ) => {
            let peak = *intervening_price;
            let height = peak - first_price.max(*second_price);
            vec![TradingSetup::new(
                Bias::Bullish,
                "Break above intervening peak",
                peak * 1.005,
                vec![peak + height],
                first_price.min(*second_price) * 0.98,
            )]
        }
        (
            PatternKind::BullFlag,
            PatternGeometry::Flag {
                pole_change,
                flag_high,
                flag_low,
                flag_close,
                ..
            },
        ) => vec![TradingSetup::new(
            Bias::Bullish,
            "Flag breakout",
            flag_high * 1.002,
            vec![flag_close + pole_change.abs()],
            flag_low * 0.98,
        )],
        (
            PatternKind::BearFlag,
            PatternGeometry::Flag {
                pole_change,
                flag_high,
                flag_low,
                flag_close,
                ..
            },
        ) => vec![TradingSetup::new(
            Bias::Bearish,
            "Flag breakdown",
            flag_low * 0.998,
            vec![flag_close - pole_change.abs()],
            flag_high * 1.02,
        )],
        (
            PatternKind::CupAndHandle,
            PatternGeometry::Cup {
                rim_price,
                bottom_price,
                handle_low,
                ..
            },
        ) => vec![TradingSetup::new(
            Bias::Bullish,
            "Breakout above rim",
            rim_price * 1.005,
            vec![rim_price + (rim_price - bottom_price)],
            handle_low * 0.98,
        )],
        (
            PatternKind::RoundingBottom,
            PatternGeometry::Rounding {
                extreme_price,
                rim_price,
                ..
            },
        ) => vec![TradingSetup::new(
            Bias::Bullish,
            "Breakout above rim",
            rim_price * 1.005,
            vec![rim_price + (rim_price - extreme_price)],
            extreme_price * 0.98,
        )],
        (
            PatternKind::RoundingTop,
            PatternGeometry::Rounding {
                extreme_price,
                rim_price,
                ..
            },
        ) => vec![TradingSetup::new(
            Bias::Bearish,
            "Breakdown below rim",
            rim_price * 0.995,
            vec![rim_price - (extreme_price - rim_price)],
            extreme_price * 1.02,
        )],
        _ => Vec::new(),
    }
}
