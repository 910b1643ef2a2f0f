//! 일봉 OHLCV 데이터.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 가격 타입 (정밀 소수).
pub type Price = Decimal;
/// 거래량 타입.
pub type Volume = Decimal;

/// 하루치 OHLCV 봉.
///
/// 날짜는 `YYYY-MM-DD` 형식으로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Volume,
}

impl Bar {
    /// 새 봉을 생성합니다. 검증은 [`Bar::validate`]에서 수행합니다.
    pub fn new(
        date: NaiveDate,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Volume,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 몸통 크기 (|종가 - 시가|).
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 고가 - 저가 범위.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉 여부.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 전형 가격 ((고가 + 저가 + 종가) / 3).
    pub fn typical_price(&self) -> Decimal {
        (self.high + self.low + self.close) / Decimal::from(3)
    }

    /// 직전 종가를 고려한 True Range.
    pub fn true_range(&self, prev_close: Option<Price>) -> Decimal {
        let range = self.range();
        match prev_close {
            Some(prev) => range
                .max((self.high - prev).abs())
                .max((self.low - prev).abs()),
            None => range,
        }
    }

    /// 봉 불변식을 검증합니다.
    ///
    /// 모든 가격은 양수, 거래량은 0 이상이어야 하며
    /// 고가 ≥ max(시가, 종가), 저가 ≤ min(시가, 종가)를 만족해야 합니다.
    pub fn validate(&self) -> Result<(), String> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        if let Some((name, value)) = prices.iter().find(|(_, v)| *v <= Decimal::ZERO) {
            return Err(format!("{} 가격이 양수가 아닙니다: {}", name, value));
        }
        if self.volume < Decimal::ZERO {
            return Err(format!("거래량이 음수입니다: {}", self.volume));
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "고가({})가 시가/종가보다 낮습니다",
                self.high
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!(
                "저가({})가 시가/종가보다 높습니다",
                self.low
            ));
        }
        Ok(())
    }

    /// 종가를 f64로 반환합니다.
    pub fn close_f64(&self) -> f64 {
        to_f64(self.close)
    }
}

/// Decimal을 f64로 변환합니다. 범위를 벗어난 값은 0으로 처리합니다.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_bar_helpers() {
        let bar = Bar::new(day(1), dec!(100), dec!(110), dec!(95), dec!(105), dec!(1000));
        assert_eq!(bar.body_size(), dec!(5));
        assert_eq!(bar.range(), dec!(15));
        assert!(bar.is_bullish());
        assert_eq!(bar.typical_price(), dec!(310) / dec!(3));
        assert_eq!(bar.true_range(Some(dec!(120))), dec!(25));
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn test_bar_validation_rejects_inverted_wicks() {
        let high_below_close =
            Bar::new(day(1), dec!(100), dec!(101), dec!(95), dec!(102), dec!(10));
        assert!(high_below_close.validate().is_err());

        let low_above_open =
            Bar::new(day(1), dec!(100), dec!(105), dec!(100.5), dec!(102), dec!(10));
        assert!(low_above_open.validate().is_err());
    }

    #[test]
    fn test_bar_validation_rejects_non_positive_values() {
        let zero_low = Bar::new(day(1), dec!(1), dec!(2), dec!(0), dec!(1), dec!(10));
        assert!(zero_low.validate().is_err());

        let negative_volume = Bar::new(day(1), dec!(1), dec!(2), dec!(1), dec!(1), dec!(-1));
        assert!(negative_volume.validate().is_err());
    }

    #[test]
    fn test_bar_date_serializes_as_calendar_date() {
        let bar = Bar::new(day(9), dec!(1), dec!(2), dec!(1), dec!(1.5), dec!(10));
        let json = serde_json::to_string(&bar).unwrap();
        assert!(json.contains("\"2024-03-09\""));
    }
}
