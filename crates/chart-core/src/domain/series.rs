//! 검증된 일봉 시계열.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bar::{to_f64, Bar};
use crate::error::{ChartError, ChartResult};

/// 한 종목의 일봉 시계열.
///
/// 생성 시점에 비어있지 않음, 날짜의 엄격한 증가, 봉 불변식을 검증하며
/// 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// 봉 목록에서 시계열을 생성합니다.
    ///
    /// # 에러
    /// - 빈 목록: [`ChartError::EmptySeries`]
    /// - 날짜가 증가하지 않음: [`ChartError::NonMonotonicDates`]
    /// - 봉 불변식 위반: [`ChartError::InvalidBar`]
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> ChartResult<Self> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(ChartError::EmptySeries(symbol));
        }

        for (index, bar) in bars.iter().enumerate() {
            bar.validate()
                .map_err(|reason| ChartError::InvalidBar { index, reason })?;
        }

        if let Some(index) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(ChartError::NonMonotonicDates {
                index: index + 1,
                previous: bars[index].date,
                current: bars[index + 1].date,
            });
        }

        Ok(Self { symbol, bars })
    }

    /// 종목 심볼.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// 전체 봉.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// 봉 개수.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// 항상 `false` (빈 시계열은 생성할 수 없음).
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// 가장 최근 봉.
    pub fn last_bar(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// 첫 거래일.
    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    /// 마지막 거래일.
    pub fn last_date(&self) -> NaiveDate {
        self.last_bar().date
    }

    /// 위치로 거래일을 조회합니다.
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    /// 거래일로 위치를 조회합니다 (이진 탐색).
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by(|b| b.date.cmp(&date)).ok()
    }

    /// 종가 배열.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| to_f64(b.close)).collect()
    }

    /// 고가 배열.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| to_f64(b.high)).collect()
    }

    /// 저가 배열.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| to_f64(b.low)).collect()
    }

    /// 거래량 배열.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| to_f64(b.volume)).collect()
    }

    /// 가장 최근 `window`개 봉만 남긴 시계열을 반환합니다.
    ///
    /// `window`가 전체 길이 이상이면 전체를 복제합니다.
    pub fn tail(&self, window: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(window.max(1));
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self.bars[start..].to_vec(),
        }
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            symbol: String,
            bars: Vec<Bar>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PriceSeries::new(raw.symbol, raw.bars).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(day: u32, close: rust_decimal::Decimal) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_series_accessors() {
        let series = PriceSeries::new(
            "005930",
            vec![bar(2, dec!(100)), bar(3, dec!(102)), bar(5, dec!(101))],
        )
        .unwrap();

        assert_eq!(series.symbol(), "005930");
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![100.0, 102.0, 101.0]);
        assert_eq!(series.highs()[1], 103.0);
        assert_eq!(series.lows()[2], 100.0);
        assert_eq!(
            series.index_of(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            Some(2)
        );
        assert_eq!(
            series.index_of(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()),
            None
        );
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_series_rejects_empty() {
        let err = PriceSeries::new("X", vec![]).unwrap_err();
        assert!(matches!(err, ChartError::EmptySeries(_)));
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let err = PriceSeries::new("X", vec![bar(2, dec!(100)), bar(2, dec!(101))]).unwrap_err();
        assert!(matches!(err, ChartError::NonMonotonicDates { index: 1, .. }));
    }

    #[test]
    fn test_series_tail() {
        let series = PriceSeries::new(
            "X",
            (1..=10).map(|d| bar(d, dec!(100) + rust_decimal::Decimal::from(d))).collect(),
        )
        .unwrap();

        let tail = series.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.first_date(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(series.tail(50).len(), 10);
    }

    #[test]
    fn test_series_deserialize_validates() {
        let json = r#"{"symbol":"X","bars":[
            {"date":"2024-01-03","open":"10","high":"11","low":"9","close":"10","volume":"5"},
            {"date":"2024-01-02","open":"10","high":"11","low":"9","close":"10","volume":"5"}
        ]}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }

    proptest::proptest! {
        #[test]
        fn tail_keeps_most_recent_bars(len in 1usize..60, window in 1usize..80) {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let bars: Vec<Bar> = (0..len)
                .map(|i| {
                    let close = dec!(50) + rust_decimal::Decimal::from(i as i64);
                    Bar::new(
                        start + chrono::Duration::days(i as i64),
                        close,
                        close + dec!(1),
                        close - dec!(1),
                        close,
                        dec!(10),
                    )
                })
                .collect();
            let series = PriceSeries::new("P", bars).unwrap();
            let tail = series.tail(window);

            proptest::prop_assert_eq!(tail.len(), window.min(len));
            proptest::prop_assert_eq!(tail.last_date(), series.last_date());
        }
    }
}
