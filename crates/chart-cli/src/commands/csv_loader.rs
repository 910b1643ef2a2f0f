//! OHLCV CSV 로더.
//!
//! 헤더가 `date,open,high,low,close,volume`인 CSV를 읽어 [`PriceSeries`]를
//! 만듭니다. 날짜는 `YYYY-MM-DD`, 가격과 거래량은 10진수 문자열입니다.
//! 헤더 이름은 대소문자를 구분하지 않으며 추가 컬럼은 무시합니다.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use chart_core::{Bar, PriceSeries};

/// CSV 한 행. 값은 문자열로 받아 직접 파싱합니다.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: String,
    #[serde(alias = "Open", alias = "OPEN")]
    open: String,
    #[serde(alias = "High", alias = "HIGH")]
    high: String,
    #[serde(alias = "Low", alias = "LOW")]
    low: String,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: String,
    #[serde(alias = "Volume", alias = "VOLUME")]
    volume: String,
}

impl CsvRow {
    fn into_bar(self, line: usize) -> Result<Bar> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .with_context(|| format!("{}행: 잘못된 날짜 '{}'", line, self.date))?;

        let field = |name: &str, raw: &str| -> Result<Decimal> {
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|e| anyhow!("{}행: 잘못된 {} 값 '{}': {}", line, name, raw, e))
        };

        Ok(Bar::new(
            date,
            field("open", &self.open)?,
            field("high", &self.high)?,
            field("low", &self.low)?,
            field("close", &self.close)?,
            field("volume", &self.volume)?,
        ))
    }
}

/// 임의의 리더에서 봉 목록을 읽습니다.
///
/// 봉 불변식과 날짜 순서 검증은 [`PriceSeries::new`]에서 수행됩니다.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    for (i, result) in reader.deserialize::<CsvRow>().enumerate() {
        // 헤더가 1행
        let line = i + 2;
        let row = result.map_err(|e| anyhow!("{}행: CSV 파싱 실패: {}", line, e))?;
        bars.push(row.into_bar(line)?);
    }

    debug!(rows = bars.len(), "CSV rows parsed");
    Ok(bars)
}

/// CSV 파일에서 검증된 시계열을 로드합니다.
pub fn load_series(path: &Path, symbol: &str) -> Result<PriceSeries> {
    if !path.exists() {
        return Err(anyhow!("입력 파일을 찾을 수 없습니다: {}", path.display()));
    }

    let file = File::open(path)
        .with_context(|| format!("입력 파일 열기 실패: {}", path.display()))?;
    let bars = read_bars(BufReader::new(file))?;

    let series = PriceSeries::new(symbol, bars)?;
    info!(
        symbol,
        bars = series.len(),
        from = %series.first_date(),
        to = %series.last_date(),
        "Series loaded"
    );
    Ok(series)
}

// ==================== 테스트 ====================
