//! 분석 오케스트레이터.
//!
//! 평활 → 극값 → 추세선 → 패턴 분류 → 셋업/신뢰도 → 피보나치 → 지표 →
//! 레짐/주기 → 거래량 순서로 단계를 실행하고, 각 섹션의 상태를 함께 기록합니다.
//! 데이터 품질 문제로는 실패하지 않으며, 잘못된 입력과 설정만 에러로
//! 반환합니다.

use chart_core::{analysis_span, AnalysisConfig, ChartError, ChartResult, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cycles::{CycleDetector, DominantCycle};
use crate::error::AnalysisError;
use crate::extrema::{ExtremaDetector, ExtremumPoint};
use crate::fibonacci::{FibonacciAnalysis, FibonacciAnalyzer};
use crate::indicators::{IndicatorBattery, IndicatorSet, IndicatorValue};
use crate::math::mean;
use crate::patterns::{
    default_classifiers, Bias, PatternContext, PatternRecord, RejectedPattern,
};
use crate::regime::{RegimeAnalysis, RegimeDetector};
use crate::reliability::{ReliabilityScore, ReliabilityScorer};
use crate::setup::{suggest_setups, TradingSetup};
use crate::smoothing::SmoothedPrices;
use crate::trendline::{LineRole, TrendlineEngine, TrendlineRecord};
use crate::volume::{VolumeAnalysis, VolumeAnalyzer};

// ==================== 결과 타입 ====================

/// 섹션 처리 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome {
    Ok,
    InsufficientData { required: usize, provided: usize },
    Degenerate { reason: String },
    Failed { reason: String },
}

impl From<&AnalysisError> for SectionOutcome {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::InsufficientData { required, provided } => {
                SectionOutcome::InsufficientData {
                    required: *required,
                    provided: *provided,
                }
            }
            AnalysisError::Degenerate(reason) => SectionOutcome::Degenerate {
                reason: reason.clone(),
            },
            other => SectionOutcome::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// 섹션별 상태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionStatus {
    /// 예: `trendlines`, `patterns.flag`, `indicators.hurst_exponent`
    pub section: String,
    pub outcome: SectionOutcome,
}

impl SectionStatus {
    fn new(section: impl Into<String>, outcome: SectionOutcome) -> Self {
        Self {
            section: section.into(),
            outcome,
        }
    }
}

/// 분석 구간.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub bars: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 요청한 창 크기 (`None` = 전체)
    pub requested: Option<usize>,
}

/// 저항선/지지선 묶음.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendlineSet {
    pub resistance: Vec<TrendlineRecord>,
    pub support: Vec<TrendlineRecord>,
}

/// 채택 패턴과 부가 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub pattern: PatternRecord,
    pub reliability: ReliabilityScore,
    pub trading_setups: Vec<TradingSetup>,
}

/// 요약 카운트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub pattern_count: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
    pub rejected_count: usize,
    /// 신뢰도가 가장 높은 패턴 ID
    pub strongest_pattern: Option<String>,
}

/// 전체 분석 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub window: AnalysisWindow,
    pub current_price: f64,
    pub current_date: NaiveDate,
    pub peaks: Vec<ExtremumPoint>,
    pub valleys: Vec<ExtremumPoint>,
    pub prominence_threshold: f64,
    pub trendlines: TrendlineSet,
    /// 신뢰도 내림차순
    pub patterns: Vec<PatternReport>,
    pub rejected_patterns: Vec<RejectedPattern>,
    pub fibonacci: Option<FibonacciAnalysis>,
    pub indicators: IndicatorSet,
    pub regimes: Option<RegimeAnalysis>,
    pub cycles: Vec<DominantCycle>,
    pub volume: Option<VolumeAnalysis>,
    pub sections: Vec<SectionStatus>,
    pub summary: AnalysisSummary,
}

impl AnalysisResult {
    /// 섹션 상태 조회.
    pub fn section(&self, name: &str) -> Option<&SectionOutcome> {
        self.sections
            .iter()
            .find(|s| s.section == name)
            .map(|s| &s.outcome)
    }
}

// ==================== 분석기 ====================

/// 차트 분석기.
///
/// 설정은 생성 시 한 번 검증되며, 이후 `analyze` 호출은 서로 상태를
/// 공유하지 않으므로 여러 스레드에서 동시에 사용할 수 있습니다.
#[derive(Debug, Clone)]
pub struct ChartAnalyzer {
    config: AnalysisConfig,
}

impl ChartAnalyzer {
    /// 설정을 검증하고 분석기를 생성합니다.
    pub fn new(config: AnalysisConfig) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// 최근 `window`개 봉(없으면 전체)을 분석합니다.
    pub fn analyze(
        &self,
        series: &PriceSeries,
        symbol: &str,
        window: Option<usize>,
    ) -> ChartResult<AnalysisResult> {
        if window == Some(0) {
            return Err(ChartError::Config("분석 창 크기는 1 이상이어야 합니다".into()));
        }
        if series.is_empty() {
            return Err(ChartError::EmptySeries(symbol.to_string()));
        }

        let series = match window {
            Some(w) => series.tail(w),
            None => series.clone(),
        };
        let span = analysis_span!("chart_analysis", symbol, series.len());
        let _guard = span.enter();

        let config = &self.config;
        let mut sections = Vec::new();
        let closes = series.closes();
        let last_index = series.len() - 1;
        let current_price = closes[last_index];
        let mean_price = mean(&closes);

        // 평활 및 극값
        let smoothed = SmoothedPrices::from_series(&series, &config.smoothing);
        if !smoothed.close.applied {
            debug!(bars = series.len(), "Series shorter than smoothing kernel; using raw prices");
        }
        let extrema = ExtremaDetector::new(config.extrema.clone()).detect(&series, &smoothed);
        sections.push(SectionStatus::new("extrema", SectionOutcome::Ok));

        // 추세선
        let engine = TrendlineEngine::new(config.trendline.clone());
        let resistance =
            engine.find_best(&extrema.peaks, LineRole::Resistance, series.len(), mean_price);
        let support = engine.find_best(&extrema.valleys, LineRole::Support, series.len(), mean_price);
        let flat_tolerance = config.patterns.triangle.flat_slope_ratio * mean_price.abs();
        let trendlines = TrendlineSet {
            resistance: resistance
                .iter()
                .enumerate()
                .map(|(rank, c)| {
                    TrendlineRecord::from_candidate(c, rank, &series, current_price, flat_tolerance)
                })
                .collect(),
            support: support
                .iter()
                .enumerate()
                .map(|(rank, c)| {
                    TrendlineRecord::from_candidate(c, rank, &series, current_price, flat_tolerance)
                })
                .collect(),
        };
        sections.push(SectionStatus::new("trendlines", SectionOutcome::Ok));

        // 패턴 분류 (분류기별 독립 실행)
        let ctx = PatternContext {
            series: &series,
            closes: &closes,
            smoothed: &smoothed,
            extrema: &extrema,
            resistance: &resistance,
            support: &support,
            mean_price,
        };
        let mut accepted: Vec<PatternRecord> = Vec::new();
        let mut rejected: Vec<RejectedPattern> = Vec::new();
        for classifier in default_classifiers(&config.patterns) {
            let section = format!("patterns.{}", classifier.family().name());
            match classifier.classify(&ctx) {
                Ok(output) => {
                    debug!(
                        family = classifier.family().name(),
                        accepted = output.accepted.len(),
                        rejected = output.rejected.len(),
                        "Classifier finished"
                    );
                    accepted.extend(output.accepted);
                    rejected.extend(output.rejected);
                    sections.push(SectionStatus::new(section, SectionOutcome::Ok));
                }
                Err(err) => {
                    warn!(family = classifier.family().name(), error = %err, "Classifier failed");
                    sections.push(SectionStatus::new(section, SectionOutcome::from(&err)));
                }
            }
        }

        // 신뢰도 순 보고서
        let scorer = ReliabilityScorer::new(config.reliability.clone());
        let mut patterns: Vec<PatternReport> = accepted
            .into_iter()
            .map(|pattern| PatternReport {
                reliability: scorer.score(&pattern, &series),
                trading_setups: suggest_setups(&pattern, last_index),
                pattern,
            })
            .collect();
        patterns.sort_by(|a, b| {
            b.reliability
                .score
                .total_cmp(&a.reliability.score)
                .then_with(|| a.pattern.pattern_id.cmp(&b.pattern.pattern_id))
        });

        // 피보나치
        let fibonacci = match FibonacciAnalyzer::new(config.fibonacci.clone()).analyze(&series) {
            Ok(analysis) => {
                sections.push(SectionStatus::new("fibonacci", SectionOutcome::Ok));
                Some(analysis)
            }
            Err(err) => {
                debug!(error = %err, "Fibonacci skipped");
                sections.push(SectionStatus::new("fibonacci", SectionOutcome::from(&err)));
                None
            }
        };

        // 지표
        let indicators = IndicatorBattery::new(config.indicators.clone()).compute(&closes);
        for (name, value) in [
            ("hurst_exponent", &indicators.hurst_exponent),
            ("fractal_dimension", &indicators.fractal_dimension),
            ("shannon_entropy", &indicators.shannon_entropy),
            ("lyapunov_exponent", &indicators.lyapunov_exponent),
            ("dfa_exponent", &indicators.dfa_exponent),
        ] {
            let outcome = match value {
                IndicatorValue::Value { .. } => SectionOutcome::Ok,
                IndicatorValue::InsufficientData { required, provided } => {
                    SectionOutcome::InsufficientData {
                        required: *required,
                        provided: *provided,
                    }
                }
                IndicatorValue::Degenerate { reason } => {
                    SectionOutcome::Degenerate {
                        reason: reason.clone(),
                    }
                }
            };
            sections.push(SectionStatus::new(format!("indicators.{}", name), outcome));
        }

        // 레짐
        let regimes = match RegimeDetector::new(config.regime.clone()).detect(&series) {
            Ok(analysis) => {
                sections.push(SectionStatus::new("regimes", SectionOutcome::Ok));
                Some(analysis)
            }
            Err(err) => {
                sections.push(SectionStatus::new("regimes", SectionOutcome::from(&err)));
                None
            }
        };

        // 주기
        let cycles = match CycleDetector::new(config.cycles.clone()).detect(&smoothed.close.values) {
            Ok(cycles) => {
                sections.push(SectionStatus::new("cycles", SectionOutcome::Ok));
                cycles
            }
            Err(err) => {
                sections.push(SectionStatus::new("cycles", SectionOutcome::from(&err)));
                Vec::new()
            }
        };

        // 거래량 (패턴 확인 포함)
        let volume = match VolumeAnalyzer::new(config.volume.clone())
            .analyze(&series, patterns.iter().map(|p| &p.pattern))
        {
            Ok(analysis) => {
                sections.push(SectionStatus::new("volume", SectionOutcome::Ok));
                Some(analysis)
            }
            Err(err) => {
                debug!(error = %err, "Volume analysis skipped");
                sections.push(SectionStatus::new("volume", SectionOutcome::from(&err)));
                None
            }
        };

        let count = |bias: Bias| patterns.iter().filter(|p| p.pattern.bias == bias).count();
        let summary = AnalysisSummary {
            pattern_count: patterns.len(),
            bullish: count(Bias::Bullish),
            bearish: count(Bias::Bearish),
            neutral: count(Bias::Neutral),
            rejected_count: rejected.len(),
            strongest_pattern: patterns.first().map(|p| p.pattern.pattern_id.clone()),
        };

        info!(
            patterns = summary.pattern_count,
            rejected = summary.rejected_count,
            resistance = trendlines.resistance.len(),
            support = trendlines.support.len(),
            "Chart analysis completed"
        );

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            window: AnalysisWindow {
                bars: series.len(),
                start_date: series.first_date(),
                end_date: series.last_date(),
                requested: window,
            },
            current_price,
            current_date: series.last_date(),
            peaks: extrema.peaks,
            valleys: extrema.valleys,
            prominence_threshold: extrema.prominence_threshold,
            trendlines,
            patterns,
            rejected_patterns: rejected,
            fibonacci,
            indicators,
            regimes,
            cycles,
            volume,
            sections,
            summary,
        })
    }
}

/// 기본 설정으로 분석합니다.
pub fn analyze(series: &PriceSeries, symbol: &str, window: Option<usize>) -> ChartResult<AnalysisResult> {
    ChartAnalyzer::with_defaults().analyze(series, symbol, window)
}
