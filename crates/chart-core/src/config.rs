//! 분석 설정 관리.
//!
//! 모든 임계값은 기본값을 가지며, TOML 파일과 `CHART__섹션__키` 형식의
//! 환경 변수로 덮어쓸 수 있습니다. 계산 시작 전에 [`AnalysisConfig::validate`]로
//! 검증됩니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ChartError, ChartResult};

/// 전체 분석 설정.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 가우시안 평활 설정
    pub smoothing: SmoothingConfig,
    /// 극값 탐지 설정
    pub extrema: ExtremaConfig,
    /// 추세선 엔진 설정
    pub trendline: TrendlineConfig,
    /// 패턴 분류기 설정
    pub patterns: PatternConfig,
    /// 피보나치 설정
    pub fibonacci: FibonacciConfig,
    /// 수학 지표 설정
    pub indicators: IndicatorConfig,
    /// 신뢰도 점수 설정
    pub reliability: ReliabilityConfig,
    /// 시장 국면 설정
    pub regime: RegimeConfig,
    /// 주기 분석 설정
    pub cycles: CycleConfig,
    /// 거래량 분석 설정
    pub volume: VolumeConfig,
}

/// 가우시안 평활 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// 가우시안 표준편차 (봉 단위)
    pub sigma: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self { sigma: 2.0 }
    }
}

/// 돌출도 임계값 해석 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProminenceMode {
    /// 절대 가격 단위
    #[default]
    Absolute,
    /// ATR 배수
    AtrMultiple,
}

/// 극값 탐지 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtremaConfig {
    /// 같은 종류 극값 사이 최소 거리 (봉)
    pub min_distance: usize,
    /// 돌출도 해석 방식
    pub prominence_mode: ProminenceMode,
    /// 돌출도 임계값 (가격 단위 또는 ATR 배수)
    pub prominence: f64,
    /// ATR 기간
    pub atr_period: usize,
}

impl Default for ExtremaConfig {
    fn default() -> Self {
        Self {
            min_distance: 5,
            prominence_mode: ProminenceMode::Absolute,
            prominence: 0.5,
            atr_period: 14,
        }
    }
}

/// 추세선 엔진 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrendlineConfig {
    /// 후보 생성에 사용할 최근 극값 수 (K)
    pub max_candidates: usize,
    /// 터치 판정 상대 허용 오차
    pub touch_tolerance: f64,
    /// 최소 터치 수
    pub min_touches: usize,
    /// 역방향 기울기 허용 한도 (평균가 대비 봉당 비율)
    pub adverse_slope_ratio: f64,
    /// 역할별 반환 추세선 수
    pub max_lines: usize,
}

impl Default for TrendlineConfig {
    fn default() -> Self {
        Self {
            max_candidates: 15,
            touch_tolerance: 0.015,
            min_touches: 2,
            adverse_slope_ratio: 0.001,
            max_lines: 2,
        }
    }
}

/// 패턴 분류기 설정.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternConfig {
    pub head_shoulders: HeadShouldersConfig,
    pub double: DoubleConfig,
    pub triangle: TriangleConfig,
    pub flag: FlagConfig,
    pub cup_handle: CupHandleConfig,
    pub rounding: RoundingConfig,
}

/// 헤드앤숄더 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadShouldersConfig {
    /// 어깨 대칭 허용 오차. 넥라인은 60%, 헤드 우위는 40%를 사용합니다.
    pub tolerance: f64,
    /// 기본 신뢰도
    pub confidence: f64,
}

impl Default for HeadShouldersConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            confidence: 0.85,
        }
    }
}

/// 이중 천정/바닥 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DoubleConfig {
    /// 두 극값 가격 유사도 허용 오차
    pub tolerance: f64,
    /// 최소 간격 (봉, 초과)
    pub min_separation: usize,
    /// 최대 간격 (봉, 미만)
    pub max_separation: usize,
    /// 중간 극값의 최소 깊이
    pub min_depth: f64,
}

impl Default for DoubleConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            min_separation: 10,
            max_separation: 50,
            min_depth: 0.03,
        }
    }
}

/// 삼각형/쐐기 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TriangleConfig {
    /// 평탄 판정 기울기 (평균가 대비 비율)
    pub flat_slope_ratio: f64,
    /// 꼭짓점 허용 범위 (패턴 기간 배수)
    pub apex_horizon_ratio: f64,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            flat_slope_ratio: 0.0005,
            apex_horizon_ratio: 1.5,
        }
    }
}

/// 깃발 패턴 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlagConfig {
    /// 깃대 길이 (봉)
    pub pole_window: usize,
    /// 깃발 길이 (봉)
    pub flag_window: usize,
    /// 깃대 최소 변동률
    pub min_pole_move: f64,
    /// 깃발 기울기 / 깃대 기울기 최대 비율
    pub max_slope_ratio: f64,
    /// 기본 신뢰도
    pub confidence: f64,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            pole_window: 15,
            flag_window: 10,
            min_pole_move: 0.03,
            max_slope_ratio: 0.3,
            confidence: 0.87,
        }
    }
}

/// 컵앤핸들 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CupHandleConfig {
    pub min_depth: f64,
    pub max_depth: f64,
    /// 좌우 림 비대칭 최대값
    pub max_asymmetry: f64,
    /// 컵 최소 기간 (봉, 초과)
    pub min_duration: usize,
    /// 핸들 탐색 구간 (봉)
    pub handle_window: usize,
    pub handle_min_depth: f64,
    pub handle_max_depth: f64,
    pub confidence: f64,
}

impl Default for CupHandleConfig {
    fn default() -> Self {
        Self {
            min_depth: 0.10,
            max_depth: 0.50,
            max_asymmetry: 0.05,
            min_duration: 20,
            handle_window: 15,
            handle_min_depth: 0.02,
            handle_max_depth: 0.15,
            confidence: 0.83,
        }
    }
}

/// 라운딩 패턴 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RoundingConfig {
    /// 중심 기준 좌우 구간 (봉)
    pub window: usize,
    /// 평균 정규화 곡률 임계값
    pub min_curvature: f64,
    /// 정규화 곡률 표준편차 최대값
    pub max_curvature_std: f64,
    pub confidence: f64,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self {
            window: 30,
            min_curvature: 0.001,
            max_curvature_std: 0.003,
            confidence: 0.80,
        }
    }
}

/// 피보나치 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FibonacciConfig {
    /// 스윙 탐색 구간 (봉)
    pub swing_lookback: usize,
    /// 스윙 확인 좌우 봉 수
    pub swing_window: usize,
    /// 현재 봉을 스윙 저점/고점으로 볼 허용 오차
    pub current_bar_tolerance: f64,
    /// 스윙이 없을 때 사용할 고저 구간 (봉)
    pub fallback_window: usize,
}

impl Default for FibonacciConfig {
    fn default() -> Self {
        Self {
            swing_lookback: 60,
            swing_window: 5,
            current_bar_tolerance: 0.02,
            fallback_window: 30,
        }
    }
}

/// 수학 지표 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub hurst_min_points: usize,
    pub hurst_max_lag: usize,
    pub fractal_min_points: usize,
    pub fractal_kmax: usize,
    pub entropy_min_points: usize,
    pub entropy_bins: usize,
    pub lyapunov_min_points: usize,
    pub lyapunov_embedding: usize,
    pub lyapunov_delay: usize,
    pub lyapunov_steps: usize,
    pub dfa_min_points: usize,
    pub dfa_min_scale: usize,
    pub dfa_max_scale: usize,
    pub dfa_scale_step: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            hurst_min_points: 100,
            hurst_max_lag: 100,
            fractal_min_points: 50,
            fractal_kmax: 10,
            entropy_min_points: 20,
            entropy_bins: 50,
            lyapunov_min_points: 100,
            lyapunov_embedding: 3,
            lyapunov_delay: 1,
            lyapunov_steps: 50,
            dfa_min_points: 100,
            dfa_min_scale: 10,
            dfa_max_scale: 100,
            dfa_scale_step: 5,
        }
    }
}

/// 신뢰도 점수 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub confidence_weight: f64,
    pub volatility_weight: f64,
    pub duration_weight: f64,
    pub recency_weight: f64,
    pub volume_weight: f64,
    /// 기간 요인 상한 (봉)
    pub duration_cap: usize,
    /// 실제 거래량 확인 사용 여부
    pub volume_confirmation: bool,
    /// 거래량 데이터가 없을 때의 대체값
    pub volume_placeholder: f64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            confidence_weight: 0.4,
            volatility_weight: 0.2,
            duration_weight: 0.2,
            recency_weight: 0.1,
            volume_weight: 0.1,
            duration_cap: 30,
            volume_confirmation: true,
            volume_placeholder: 0.8,
        }
    }
}

impl ReliabilityConfig {
    fn weight_sum(&self) -> f64 {
        self.confidence_weight
            + self.volatility_weight
            + self.duration_weight
            + self.recency_weight
            + self.volume_weight
    }
}

/// 시장 국면 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// 이동 구간 (봉)
    pub window: usize,
    /// 강한 추세 판정 정규화 기울기
    pub trend_threshold: f64,
    /// 고변동성 판정 (중앙값 대비 배수)
    pub high_volatility_ratio: f64,
    /// 저변동성 판정 (중앙값 대비 배수)
    pub low_volatility_ratio: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            window: 50,
            trend_threshold: 0.005,
            high_volatility_ratio: 1.5,
            low_volatility_ratio: 0.5,
        }
    }
}

/// 주기 분석 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CycleConfig {
    /// 보고할 상위 주기 수
    pub top_n: usize,
    pub min_points: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_points: 32,
        }
    }
}

/// 거래량 분석 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// 통계 구간 (최근 N봉)
    pub lookback: usize,
    /// 단기 이동평균 기간
    pub short_period: usize,
    /// 장기 이동평균 기간
    pub long_period: usize,
    /// 추세 판정 비율 (단기 평균이 장기 평균 대비 이만큼 벗어나면 증가/감소)
    pub trend_threshold: f64,
    /// 이상 거래량 z-score 임계값
    pub anomaly_z_score: f64,
    /// 반전 패턴의 후반부/전반부 거래량 확인 배수
    pub confirmation_ratio: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            lookback: 30,
            short_period: 10,
            long_period: 20,
            trend_threshold: 0.15,
            anomaly_z_score: 2.0,
            confirmation_ratio: 1.2,
        }
    }
}

impl AnalysisConfig {
    /// 기본값, TOML 파일, 환경 변수 순으로 설정을 로드합니다.
    ///
    /// 파일이 없으면 건너뜁니다. 환경 변수는 `CHART__EXTREMA__MIN_DISTANCE=7`
    /// 형식입니다.
    pub fn load<P: AsRef<Path>>(path: P) -> ChartResult<Self> {
        let config: Self = config::Config::builder()
            // 기본값으로 시작
            .add_source(config::Config::try_from(&Self::default())?)
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("CHART")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn from_toml_str(content: &str) -> ChartResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// 설정을 TOML 문자열로 직렬화합니다.
    pub fn to_toml_string(&self) -> ChartResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 모든 임계값을 검증합니다.
    pub fn validate(&self) -> ChartResult<()> {
        positive("smoothing.sigma", self.smoothing.sigma)?;

        non_zero("extrema.min_distance", self.extrema.min_distance)?;
        non_negative("extrema.prominence", self.extrema.prominence)?;
        non_zero("extrema.atr_period", self.extrema.atr_period)?;

        let t = &self.trendline;
        ensure(t.max_candidates >= 2, "trendline.max_candidates는 2 이상이어야 합니다")?;
        fraction("trendline.touch_tolerance", t.touch_tolerance)?;
        ensure(t.min_touches >= 2, "trendline.min_touches는 2 이상이어야 합니다")?;
        non_negative("trendline.adverse_slope_ratio", t.adverse_slope_ratio)?;
        non_zero("trendline.max_lines", t.max_lines)?;

        let p = &self.patterns;
        fraction("patterns.head_shoulders.tolerance", p.head_shoulders.tolerance)?;
        unit("patterns.head_shoulders.confidence", p.head_shoulders.confidence)?;
        fraction("patterns.double.tolerance", p.double.tolerance)?;
        fraction("patterns.double.min_depth", p.double.min_depth)?;
        ensure(
            p.double.min_separation < p.double.max_separation,
            "patterns.double.min_separation은 max_separation보다 작아야 합니다",
        )?;
        non_negative("patterns.triangle.flat_slope_ratio", p.triangle.flat_slope_ratio)?;
        positive("patterns.triangle.apex_horizon_ratio", p.triangle.apex_horizon_ratio)?;
        ensure(p.flag.pole_window >= 2, "patterns.flag.pole_window는 2 이상이어야 합니다")?;
        ensure(p.flag.flag_window >= 2, "patterns.flag.flag_window는 2 이상이어야 합니다")?;
        fraction("patterns.flag.min_pole_move", p.flag.min_pole_move)?;
        fraction("patterns.flag.max_slope_ratio", p.flag.max_slope_ratio)?;
        unit("patterns.flag.confidence", p.flag.confidence)?;
        let c = &p.cup_handle;
        fraction("patterns.cup_handle.min_depth", c.min_depth)?;
        fraction("patterns.cup_handle.max_depth", c.max_depth)?;
        ensure(
            c.min_depth < c.max_depth,
            "patterns.cup_handle.min_depth는 max_depth보다 작아야 합니다",
        )?;
        fraction("patterns.cup_handle.max_asymmetry", c.max_asymmetry)?;
        non_zero("patterns.cup_handle.handle_window", c.handle_window)?;
        ensure(
            c.handle_min_depth < c.handle_max_depth,
            "patterns.cup_handle.handle_min_depth는 handle_max_depth보다 작아야 합니다",
        )?;
        unit("patterns.cup_handle.confidence", c.confidence)?;
        ensure(p.rounding.window >= 3, "patterns.rounding.window는 3 이상이어야 합니다")?;
        positive("patterns.rounding.min_curvature", p.rounding.min_curvature)?;
        positive("patterns.rounding.max_curvature_std", p.rounding.max_curvature_std)?;
        unit("patterns.rounding.confidence", p.rounding.confidence)?;

        let f = &self.fibonacci;
        non_zero("fibonacci.swing_window", f.swing_window)?;
        ensure(
            f.swing_lookback > 2 * f.swing_window,
            "fibonacci.swing_lookback은 swing_window의 두 배보다 커야 합니다",
        )?;
        fraction("fibonacci.current_bar_tolerance", f.current_bar_tolerance)?;
        non_zero("fibonacci.fallback_window", f.fallback_window)?;

        let i = &self.indicators;
        ensure(i.hurst_max_lag >= 4, "indicators.hurst_max_lag는 4 이상이어야 합니다")?;
        ensure(i.fractal_kmax >= 2, "indicators.fractal_kmax는 2 이상이어야 합니다")?;
        ensure(i.entropy_bins >= 2, "indicators.entropy_bins는 2 이상이어야 합니다")?;
        non_zero("indicators.lyapunov_embedding", i.lyapunov_embedding)?;
        non_zero("indicators.lyapunov_delay", i.lyapunov_delay)?;
        non_zero("indicators.lyapunov_steps", i.lyapunov_steps)?;
        ensure(i.dfa_min_scale >= 4, "indicators.dfa_min_scale은 4 이상이어야 합니다")?;
        non_zero("indicators.dfa_scale_step", i.dfa_scale_step)?;
        ensure(
            i.dfa_min_scale < i.dfa_max_scale,
            "indicators.dfa_min_scale은 dfa_max_scale보다 작아야 합니다",
        )?;

        let r = &self.reliability;
        for (name, weight) in [
            ("reliability.confidence_weight", r.confidence_weight),
            ("reliability.volatility_weight", r.volatility_weight),
            ("reliability.duration_weight", r.duration_weight),
            ("reliability.recency_weight", r.recency_weight),
            ("reliability.volume_weight", r.volume_weight),
        ] {
            unit(name, weight)?;
        }
        ensure(
            (r.weight_sum() - 1.0).abs() < 1e-9,
            "reliability 가중치의 합은 1이어야 합니다",
        )?;
        non_zero("reliability.duration_cap", r.duration_cap)?;
        unit("reliability.volume_placeholder", r.volume_placeholder)?;

        ensure(self.regime.window >= 10, "regime.window는 10 이상이어야 합니다")?;
        positive("regime.trend_threshold", self.regime.trend_threshold)?;
        ensure(
            self.regime.low_volatility_ratio < self.regime.high_volatility_ratio,
            "regime.low_volatility_ratio는 high_volatility_ratio보다 작아야 합니다",
        )?;

        non_zero("cycles.top_n", self.cycles.top_n)?;
        ensure(self.cycles.min_points >= 8, "cycles.min_points는 8 이상이어야 합니다")?;

        let v = &self.volume;
        non_zero("volume.short_period", v.short_period)?;
        ensure(
            v.short_period < v.long_period,
            "volume.short_period는 long_period보다 작아야 합니다",
        )?;
        ensure(
            v.long_period <= v.lookback,
            "volume.long_period는 lookback 이하여야 합니다",
        )?;
        fraction("volume.trend_threshold", v.trend_threshold)?;
        positive("volume.anomaly_z_score", v.anomaly_z_score)?;
        ensure(
            v.confirmation_ratio.is_finite() && v.confirmation_ratio >= 1.0,
            "volume.confirmation_ratio는 1 이상이어야 합니다",
        )?;

        Ok(())
    }
}

fn ensure(condition: bool, message: &str) -> ChartResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ChartError::Config(message.to_string()))
    }
}

fn positive(name: &str, value: f64) -> ChartResult<()> {
    ensure(
        value.is_finite() && value > 0.0,
        &format!("{}는 양수여야 합니다 (현재 {})", name, value),
    )
}

fn non_negative(name: &str, value: f64) -> ChartResult<()> {
    ensure(
        value.is_finite() && value >= 0.0,
        &format!("{}는 0 이상이어야 합니다 (현재 {})", name, value),
    )
}

fn fraction(name: &str, value: f64) -> ChartResult<()> {
    ensure(
        value.is_finite() && value > 0.0 && value < 1.0,
        &format!("{}는 (0, 1) 범위여야 합니다 (현재 {})", name, value),
    )
}

fn unit(name: &str, value: f64) -> ChartResult<()> {
    ensure(
        value.is_finite() && (0.0..=1.0).contains(&value),
        &format!("{}는 [0, 1] 범위여야 합니다 (현재 {})", name, value),
    )
}

fn non_zero(name: &str, value: usize) -> ChartResult<()> {
    ensure(value > 0, &format!("{}는 0보다 커야 합니다", name))
}
