//! 분석 명령어.
//!
//! CSV 시계열을 로드하고 분석 엔진을 실행하여 결과를 JSON으로 출력합니다.
//!
//! # 사용 예시
//!
//! ```bash
//! # 최근 300봉 분석
//! chart analyze -i data/005930.csv -s 005930 -w 300 --pretty
//!
//! # 설정 파일 지정, 결과를 파일로 저장
//! chart analyze -i data/SPY.csv -s SPY -c config/chart.toml -o spy.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use chart_analytics::{AnalysisResult, ChartAnalyzer, SectionOutcome};
use chart_core::AnalysisConfig;

use crate::commands::csv_loader::load_series;

/// 분석 명령 옵션.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// 입력 CSV 경로
    pub input: PathBuf,
    /// 종목 심볼
    pub symbol: String,
    /// 분석 창 (최근 N봉)
    pub window: Option<usize>,
    /// 설정 파일 경로 (없으면 건너뜀)
    pub config: PathBuf,
    /// 출력 파일 경로 (없으면 stdout)
    pub output: Option<PathBuf>,
    /// 들여쓰기된 JSON 출력
    pub pretty: bool,
}

/// 분석을 실행하고 결과를 출력합니다.
pub fn run_analyze(options: &AnalyzeOptions) -> Result<AnalysisResult> {
    let config = AnalysisConfig::load(&options.config)
        .with_context(|| format!("설정 로드 실패: {}", options.config.display()))?;
    let analyzer = ChartAnalyzer::new(config)?;

    let series = load_series(&options.input, &options.symbol)?;
    let result = analyzer.analyze(&series, &options.symbol, options.window)?;

    log_section_markers(&result);
    info!(
        symbol = %options.symbol,
        patterns = result.summary.pattern_count,
        rejected = result.summary.rejected_count,
        "Analysis finished"
    );

    let json = render_json(&result, options.pretty)?;
    match &options.output {
        Some(path) => write_output(path, &json)?,
        None => println!("{}", json),
    }

    Ok(result)
}

/// 결과를 JSON 문자열로 직렬화합니다.
pub fn render_json(result: &AnalysisResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    Ok(json)
}

fn write_output(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("출력 디렉토리 생성 실패: {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("결과 저장 실패: {}", path.display()))?;
    info!(path = %path.display(), "Result written");
    Ok(())
}

fn log_section_markers(result: &AnalysisResult) {
    for status in &result.sections {
        match &status.outcome {
            SectionOutcome::Ok => {}
            other => warn!(section = %status.section, outcome = ?other, "Section not computed"),
        }
    }
}

// ==================== 테스트 ====================
