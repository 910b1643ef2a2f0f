//! 차트 패턴 분석 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 삼성전자 일봉 CSV 분석 (최근 300봉)
//! chart analyze -i data/kr/005930_daily.csv -s 005930 -w 300 --pretty
//!
//! # 사용자 설정으로 분석하고 결과를 파일로 저장
//! chart analyze -i data/us/SPY_daily.csv -s SPY -c config/chart.toml -o out/spy.json
//!
//! # 기본 설정 파일 생성
//! chart config -o config/chart.toml
//! ```
//!
//! 설정은 기본값, TOML 파일, `CHART__SECTION__KEY` 환경 변수 순으로 적용됩니다.
//! 로그는 `RUST_LOG`, `LOG_FORMAT` (pretty, json, compact)으로 조정합니다.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use chart_cli::commands::{run_analyze, write_default_config, AnalyzeOptions};

#[derive(Parser)]
#[command(name = "chart")]
#[command(about = "Chart pattern CLI - OHLCV 시계열 차트 패턴/추세선 분석", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OHLCV CSV 분석 후 결과를 JSON으로 출력
    Analyze {
        /// 입력 CSV 파일 (date,open,high,low,close,volume)
        #[arg(short, long)]
        input: PathBuf,

        /// 종목 코드/심볼 (예: 005930, SPY)
        #[arg(short, long)]
        symbol: String,

        /// 분석 창: 최근 N봉 (지정하지 않으면 전체)
        #[arg(short, long)]
        window: Option<usize>,

        /// 설정 파일 경로 (없으면 기본값 사용)
        #[arg(short, long, default_value = "config/chart.toml")]
        config: PathBuf,

        /// 출력 파일 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 들여쓰기된 JSON 출력
        #[arg(long, default_value = "false")]
        pretty: bool,
    },

    /// 기본 분석 설정을 TOML로 출력
    Config {
        /// 출력 파일 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 기존 파일 덮어쓰기
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    chart_core::init_logging_from_env()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            symbol,
            window,
            config,
            output,
            pretty,
        } => {
            info!("분석 시작: {} ({})", symbol, input.display());
            let options = AnalyzeOptions {
                input,
                symbol,
                window,
                config,
                output,
                pretty,
            };

            if let Err(e) = run_analyze(&options) {
                error!("분석 실패: {:#}", e);
                return Err(e);
            }
        }

        Commands::Config { output, force } => {
            write_default_config(output.as_deref(), force)?;
        }
    }

    Ok(())
}
