//! CLI 명령어 구현 모듈.

pub mod analyze;
pub mod config;
pub mod csv_loader;

pub use analyze::{run_analyze, AnalyzeOptions};
pub use config::write_default_config;
pub use csv_loader::{load_series, read_bars};
