//! 설정 로드 통합 테스트
//!
//! 파일 → 환경 변수 계층 순서와 검증 실패 경로를 확인합니다.

use chart_core::{AnalysisConfig, ChartError, ProminenceMode};
use std::path::PathBuf;

fn temp_config(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("chart-core-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_missing_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join("chart-core-does-not-exist.toml");
    let config = AnalysisConfig::load(&path).unwrap();
    let defaults = AnalysisConfig::default();
    assert_eq!(config.smoothing, defaults.smoothing);
    assert_eq!(config.extrema, defaults.extrema);
    assert_eq!(config.patterns, defaults.patterns);
}

#[test]
fn test_load_file_overrides_and_env_layer() {
    let path = temp_config(
        "override",
        r#"
        [smoothing]
        sigma = 3.0

        [extrema]
        prominence_mode = "atr_multiple"
        prominence = 1.2
        "#,
    );

    std::env::set_var("CHART__TRENDLINE__MIN_TOUCHES", "3");
    let config = AnalysisConfig::load(&path).unwrap();
    std::env::remove_var("CHART__TRENDLINE__MIN_TOUCHES");

    assert_eq!(config.smoothing.sigma, 3.0);
    assert_eq!(config.extrema.prominence_mode, ProminenceMode::AtrMultiple);
    assert_eq!(config.extrema.prominence, 1.2);
    assert_eq!(config.trendline.min_touches, 3);
    assert_eq!(config.trendline.touch_tolerance, 0.015);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_rejects_invalid_values() {
    let path = temp_config(
        "invalid",
        r#"
        [reliability]
        confidence_weight = 0.9
        "#,
    );

    let err = AnalysisConfig::load(&path).unwrap_err();
    assert!(matches!(err, ChartError::Config(_)));

    std::fs::remove_file(path).ok();
}
