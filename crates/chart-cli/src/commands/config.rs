//! 설정 명령어.
//!
//! 기본 분석 설정을 TOML로 출력하거나 파일로 저장합니다. 생성된 파일은
//! `chart analyze --config`에 그대로 넘길 수 있습니다.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use chart_core::AnalysisConfig;

/// 기본 설정을 TOML 문자열로 만듭니다.
pub fn default_config_toml() -> Result<String> {
    Ok(AnalysisConfig::default().to_toml_string()?)
}

/// 기본 설정을 출력합니다. `output`이 있으면 파일로 저장합니다.
pub fn write_default_config(output: Option<&Path>, force: bool) -> Result<()> {
    let content = default_config_toml()?;

    let Some(path) = output else {
        print!("{}", content);
        return Ok(());
    };

    if path.exists() && !force {
        return Err(anyhow!(
            "파일이 이미 존재합니다 (--force로 덮어쓰기): {}",
            path.display()
        ));
    }

    std::fs::write(path, content)
        .with_context(|| format!("설정 파일 저장 실패: {}", path.display()))?;
    info!(path = %path.display(), "Default config written");
    Ok(())
}

// ==================== 테스트 ====================
