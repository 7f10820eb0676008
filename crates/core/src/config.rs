use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_NAME_TEMPLATE: &str = "*";
pub const OUTPUT_DIR_NAME: &str = "output";

/// Defaults persisted in the OS config directory; command-line flags win.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub prefix: String,
    pub include_hidden: bool,
}

/// `config.toml` inside the OS config directory for this tool.
fn config_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "kelly", "photo-date-corrector")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}

/// One run over a source folder.
#[derive(Debug, Clone)]
pub struct CorrectionJob {
    pub source: PathBuf,
    pub prefix: String,
    pub template: String,
    pub shift: TimeDelta,
    pub fixed_date: Option<NaiveDate>,
    pub include_hidden: bool,
    pub dry_run: bool,
}

impl CorrectionJob {
    pub fn new(source: impl Into<PathBuf>, shift: TimeDelta) -> Self {
        Self {
            source: source.into(),
            prefix: String::new(),
            template: DEFAULT_NAME_TEMPLATE.to_string(),
            shift,
            fixed_date: None,
            include_hidden: false,
            dry_run: false,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.source.join(OUTPUT_DIR_NAME)
    }

    pub fn output_path_for(&self, file: &Path) -> PathBuf {
        let file_name = file
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        self.output_dir()
            .join(format!("{}{}", self.prefix, file_name))
    }
}
