use anyhow::{Context, Result};
use mutasi_import::MatchEngine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk configuration (`config.toml` in the data directory). Every
/// field has a default, so a missing or partial file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database file. Relative paths resolve against the data directory.
    pub database: Option<PathBuf>,
    /// Where original statement files are kept.
    pub statements_dir: Option<PathBuf>,
    pub matcher: MatcherSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSection {
    pub date_window_days: i64,
    pub matched_threshold: f32,
    pub suggested_threshold: f32,
}

impl Default for MatcherSection {
    fn default() -> Self {
        let engine = MatchEngine::default();
        Self {
            date_window_days: engine.date_window_days,
            matched_threshold: engine.matched_threshold,
            suggested_threshold: engine.suggested_threshold,
        }
    }
}

impl MatcherSection {
    pub fn engine(&self) -> MatchEngine {
        MatchEngine {
            date_window_days: self.date_window_days,
            matched_threshold: self.matched_threshold,
            suggested_threshold: self.suggested_threshold,
        }
    }
}

impl AppConfig {
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        match &self.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => data_dir.join(p),
            None => data_dir.join("mutasi.db"),
        }
    }

    pub fn statements_path(&self, data_dir: &Path) -> PathBuf {
        match &self.statements_dir {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => data_dir.join(p),
            None => data_dir.join("statements"),
        }
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "mutasi", "Mutasi")
        .context("could not resolve a home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

pub fn load_config(data_dir: &Path) -> Result<AppConfig> {
    let p = config_path(data_dir);
    if !p.exists() {
        return Ok(AppConfig::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

/// Write a default config if none exists yet. Returns the path either way.
pub fn init_config(data_dir: &Path) -> Result<PathBuf> {
    let p = config_path(data_dir);
    if p.exists() {
        return Ok(p);
    }
    let s = toml::to_string_pretty(&AppConfig::default()).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}
