//! `hxsema.toml` loading.
//!
//! ```toml
//! [analysis]
//! body_check = true
//! source_roots = ["src"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::AnalysisError;
use crate::semantic::ValidationOptions;

pub const CONFIG_FILE: &str = "hxsema.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Directory holding the config file; relative roots are joined to it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_body_check")]
    pub body_check: bool,
    #[serde(default)]
    pub source_roots: Vec<PathBuf>,
}

fn default_body_check() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { body_check: default_body_check(), source_roots: Vec::new() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { analysis: AnalysisConfig::default(), base_dir: None }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(format!("{CONFIG_FILE}: could not read file: {e}"), path.to_path_buf()))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| AnalysisError::config(format!("{CONFIG_FILE}: invalid syntax: {e}"), path.to_path_buf()))?;
        config.base_dir = Some(path.parent().unwrap_or(Path::new(".")).to_path_buf());
        Ok(config)
    }

    /// Walk up from `start_dir` to the first `hxsema.toml`. No file means the
    /// defaults.
    pub fn discover(start_dir: &Path) -> Result<Self, AnalysisError> {
        match find_config(start_dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Absolute source roots. A config file without roots makes its own
    /// directory the root.
    pub fn source_roots(&self) -> Vec<PathBuf> {
        let Some(base) = &self.base_dir else {
            return self.analysis.source_roots.clone();
        };
        if self.analysis.source_roots.is_empty() {
            return vec![base.clone()];
        }
        self.analysis.source_roots.iter().map(|root| base.join(root)).collect()
    }

    /// Options for the validator. Roots are resolved so they compare
    /// against resolved source paths.
    pub fn validation_options(&self) -> ValidationOptions {
        let source_roots = self.source_roots().iter().map(|root| resolve_path(root)).collect();
        ValidationOptions { body_check: self.analysis.body_check, source_roots }
    }
}

/// Absolute form of `path` with symlinks and `..` resolved when it exists,
/// made absolute against the working directory otherwise.
pub fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
