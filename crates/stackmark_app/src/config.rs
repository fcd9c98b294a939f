//! Config file loading and output-root resolution.
//!
//! Precedence for the output root: `--base-dir` (or `STACKMARK_BASE_DIR`,
//! folded in by clap), then the config file, then
//! `~/Documents/substack-notes`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use serde::Deserialize;

const CONFIG_DIR: &str = "stackmark";
const CONFIG_FILENAME: &str = "config.ron";
const DEFAULT_BASE_DIR: &str = "~/Documents/substack-notes";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_dir: Option<String>,
    /// Host label -> directory name.
    pub publication_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub base_dir: PathBuf,
    pub publication_mappings: BTreeMap<String, String>,
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    ron::from_str(content).context("invalid config file")
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("in {}", path.display()))
}

/// `$CONFIG_DIR/stackmark/config.ron`, used when no path is given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Loads the explicit config file, or the default one if it exists.
///
/// A file that fails to load is reported and treated as empty.
pub fn load_file_config(explicit: Option<&Path>) -> FileConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return FileConfig::default(),
        },
    };
    match load_config(&path) {
        Ok(config) => {
            engine_info!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            engine_warn!("Could not load config from {}: {:#}", path.display(), err);
            FileConfig::default()
        }
    }
}

pub fn resolve(cli_base_dir: Option<&Path>, file: FileConfig, home: Option<&Path>) -> ResolvedConfig {
    let base_dir = match cli_base_dir {
        Some(dir) => expand_home(&dir.to_string_lossy(), home),
        None => expand_home(file.base_dir.as_deref().unwrap_or(DEFAULT_BASE_DIR), home),
    };
    ResolvedConfig {
        base_dir,
        publication_mappings: file.publication_mappings,
    }
}

/// Expands a leading `~` to `home`; other paths pass through.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with(['/', '\\']) => {
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        _ => PathBuf::from(path),
    }
}
