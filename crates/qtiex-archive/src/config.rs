//! qtiex configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::unzip::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_UNCOMPRESSED_BYTES};

/// File name searched for in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "qtiex.toml";

/// Environment variable overriding [`QtiexConfig::scratch_dir`].
pub const SCRATCH_DIR_ENV: &str = "QTIEX_SCRATCH_DIR";

/// Top-level qtiex configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtiexConfig {
    /// Where scratch directories are allocated. The system temp directory
    /// when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Archives with more entries than this are rejected.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Archives that expand beyond this many bytes are rejected.
    #[serde(default = "default_max_uncompressed_bytes")]
    pub max_uncompressed_bytes: u64,
    /// Max archives processed concurrently by `batch`.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Pretty-print JSON output.
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}
fn default_max_uncompressed_bytes() -> u64 {
    DEFAULT_MAX_UNCOMPRESSED_BYTES
}
fn default_parallelism() -> usize {
    4
}
fn default_pretty() -> bool {
    true
}

impl Default for QtiexConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            max_entries: default_max_entries(),
            max_uncompressed_bytes: default_max_uncompressed_bytes(),
            parallelism: default_parallelism(),
            pretty: default_pretty(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables expand to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `qtiex.toml` in the current directory
/// 2. `~/.config/qtiex/config.toml`
///
/// `QTIEX_SCRATCH_DIR` overrides the scratch directory from any file.
pub fn load_config() -> Result<QtiexConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QtiexConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(LOCAL_CONFIG_FILE);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => QtiexConfig::default(),
    };

    if let Ok(dir) = std::env::var(SCRATCH_DIR_ENV) {
        if !dir.is_empty() {
            config.scratch_dir = Some(PathBuf::from(dir));
        }
    }

    Ok(config)
}

/// Parse a config document, expanding `${VAR}` references in `scratch_dir`.
pub fn parse_config(content: &str) -> Result<QtiexConfig> {
    let mut config: QtiexConfig = toml::from_str(content)?;

    config.scratch_dir = config
        .scratch_dir
        .map(|dir| resolve_env_vars(&dir.to_string_lossy()))
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);

    if config.parallelism == 0 {
        anyhow::bail!("parallelism must be at least 1");
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("qtiex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QTIEX_TEST_VAR", "scratch");
        assert_eq!(resolve_env_vars("${_QTIEX_TEST_VAR}"), "scratch");
        assert_eq!(
            resolve_env_vars("/tmp/${_QTIEX_TEST_VAR}/uploads"),
            "/tmp/scratch/uploads"
        );
        std::env::remove_var("_QTIEX_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_unterminated() {
        assert_eq!(resolve_env_vars("/tmp/${OOPS"), "/tmp/${OOPS");
    }

    #[test]
    fn default_config() {
        let config = QtiexConfig::default();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.max_uncompressed_bytes, 512 * 1024 * 1024);
        assert!(config.pretty);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let config = parse_config(
            r#"
parallelism = 8
pretty = false
"#,
        )
        .unwrap();
        assert_eq!(config.parallelism, 8);
        assert!(!config.pretty);
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn parse_scratch_dir_with_env_reference() {
        std::env::set_var("_QTIEX_SCRATCH_ROOT", "/var/tmp");
        let config = parse_config(r#"scratch_dir = "${_QTIEX_SCRATCH_ROOT}/qtiex""#).unwrap();
        assert_eq!(config.scratch_dir, Some(PathBuf::from("/var/tmp/qtiex")));
        std::env::remove_var("_QTIEX_SCRATCH_ROOT");
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        assert!(parse_config("parallelism = 0").is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "max_entries = 12\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_entries, 12);
    }
}
