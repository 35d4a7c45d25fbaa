//! Configuration paths
//!
//! Each location can be overridden by a `DEVSTUDIO_*` variable; otherwise
//! the platform directory is used, then a dotted directory under home.

use std::path::PathBuf;

/// Directory holding `config.json` (`DEVSTUDIO_CONFIG_DIR`)
pub fn config_dir() -> PathBuf {
    resolve("DEVSTUDIO_CONFIG_DIR", dirs::config_dir(), &[".config"])
}

/// Main configuration file (`DEVSTUDIO_CONFIG`)
pub fn config_path() -> PathBuf {
    match std::env::var_os("DEVSTUDIO_CONFIG") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => config_dir().join("config.json"),
    }
}

/// Directory for sandbox roots and the persisted env store (`DEVSTUDIO_STATE_DIR`)
pub fn state_dir() -> PathBuf {
    resolve("DEVSTUDIO_STATE_DIR", dirs::data_dir(), &[".local", "share"])
}

fn resolve(override_var: &str, platform: Option<PathBuf>, home_fallback: &[&str]) -> PathBuf {
    if let Some(dir) = std::env::var_os(override_var).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    platform
        .or_else(|| {
            dirs::home_dir().map(|home| home_fallback.iter().fold(home, |p, s| p.join(s)))
        })
        .map(|base| base.join("devstudio"))
        .unwrap_or_else(|| PathBuf::from(".devstudio"))
}
