//! Configuration types module
//!
//! Re-exports all configuration types.

pub mod remote;
pub mod sandbox;
pub mod vfs;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sandbox runtime configuration
    #[serde(default)]
    pub sandbox: sandbox::SandboxConfig,

    /// Remote repository host configuration
    #[serde(default)]
    pub remote: remote::RemoteConfig,

    /// Repository loading configuration
    #[serde(default)]
    pub vfs: vfs::VfsConfig,

    /// Environment injection settings
    #[serde(default)]
    pub env: vfs::EnvSettings,
}

impl Config {
    /// Load configuration from environment variables and files
    ///
    /// Layers, lowest precedence first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. Environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.sandbox.dev_port, 3000);
        assert_eq!(config.vfs.fetch_batch_size, 10);
        assert_eq!(config.env.file_name, ".env.local");
        assert!(config.remote.token.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            json5::from_str("{ vfs: { fetch_batch_size: 4 }, remote: { token: 'abc' } }").unwrap();
        assert_eq!(config.vfs.fetch_batch_size, 4);
        assert_eq!(config.vfs.max_file_size, 500_000);
        assert!(config.remote.token.is_some());
    }
}
