//! Sandbox configuration types
//!
//! Configuration for the sandbox runtime: where the local backend keeps its
//! files and which commands it runs for shim enablement, install and dev.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sandbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Host directory that backs the local sandbox
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Package-manager shim enablement, run once after boot
    #[serde(default = "default_shim_command")]
    pub shim_command: Vec<String>,
    /// Dependency install command
    #[serde(default = "default_install_command")]
    pub install_command: Vec<String>,
    /// Framework dev server command
    #[serde(default = "default_dev_command")]
    pub dev_command: Vec<String>,
    /// Port the dev server listens on
    #[serde(default = "default_dev_port")]
    pub dev_port: u16,
    /// How long to wait for the dev server to report ready
    #[serde(default = "default_dev_ready_timeout", with = "humantime_serde")]
    pub dev_ready_timeout: Duration,
    /// Kill the dev server when it misses the ready deadline
    #[serde(default)]
    pub stop_on_timeout: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            root: default_root(),
            shim_command: default_shim_command(),
            install_command: default_install_command(),
            dev_command: default_dev_command(),
            dev_port: default_dev_port(),
            dev_ready_timeout: default_dev_ready_timeout(),
            stop_on_timeout: false,
        }
    }
}

impl SandboxConfig {
    /// Dev command with the configured port substituted for `{port}`
    pub fn dev_command_for_port(&self) -> Vec<String> {
        let port = self.dev_port.to_string();
        self.dev_command
            .iter()
            .map(|arg| arg.replace("{port}", &port))
            .collect()
    }
}

fn default_root() -> PathBuf {
    crate::config::paths::state_dir().join("sandbox")
}

fn default_shim_command() -> Vec<String> {
    vec!["corepack".to_string(), "enable".to_string()]
}

fn default_install_command() -> Vec<String> {
    vec!["npm".to_string(), "install".to_string()]
}

fn default_dev_command() -> Vec<String> {
    ["npx", "next", "dev", "-H", "0.0.0.0", "-p", "{port}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_dev_port() -> u16 {
    3000
}

fn default_dev_ready_timeout() -> Duration {
    Duration::from_secs(60)
}
