//! Virtual filesystem and environment configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Repository loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfsConfig {
    /// Number of file contents fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub fetch_batch_size: usize,
    /// Files larger than this (bytes) are replaced by a placeholder
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Additional path segments or file names never loaded into the sandbox
    #[serde(default)]
    pub extra_skip_patterns: Vec<String>,
}

impl Default for VfsConfig {
    fn default() -> Self {
        VfsConfig {
            fetch_batch_size: default_batch_size(),
            max_file_size: default_max_file_size(),
            extra_skip_patterns: Vec::new(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    500_000
}

/// Environment injection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvSettings {
    /// Name of the env file written at the sandbox root
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Where the persisted env blob lives
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Public defaults merged under stored values
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl Default for EnvSettings {
    fn default() -> Self {
        EnvSettings {
            file_name: default_file_name(),
            store_path: default_store_path(),
            defaults: BTreeMap::new(),
        }
    }
}

fn default_file_name() -> String {
    ".env.local".to_string()
}

fn default_store_path() -> PathBuf {
    crate::config::paths::state_dir().join("devstudio_env.json")
}
