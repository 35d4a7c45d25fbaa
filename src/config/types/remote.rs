//! Remote repository host configuration

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Remote repository host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the repository host API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token used when a load call does not supply one
    #[serde(skip_serializing, default)]
    pub token: Option<SecretString>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api/devstudio".to_string()
}

fn default_timeout() -> u64 {
    30
}
