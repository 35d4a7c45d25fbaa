//! Persisted env config
//!
//! A JSON document on disk holding the filtered config under the
//! `devstudio_env` key. It is a convenience cache: a missing or unreadable
//! file reads as "nothing stored".

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::filter::EnvConfig;
use crate::error::Result;

/// Key the config is stored under
pub const STORE_KEY: &str = "devstudio_env";

#[derive(Deserialize)]
struct StoredDocument {
    devstudio_env: Option<EnvConfig>,
}

/// File-backed store for the public env config
#[derive(Debug, Clone)]
pub struct EnvStore {
    path: PathBuf,
}

impl EnvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EnvStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored config. Corrupt or missing files yield `None`.
    pub async fn load(&self) -> Option<EnvConfig> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read env store {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<StoredDocument>(&raw) {
            Ok(doc) => doc.devstudio_env,
            Err(e) => {
                warn!("Ignoring corrupt env store {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist `config`, replacing whatever was stored
    pub async fn save(&self, config: &EnvConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut doc = serde_json::Map::new();
        doc.insert(STORE_KEY.to_string(), serde_json::to_value(config)?);
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&doc)?).await?;
        debug!("Saved {} env vars to {}", config.len(), self.path.display());
        Ok(())
    }

    /// Remove the stored config. Clearing an empty store is not an error.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
