//! Env file injection into the sandbox

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::filter::{
    filter_env_config, generate_env_file_content, merge_env_configs, EnvConfig,
};
use super::store::EnvStore;
use crate::config::EnvSettings;
use crate::error::{Error, Result};
use crate::sandbox::SandboxRuntime;

/// Write `config` as `file_name` at the sandbox root, replacing any previous
/// file. Returns the number of variables written.
pub async fn inject_env_vars(
    runtime: &SandboxRuntime,
    file_name: &str,
    config: &EnvConfig,
) -> Result<usize> {
    if !runtime.is_ready() {
        return Err(Error::NotReady(
            "cannot inject env vars: sandbox is not booted".to_string(),
        ));
    }

    let content = generate_env_file_content(config);
    runtime.write_file(file_name, &content).await?;
    runtime
        .output()
        .system(format!("Wrote {} public env vars to {}", config.len(), file_name));
    info!("Injected {} env vars into {}", config.len(), file_name);
    Ok(config.len())
}

/// Public defaults: configured values overlaid with public variables from
/// the given process environment
pub fn default_env_config<I>(defaults: &BTreeMap<String, String>, process_env: I) -> EnvConfig
where
    I: IntoIterator<Item = (String, String)>,
{
    let configured = EnvConfig::from_vars(defaults.clone());
    let inherited = filter_env_config(process_env.into_iter().map(|(k, v)| (k, Some(v))));
    merge_env_configs([&configured, &inherited])
}

/// Env injection bound to one runtime and one persisted store
pub struct EnvInjector {
    runtime: Arc<SandboxRuntime>,
    settings: EnvSettings,
    store: EnvStore,
}

impl EnvInjector {
    pub fn new(runtime: Arc<SandboxRuntime>, settings: EnvSettings) -> Self {
        let store = EnvStore::new(settings.store_path.clone());
        EnvInjector {
            runtime,
            settings,
            store,
        }
    }

    pub fn store(&self) -> &EnvStore {
        &self.store
    }

    /// Write `config` to the configured env file in the sandbox
    pub async fn inject_env_vars(&self, config: &EnvConfig) -> Result<usize> {
        inject_env_vars(&self.runtime, &self.settings.file_name, config).await
    }

    /// Configured defaults plus public variables of this process
    pub fn get_default_env_config(&self) -> EnvConfig {
        default_env_config(&self.settings.defaults, std::env::vars())
    }

    pub async fn load_stored_env_config(&self) -> Option<EnvConfig> {
        self.store.load().await
    }

    pub async fn save_env_config(&self, config: &EnvConfig) -> Result<()> {
        self.store.save(config).await
    }

    pub async fn clear_stored_env_config(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Defaults overlaid with the stored config
    pub async fn resolve_env_config(&self) -> EnvConfig {
        let defaults = self.get_default_env_config();
        match self.load_stored_env_config().await {
            Some(stored) => merge_env_configs([&defaults, &stored]),
            None => defaults,
        }
    }
}
