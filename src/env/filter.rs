//! Public environment variable allow-list
//!
//! Every way of building an [`EnvConfig`] goes through
//! [`filter_env_config`], so a value of that type never holds a name
//! outside the public prefix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only prefix allowed into the sandbox
pub const PUBLIC_ENV_PREFIX: &str = "NEXT_PUBLIC_";

/// Whether `name` may be exposed to sandboxed code
pub fn is_allowed_env_var(name: &str) -> bool {
    name.len() > PUBLIC_ENV_PREFIX.len() && name.starts_with(PUBLIC_ENV_PREFIX)
}

/// Filtered set of public environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<String>>",
    into = "BTreeMap<String, String>"
)]
pub struct EnvConfig(BTreeMap<String, String>);

impl EnvConfig {
    pub fn new() -> Self {
        EnvConfig::default()
    }

    /// Build from plain name/value pairs, dropping disallowed names
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        filter_env_config(vars.into_iter().map(|(k, v)| (k, Some(v))))
    }

    /// Insert one variable. Returns `false` and leaves the set unchanged
    /// when the name is not public.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if !is_allowed_env_var(&name) {
            return false;
        }
        self.0.insert(name, value.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Variables sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, Option<String>>> for EnvConfig {
    fn from(raw: BTreeMap<String, Option<String>>) -> Self {
        filter_env_config(raw)
    }
}

impl From<EnvConfig> for BTreeMap<String, String> {
    fn from(config: EnvConfig) -> Self {
        config.0
    }
}

/// Keep only public names with a value
pub fn filter_env_config<I, K, V>(config: I) -> EnvConfig
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars = config
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.into();
            let value = value?;
            is_allowed_env_var(&name).then(|| (name, value.into()))
        })
        .collect();
    EnvConfig(vars)
}

/// Merge configs left to right; later values win
pub fn merge_env_configs<'a, I>(configs: I) -> EnvConfig
where
    I: IntoIterator<Item = &'a EnvConfig>,
{
    let mut merged = BTreeMap::new();
    for config in configs {
        merged.extend(config.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    EnvConfig(merged)
}

/// Render `KEY=value` lines sorted by name.
///
/// Newlines inside values are written as `\n` and a lone carriage return as
/// `\r`, so one variable stays on one line.
pub fn generate_env_file_content(config: &EnvConfig) -> String {
    let mut content = String::new();
    for (name, value) in config.iter() {
        let value = value
            .replace("\r\n", "\\n")
            .replace('\n', "\\n")
            .replace('\r', "\\r");
        content.push_str(name);
        content.push('=');
        content.push_str(&value);
        content.push('\n');
    }
    content
}
