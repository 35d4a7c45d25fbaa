//! Configuration validation
//!
//! Validates configuration and reports issues.

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_sandbox_config(config, result);
    result = validate_remote_config(config, result);
    result = validate_vfs_config(config, result);
    result = validate_env_config(config, result);

    result
}

fn validate_sandbox_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let sandbox = &config.sandbox;

    if sandbox.install_command.is_empty() {
        result = result.with_error(
            ValidationIssue::new("sandbox.install_command", "Install command is empty")
                .with_suggestion("Set sandbox.install_command, e.g. [\"npm\", \"install\"]"),
        );
    }

    if sandbox.dev_command.is_empty() {
        result = result.with_error(
            ValidationIssue::new("sandbox.dev_command", "Dev server command is empty")
                .with_suggestion("Set sandbox.dev_command, e.g. [\"npx\", \"next\", \"dev\"]"),
        );
    }

    if sandbox.dev_ready_timeout.is_zero() {
        result = result.with_error(ValidationIssue::new(
            "sandbox.dev_ready_timeout",
            "Dev server ready timeout must be greater than zero",
        ));
    }

    if sandbox.dev_port == 0 {
        result = result.with_error(ValidationIssue::new(
            "sandbox.dev_port",
            "Dev server port must be a fixed, non-zero port",
        ));
    }

    if !sandbox.dev_command.iter().any(|arg| arg.contains("{port}"))
        && !sandbox
            .dev_command
            .iter()
            .any(|arg| arg == &sandbox.dev_port.to_string())
    {
        result = result.with_warning(
            ValidationIssue::new(
                "sandbox.dev_command",
                "Dev command does not mention the configured port",
            )
            .with_suggestion("Use the {port} placeholder so the server binds to sandbox.dev_port"),
        );
    }

    result
}

fn validate_remote_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if let Err(e) = url::Url::parse(&config.remote.base_url) {
        result = result.with_error(
            ValidationIssue::new(
                "remote.base_url",
                format!("Invalid repository host URL: {}", e),
            )
            .with_suggestion("Set DEVSTUDIO_REMOTE_URL or remote.base_url"),
        );
    }

    if config.remote.token.is_none() {
        result = result.with_warning(
            ValidationIssue::new(
                "remote.token",
                "No repository host token configured; only public repositories can be loaded",
            )
            .with_suggestion("Set DEVSTUDIO_TOKEN or pass --token"),
        );
    }

    result
}

fn validate_vfs_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.vfs.fetch_batch_size == 0 {
        result = result.with_error(ValidationIssue::new(
            "vfs.fetch_batch_size",
            "Fetch batch size must be at least 1",
        ));
    }

    if config.vfs.max_file_size == 0 {
        result = result.with_warning(ValidationIssue::new(
            "vfs.max_file_size",
            "Max file size is zero; every file will be replaced by a placeholder",
        ));
    }

    result
}

fn validate_env_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    for key in config.env.defaults.keys() {
        if !crate::env::is_allowed_env_var(key) {
            result = result.with_warning(
                ValidationIssue::new(
                    format!("env.defaults.{}", key),
                    "Variable is not public and will never be injected",
                )
                .with_suggestion(format!(
                    "Rename it with the {} prefix or remove it",
                    crate::env::PUBLIC_ENV_PREFIX
                )),
            );
        }
    }

    if config.env.file_name.contains('/') || config.env.file_name.is_empty() {
        result = result.with_error(ValidationIssue::new(
            "env.file_name",
            "Env file name must be a plain file name at the sandbox root",
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        // Default config has a token warning but no errors
        assert!(result.errors.is_empty());
        assert!(result.warnings.iter().any(|w| w.path == "remote.token"));
    }

    #[test]
    fn test_zero_batch_size_is_error() {
        let mut config = Config::default();
        config.vfs.fetch_batch_size = 0;
        let result = validate_config(&config);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "vfs.fetch_batch_size"));
    }

    #[test]
    fn test_secret_default_is_flagged() {
        let mut config = Config::default();
        config
            .env
            .defaults
            .insert("DATABASE_URL".to_string(), "postgres://".to_string());
        let result = validate_config(&config);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.path == "env.defaults.DATABASE_URL"));
    }
}
