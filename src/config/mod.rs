//! Configuration module - Modular configuration management
//!
//! - types/mod.rs: Root `Config`
//! - types/sandbox.rs: Sandbox runtime commands, ports and timeouts
//! - types/remote.rs: Repository host endpoint and token
//! - types/vfs.rs: Repository loading and env injection settings
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
pub(crate) mod paths;
mod types;
mod validation;

pub use types::Config;
pub use types::remote::RemoteConfig;
pub use types::sandbox::SandboxConfig;
pub use types::vfs::{EnvSettings, VfsConfig};

pub use io::{
    apply_env_overrides, load_config, load_config_from_path, read_config_snapshot, save_config,
    ConfigSnapshot,
};
pub use paths::{config_dir, config_path, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
