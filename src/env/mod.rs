//! Env module - Public environment variables for sandboxed code
//!
//! - filter: the `NEXT_PUBLIC_` allow-list and env file rendering
//! - store: persisted config under the `devstudio_env` key
//! - injector: writes the env file into the sandbox

mod filter;
mod injector;
mod store;

pub use filter::{
    filter_env_config, generate_env_file_content, is_allowed_env_var, merge_env_configs,
    EnvConfig, PUBLIC_ENV_PREFIX,
};
pub use injector::{default_env_config, inject_env_vars, EnvInjector};
pub use store::{EnvStore, STORE_KEY};
