//! # DevStudio
//!
//! Sandboxed workspace manager for editing and previewing a hosted
//! repository.
//!
//! ## Layers
//!
//! - **Sandbox Runtime:** boots an isolated environment, mounts files, spawns processes and runs a dev server
//! - **Workspace FS:** loads a remote repository into the sandbox and tracks edits against the last commit
//! - **Env Injector:** writes only `NEXT_PUBLIC_` variables into the sandbox
//!
//! A [`Workspace`] bundles all three for one session.

pub mod config;
pub mod env;
pub mod error;
pub mod remote;
pub mod sandbox;
pub mod session;
pub mod vfs;

pub use config::Config;
pub use error::{Error, Result};
pub use session::{OpenOptions, Opened, Workspace};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
