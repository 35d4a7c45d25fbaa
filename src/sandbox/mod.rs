//! Sandbox module - Isolated execution environment for a workspace
//!
//! - backend: traits every sandbox backend implements
//! - local: host-directory sandbox driven by `tokio::process`
//! - memory: in-memory sandbox with scripted processes
//! - runtime: boot/mount/spawn/dev-server lifecycle on top of a backend
//! - tree: the mountable file tree
//! - output: broadcast stream of terminal output

mod backend;
mod local;
pub mod memory;
mod output;
mod process;
mod runtime;
mod tree;

pub use backend::{
    DirEntry, EntryKind, SandboxBackend, SandboxInstance, ServerReady, SpawnOptions,
    SpawnedProcess,
};
pub use local::{LocalBackend, LocalInstance};
pub use memory::{MemoryBackend, MemoryInstance, ScriptedProcess};
pub use output::{OutputChunk, OutputKind, OutputSink};
pub use process::{DevServer, DevServerHandle, ExitWatcher, ProcessHandle};
pub use runtime::SandboxRuntime;
pub use tree::{normalize_path, parent_dirs, FileTree, Node};

use std::sync::Arc;

use crate::config::SandboxConfig;

/// Create a runtime backed by a host directory under `config.root`
pub fn create_runtime(config: &SandboxConfig) -> SandboxRuntime {
    let backend = LocalBackend::new(config.root.clone());
    SandboxRuntime::new(Arc::new(backend), config.clone())
}
