//! Sandbox backend traits and types
//!
//! A backend boots isolated environments. An instance exposes the raw
//! primitives the runtime builds on: a filesystem that does not create
//! parent directories on its own, process spawning with combined output,
//! server-ready notifications and teardown.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::tree::FileTree;
use crate::error::{Error, Result};

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A directory entry returned by `read_dir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not a full path)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Options for spawning a process inside the sandbox
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Working directory relative to the sandbox root
    pub cwd: Option<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Port the process is expected to listen on, if any
    pub ready_port: Option<u16>,
}

impl SpawnOptions {
    /// Set working directory
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Watch a port for the server-ready event
    pub fn with_ready_port(mut self, port: u16) -> Self {
        self.ready_port = Some(port);
        self
    }
}

/// Raw process returned by a backend
///
/// `exit` resolves with the exit code; if it is dropped without a value the
/// runtime treats the process as having exited with `-1`. Sending on `kill`
/// asks the backend to terminate the process.
pub struct SpawnedProcess {
    /// Combined stdout/stderr chunks
    pub output: mpsc::UnboundedReceiver<String>,
    /// Input writer
    pub input: mpsc::UnboundedSender<String>,
    /// Exit code
    pub exit: oneshot::Receiver<i32>,
    /// Kill switch
    pub kill: oneshot::Sender<()>,
}

/// Server-ready notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReady {
    /// Port the server is listening on
    pub port: u16,
    /// Externally reachable URL
    pub url: String,
}

/// A booted sandbox environment
#[async_trait]
pub trait SandboxInstance: Send + Sync {
    /// Merge a file tree into the sandbox filesystem
    async fn mount(&self, tree: &FileTree) -> Result<()>;

    /// Write a file. The parent directory must already exist.
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Read a file as UTF-8 text
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Remove a file or directory. Absent paths yield `Error::NotFound`.
    async fn remove(&self, path: &str, recursive: bool) -> Result<()>;

    /// List a directory. Use `""` for the sandbox root.
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Create a directory
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()>;

    /// Native rename, when the backend has one
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let _ = (from, to);
        Err(Error::Unsupported("native rename".to_string()))
    }

    /// Spawn a process inside the sandbox
    async fn spawn(&self, cmd: &str, args: &[String], opts: SpawnOptions) -> Result<SpawnedProcess>;

    /// Subscribe to server-ready notifications
    fn subscribe_server_ready(&self) -> broadcast::Receiver<ServerReady>;

    /// Destroy the environment
    async fn teardown(&self) -> Result<()>;
}

/// Boots sandbox environments
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Boot a fresh environment
    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>>;
}
