//! Host-directory sandbox
//!
//! Each boot gets its own session directory under the configured root.
//! Processes run there through `tokio::process` with a cleared environment,
//! so host secrets never reach sandboxed code. A process spawned with a
//! ready port is probed over TCP until it accepts connections.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::backend::{
    DirEntry, SandboxBackend, SandboxInstance, ServerReady, SpawnOptions, SpawnedProcess,
};
use super::tree::{normalize_path, FileTree};
use crate::error::{Error, Result};

/// Interval between TCP readiness probes
const READY_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Sandbox backed by a directory on the host
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend that boots sessions under `root`
    pub fn new(root: PathBuf) -> Self {
        LocalBackend { root }
    }

    /// Directory that holds session directories
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl SandboxBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>> {
        let dir = self.root.join(format!("session-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            Error::Sandbox(format!("Failed to create sandbox at {}: {}", dir.display(), e))
        })?;
        info!("Local sandbox booted at {}", dir.display());
        Ok(Arc::new(LocalInstance::new(dir)))
    }
}

/// A booted host-directory sandbox
#[derive(Debug)]
pub struct LocalInstance {
    dir: PathBuf,
    ready_tx: broadcast::Sender<ServerReady>,
    shutdown: watch::Sender<bool>,
}

impl LocalInstance {
    fn new(dir: PathBuf) -> Self {
        let (ready_tx, _) = broadcast::channel(16);
        let (shutdown, _) = watch::channel(false);
        LocalInstance {
            dir,
            ready_tx,
            shutdown,
        }
    }

    /// Session directory on the host
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(self.dir.join(normalize_path(path)?))
    }

    fn resolve_dir(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() || path == "." || path == "/" {
            Ok(self.dir.clone())
        } else {
            self.resolve(path)
        }
    }
}

fn map_io(path: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.to_string())
    } else {
        Error::Sandbox(format!("{}: {}", path, e))
    }
}

#[async_trait]
impl SandboxInstance for LocalInstance {
    async fn mount(&self, tree: &FileTree) -> Result<()> {
        for dir in tree.directories() {
            let target = self.resolve(&dir)?;
            tokio::fs::create_dir_all(&target)
                .await
                .map_err(|e| map_io(&dir, e))?;
        }
        for (path, content) in tree.files() {
            let target = self.resolve(&path)?;
            tokio::fs::write(&target, content)
                .await
                .map_err(|e| map_io(&path, e))?;
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let target = self.resolve(path)?;
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path)?;
        let metadata = tokio::fs::symlink_metadata(&target)
            .await
            .map_err(|e| map_io(path, e))?;
        let result = if metadata.is_dir() {
            if recursive {
                tokio::fs::remove_dir_all(&target).await
            } else {
                tokio::fs::remove_dir(&target).await
            }
        } else {
            tokio::fs::remove_file(&target).await
        };
        result.map_err(|e| map_io(path, e))
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let target = self.resolve_dir(path)?;
        let mut reader = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| map_io(path, e))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| map_io(path, e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            let file_type = entry.file_type().await.map_err(|e| map_io(path, e))?;
            if file_type.is_dir() {
                entries.push(DirEntry::directory(name));
            } else {
                entries.push(DirEntry::file(name));
            }
        }
        Ok(entries)
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        let target = self.resolve(path)?;
        let result = if recursive {
            tokio::fs::create_dir_all(&target).await
        } else {
            tokio::fs::create_dir(&target).await
        };
        result.map_err(|e| map_io(path, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| map_io(from, e))
    }

    async fn spawn(&self, cmd: &str, args: &[String], opts: SpawnOptions) -> Result<SpawnedProcess> {
        let program = which::which(cmd)
            .map_err(|e| Error::Sandbox(format!("Command not found: {} ({})", cmd, e)))?;
        let cwd = match &opts.cwd {
            Some(dir) => self.resolve(dir)?,
            None => self.dir.clone(),
        };

        let mut command = Command::new(&program);
        command
            .args(args)
            .current_dir(&cwd)
            .env_clear()
            .env("HOME", &self.dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            command.env("PATH", path);
        }
        command.envs(&opts.env);

        let mut child = command
            .spawn()
            .map_err(|e| Error::Sandbox(format!("Failed to spawn {}: {}", cmd, e)))?;
        debug!("Spawned {} in {}", program.display(), cwd.display());

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel::<String>();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let (exited_tx, exited_rx) = watch::channel(false);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump_output(stdout, out_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump_output(stderr, out_tx.clone()));
        }
        drop(out_tx);

        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                while let Some(data) = in_rx.recv().await {
                    if stdin.write_all(data.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }

        if let Some(port) = opts.ready_port {
            tokio::spawn(probe_ready(port, self.ready_tx.clone(), exited_rx));
        }

        let mut shutdown = self.shutdown.subscribe();
        let label = cmd.to_string();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = &mut kill_rx => {
                    let _ = child.start_kill();
                    child.wait().await
                }
                _ = async { let _ = shutdown.wait_for(|down| *down).await; } => {
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            let code = match status {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    warn!("Failed to wait for {}: {}", label, e);
                    -1
                }
            };
            let _ = exited_tx.send(true);
            let _ = exit_tx.send(code);
        });

        Ok(SpawnedProcess {
            output: out_rx,
            input: in_tx,
            exit: exit_rx,
            kill: kill_tx,
        })
    }

    fn subscribe_server_ready(&self) -> broadcast::Receiver<ServerReady> {
        self.ready_tx.subscribe()
    }

    async fn teardown(&self) -> Result<()> {
        self.shutdown.send_replace(true);
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Sandbox(format!(
                "Failed to remove {}: {}",
                self.dir.display(),
                e
            ))),
        }
    }
}

async fn pump_output<R>(mut reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(String::from_utf8_lossy(&buf[..n]).to_string()).is_err() {
                    break;
                }
            }
        }
    }
}

async fn probe_ready(
    port: u16,
    ready_tx: broadcast::Sender<ServerReady>,
    mut exited: watch::Receiver<bool>,
) {
    loop {
        if *exited.borrow() {
            return;
        }
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            let _ = ready_tx.send(ServerReady {
                port,
                url: format!("http://localhost:{}", port),
            });
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(READY_PROBE_INTERVAL) => {}
            changed = exited.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
