//! Sandbox runtime
//!
//! Owns one booted sandbox instance and every process spawned in it. All
//! filesystem and process operations fail fast with [`Error::NotReady`]
//! until [`SandboxRuntime::boot`] has succeeded. At most one dev server is
//! tracked at a time; starting a new one stops the previous one first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::backend::{DirEntry, EntryKind, SandboxBackend, SandboxInstance, SpawnOptions};
use super::output::OutputSink;
use super::process::{DevServer, DevServerHandle, ProcessHandle};
use super::tree::{normalize_path, parent_dirs, FileTree};
use crate::config::SandboxConfig;
use crate::error::{Error, Result};

/// How long a replaced dev server gets to exit before a new one is spawned
const DEV_SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Sandbox runtime
pub struct SandboxRuntime {
    backend: Arc<dyn SandboxBackend>,
    config: SandboxConfig,
    output: OutputSink,
    instance: RwLock<Option<Arc<dyn SandboxInstance>>>,
    boot_lock: tokio::sync::Mutex<()>,
    dev_server: Mutex<Option<DevServerHandle>>,
    next_process_id: AtomicU64,
}

impl SandboxRuntime {
    /// Create a runtime over `backend`. Nothing is booted yet.
    pub fn new(backend: Arc<dyn SandboxBackend>, config: SandboxConfig) -> Self {
        SandboxRuntime {
            backend,
            config,
            output: OutputSink::new(),
            instance: RwLock::new(None),
            boot_lock: tokio::sync::Mutex::new(()),
            dev_server: Mutex::new(None),
            next_process_id: AtomicU64::new(0),
        }
    }

    /// Output stream for terminal UIs
    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Runtime configuration
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Whether a sandbox is booted
    pub fn is_ready(&self) -> bool {
        read(&self.instance).is_some()
    }

    /// Whether a dev server handle is registered
    pub fn is_dev_server_running(&self) -> bool {
        lock(&self.dev_server).is_some()
    }

    /// URL of the dev server, once it reported ready
    pub fn dev_server_url(&self) -> Option<String> {
        lock(&self.dev_server).as_ref().and_then(|h| h.url.clone())
    }

    /// The booted sandbox instance, if any
    pub fn container(&self) -> Option<Arc<dyn SandboxInstance>> {
        read(&self.instance).clone()
    }

    fn require_instance(&self, action: &str) -> Result<Arc<dyn SandboxInstance>> {
        self.container().ok_or_else(|| {
            Error::NotReady(format!("cannot {}: sandbox is not booted, call boot() first", action))
        })
    }

    /// Boot the sandbox. A second call is a no-op.
    pub async fn boot(&self) -> Result<()> {
        let _guard = self.boot_lock.lock().await;
        if self.is_ready() {
            self.output.system("Sandbox already booted");
            debug!("boot() called on a booted runtime");
            return Ok(());
        }

        self.output
            .system(format!("Booting {} sandbox...", self.backend.name()));
        let instance = match self.backend.boot().await {
            Ok(instance) => instance,
            Err(e) => {
                self.output.error(format!("Sandbox boot failed: {}", e));
                return Err(e);
            }
        };
        *write(&self.instance) = Some(instance.clone());
        info!("Sandbox booted ({})", self.backend.name());

        self.enable_package_manager_shim(&instance).await;
        self.output.system("Sandbox ready");
        Ok(())
    }

    async fn enable_package_manager_shim(&self, instance: &Arc<dyn SandboxInstance>) {
        let Some((cmd, args)) = self.config.shim_command.split_first() else {
            return;
        };
        let outcome = match self
            .spawn_on(instance, cmd, args, SpawnOptions::default())
            .await
        {
            Ok(process) => match process.wait().await {
                0 => Ok(()),
                code => Err(Error::ProcessExit {
                    command: process.command_line().to_string(),
                    code,
                }),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            warn!("Package manager shim not enabled: {}", e);
            self.output
                .error(format!("Package manager shim not enabled: {}", e));
        }
    }

    /// Merge a flat `path -> content` map into the sandbox
    pub async fn mount(&self, files: &BTreeMap<String, String>) -> Result<()> {
        let instance = self.require_instance("mount files")?;
        let tree = FileTree::from_files(files)?;
        instance.mount(&tree).await?;
        self.output
            .system(format!("Mounted {} files", tree.file_count()));
        debug!("Mounted {} files", tree.file_count());
        Ok(())
    }

    /// Write a file, creating parent directories as needed
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let instance = self.require_instance("write files")?;
        let path = normalize_path(path)?;
        ensure_parent_dirs(instance.as_ref(), &path).await?;
        instance.write_file(&path, content).await
    }

    /// Read a file
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let instance = self.require_instance("read files")?;
        instance.read_file(&normalize_path(path)?).await
    }

    /// Delete a file or directory. Absent paths yield `Error::NotFound`.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let instance = self.require_instance("delete files")?;
        instance.remove(&normalize_path(path)?, true).await
    }

    /// Rename a file.
    ///
    /// Uses the backend's native rename when it has one. Otherwise the file
    /// is read, written to `to` and then removed from `from`; a failure
    /// between the last two steps leaves both paths present.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let instance = self.require_instance("rename files")?;
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        if from == to {
            return Ok(());
        }
        ensure_parent_dirs(instance.as_ref(), &to).await?;

        match instance.rename(&from, &to).await {
            Err(Error::Unsupported(_)) => {
                debug!("Backend has no native rename, copying {} -> {}", from, to);
                let content = instance.read_file(&from).await?;
                instance.write_file(&to, &content).await?;
                instance.remove(&from, false).await
            }
            other => other,
        }
    }

    /// List a directory, directories first then by name
    pub async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let instance = self.require_instance("list directories")?;
        let mut entries = instance.read_dir(path).await?;
        entries.sort_by(|a, b| {
            let rank = |e: &DirEntry| match e.kind {
                EntryKind::Directory => 0,
                EntryKind::File => 1,
            };
            rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    /// Spawn a process inside the sandbox
    pub async fn spawn(&self, cmd: &str, args: &[String], opts: SpawnOptions) -> Result<ProcessHandle> {
        let instance = self.require_instance("spawn processes")?;
        self.spawn_on(&instance, cmd, args, opts).await
    }

    async fn spawn_on(
        &self,
        instance: &Arc<dyn SandboxInstance>,
        cmd: &str,
        args: &[String],
        opts: SpawnOptions,
    ) -> Result<ProcessHandle> {
        let command_line = std::iter::once(cmd)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.output.input(command_line.clone());

        let spawned = instance.spawn(cmd, args, opts).await.map_err(|e| {
            self.output.error(format!("Failed to start `{}`: {}", command_line, e));
            e
        })?;
        let id = self.next_process_id.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Started process {}: {}", id, command_line);
        Ok(ProcessHandle::start(
            id,
            command_line,
            spawned,
            self.output.clone(),
        ))
    }

    /// Run a whitespace-separated command line to completion and return its exit code
    pub async fn run(&self, command_line: &str) -> Result<i32> {
        let argv: Vec<String> = command_line.split_whitespace().map(String::from).collect();
        let (cmd, args) = split_command(&argv, "command line")?;
        let process = self.spawn(cmd, args, SpawnOptions::default()).await?;
        Ok(process.wait().await)
    }

    /// Install dependencies, failing on a non-zero exit code
    pub async fn install_deps(&self) -> Result<()> {
        let (cmd, args) = split_command(&self.config.install_command, "install command")?;
        let process = self.spawn(cmd, args, SpawnOptions::default()).await?;
        let code = process.wait().await;
        if code != 0 {
            self.output
                .error(format!("Install failed with exit code {}", code));
            return Err(Error::ProcessExit {
                command: process.command_line().to_string(),
                code,
            });
        }
        self.output.system("Dependencies installed");
        Ok(())
    }

    /// Start the dev server and wait for it to report ready.
    ///
    /// Any running dev server is stopped and must exit before the new one
    /// is spawned. Fails with
    /// [`Error::Timeout`] if no ready event arrives in time, with
    /// [`Error::ProcessExit`] if the server exits non-zero first, and with
    /// [`Error::Cancelled`] if it is stopped while waiting. A timed-out
    /// server stays registered unless `stop_on_timeout` is set; call
    /// [`SandboxRuntime::stop_dev_server`] to reclaim it.
    pub async fn start_dev_server(&self) -> Result<DevServer> {
        self.replace_dev_server().await?;
        let instance = self.require_instance("start the dev server")?;

        let argv = self.config.dev_command_for_port();
        let (cmd, args) = split_command(&argv, "dev command")?;
        let mut ready_rx = instance.subscribe_server_ready();
        let opts = SpawnOptions::default().with_ready_port(self.config.dev_port);
        let process = Arc::new(self.spawn_on(&instance, cmd, args, opts).await?);
        let process_id = process.id();
        *lock(&self.dev_server) = Some(DevServerHandle {
            process: process.clone(),
            url: None,
        });

        let exit = process.exit();
        let timeout = self.config.dev_ready_timeout;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut exit_seen = false;

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    let message = format!(
                        "dev server did not become ready within {}",
                        humantime_serde::re::humantime::format_duration(timeout)
                    );
                    self.output.error(format!("Dev server timed out: {}", message));
                    if self.config.stop_on_timeout {
                        self.stop_dev_server_if(process_id);
                    }
                    return Err(Error::Timeout(message));
                }
                event = ready_rx.recv() => match event {
                    Ok(ready) => {
                        {
                            let mut slot = lock(&self.dev_server);
                            match slot.as_mut() {
                                Some(handle) if handle.process.id() == process_id => {
                                    handle.url = Some(ready.url.clone());
                                }
                                _ => {
                                    return Err(Error::Cancelled(
                                        "dev server was stopped before it became ready".to_string(),
                                    ))
                                }
                            }
                        }
                        info!("Dev server ready at {}", ready.url);
                        self.output.system(format!("Dev server ready at {}", ready.url));
                        return Ok(DevServer {
                            url: ready.url,
                            port: ready.port,
                            process,
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Missed {} ready events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        return Err(Error::Sandbox(
                            "sandbox stopped publishing server-ready events".to_string(),
                        ));
                    }
                },
                code = exit.wait(), if !exit_seen => {
                    exit_seen = true;
                    if !self.is_current_dev_server(process_id) {
                        return Err(Error::Cancelled(
                            "dev server was stopped before it became ready".to_string(),
                        ));
                    }
                    if code != 0 {
                        self.stop_dev_server_if(process_id);
                        self.output.error(format!("Dev server exited with code {}", code));
                        return Err(Error::ProcessExit {
                            command: process.command_line().to_string(),
                            code,
                        });
                    }
                    debug!("Dev server exited cleanly before reporting ready");
                }
            }
        }
    }

    fn is_current_dev_server(&self, process_id: u64) -> bool {
        lock(&self.dev_server)
            .as_ref()
            .is_some_and(|h| h.process.id() == process_id)
    }

    fn stop_dev_server_if(&self, process_id: u64) {
        if self.is_current_dev_server(process_id) {
            self.stop_dev_server();
        }
    }

    /// Kill and clear the dev server handle. Returns false if none was registered.
    pub fn stop_dev_server(&self) -> bool {
        let handle = lock(&self.dev_server).take();
        match handle {
            Some(handle) => {
                handle.process.kill();
                self.output.system("Dev server stopped");
                info!("Dev server stopped");
                true
            }
            None => false,
        }
    }

    async fn replace_dev_server(&self) -> Result<()> {
        let Some(previous) = lock(&self.dev_server).take() else {
            return Ok(());
        };
        previous.process.kill();
        self.output.system("Stopping previous dev server");
        match tokio::time::timeout(DEV_SERVER_STOP_TIMEOUT, previous.process.wait()).await {
            Ok(code) => {
                debug!("Previous dev server exited with code {}", code);
                Ok(())
            }
            Err(_) => Err(Error::Timeout(format!(
                "previous dev server did not exit within {}",
                humantime_serde::re::humantime::format_duration(DEV_SERVER_STOP_TIMEOUT)
            ))),
        }
    }

    /// Tear the sandbox down without booting a new one
    pub async fn shutdown(&self) -> Result<()> {
        let _guard = self.boot_lock.lock().await;
        self.stop_dev_server();
        let instance = write(&self.instance).take();
        if let Some(instance) = instance {
            instance.teardown().await?;
            self.output.system("Sandbox torn down");
        }
        Ok(())
    }

    /// Stop the dev server, destroy the sandbox and boot a fresh one
    pub async fn reset(&self) -> Result<()> {
        self.output.system("Resetting sandbox...");
        if let Err(e) = self.shutdown().await {
            warn!("Sandbox teardown failed during reset: {}", e);
            self.output.error(format!("Teardown failed: {}", e));
        }
        self.boot().await
    }
}

/// Create every ancestor directory of `path` (mkdir -p of its parent)
pub(crate) async fn ensure_parent_dirs(instance: &dyn SandboxInstance, path: &str) -> Result<()> {
    match parent_dirs(path).pop() {
        Some(parent) => instance.mkdir(&parent, true).await,
        None => Ok(()),
    }
}

fn split_command<'a>(argv: &'a [String], what: &str) -> Result<(&'a str, &'a [String])> {
    argv.split_first()
        .map(|(cmd, args)| (cmd.as_str(), args))
        .ok_or_else(|| Error::InvalidInput(format!("{} is empty", what)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::memory::{MemoryBackend, ScriptedProcess};
    use crate::sandbox::output::OutputKind;

    fn runtime_with(backend: Arc<MemoryBackend>) -> SandboxRuntime {
        let config = SandboxConfig {
            dev_ready_timeout: Duration::from_millis(300),
            ..SandboxConfig::default()
        };
        SandboxRuntime::new(backend, config)
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<crate::sandbox::OutputChunk>) -> Vec<(OutputKind, String)> {
        let mut out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            out.push((chunk.kind, chunk.text));
        }
        out
    }

    #[tokio::test]
    async fn test_operations_require_boot() {
        let runtime = runtime_with(Arc::new(MemoryBackend::new()));
        assert!(!runtime.is_ready());

        assert!(matches!(runtime.write_file("a.ts", "1").await, Err(Error::NotReady(_))));
        assert!(matches!(runtime.read_file("a.ts").await, Err(Error::NotReady(_))));
        assert!(matches!(runtime.install_deps().await, Err(Error::NotReady(_))));
        assert!(matches!(runtime.start_dev_server().await, Err(Error::NotReady(_))));
        assert!(matches!(
            runtime.mount(&BTreeMap::new()).await,
            Err(Error::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_boot_is_idempotent() {
        let backend = Arc::new(MemoryBackend::new());
        let runtime = runtime_with(backend.clone());
        let mut rx = runtime.output().subscribe();

        runtime.boot().await.unwrap();
        runtime.boot().await.unwrap();

        assert!(runtime.is_ready());
        assert_eq!(backend.boot_count(), 1);
        assert_eq!(backend.spawned_commands(), vec!["corepack enable"]);
        let lines = drain(&mut rx);
        assert!(lines
            .iter()
            .any(|(kind, text)| *kind == OutputKind::System && text == "Sandbox already booted"));
    }

    #[tokio::test]
    async fn test_boot_failure_leaves_runtime_not_ready() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_boot(true);
        let runtime = runtime_with(backend.clone());

        assert!(runtime.boot().await.is_err());
        assert!(!runtime.is_ready());

        backend.fail_boot(false);
        runtime.boot().await.unwrap();
        assert!(runtime.is_ready());
    }

    #[tokio::test]
    async fn test_shim_failure_is_not_fatal() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("corepack enable", ScriptedProcess::exits(1));
        let runtime = runtime_with(backend);
        runtime.boot().await.unwrap();
        assert!(runtime.is_ready());
    }

    #[tokio::test]
    async fn test_write_file_creates_parent_dirs() {
        let backend = Arc::new(MemoryBackend::new());
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();

        runtime.write_file("src/app/page.tsx", "x").await.unwrap();
        assert_eq!(runtime.read_file("./src/app/page.tsx").await.unwrap(), "x");

        let root = runtime.readdir("").await.unwrap();
        assert_eq!(root, vec![DirEntry::directory("src")]);
    }

    #[tokio::test]
    async fn test_readdir_sorts_directories_first() {
        let runtime = runtime_with(Arc::new(MemoryBackend::new()));
        runtime.boot().await.unwrap();
        let files: BTreeMap<String, String> = [("b.ts", ""), ("a.ts", ""), ("lib/x.ts", "")]
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        runtime.mount(&files).await.unwrap();

        let names: Vec<String> = runtime
            .readdir("")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["lib", "a.ts", "b.ts"]);
    }

    #[tokio::test]
    async fn test_rename_falls_back_to_copy() {
        let backend = Arc::new(MemoryBackend::new());
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();
        runtime.write_file("old.ts", "content").await.unwrap();

        runtime.rename("old.ts", "moved/new.ts").await.unwrap();

        let files = backend.instance().unwrap().files();
        assert_eq!(files.get("moved/new.ts").map(String::as_str), Some("content"));
        assert!(!files.contains_key("old.ts"));
    }

    #[tokio::test]
    async fn test_rename_onto_itself_is_a_no_op() {
        let backend = Arc::new(MemoryBackend::new());
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();
        runtime.write_file("a.ts", "content").await.unwrap();

        runtime.rename("a.ts", "/a.ts").await.unwrap();

        assert_eq!(runtime.read_file("a.ts").await.unwrap(), "content");
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_found() {
        let runtime = runtime_with(Arc::new(MemoryBackend::new()));
        runtime.boot().await.unwrap();
        let err = runtime.delete_file("ghost.ts").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_spawn_echoes_command_line() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("node", ScriptedProcess::exits(0).with_output("v20.0.0"));
        let runtime = runtime_with(backend);
        runtime.boot().await.unwrap();
        let mut rx = runtime.output().subscribe();

        let code = runtime.run("node --version").await.unwrap();
        assert_eq!(code, 0);

        let lines = drain(&mut rx);
        assert_eq!(lines[0], (OutputKind::Input, "node --version".to_string()));
        assert!(lines.contains(&(OutputKind::Output, "v20.0.0".to_string())));
    }

    #[tokio::test]
    async fn test_run_rejects_empty_command() {
        let runtime = runtime_with(Arc::new(MemoryBackend::new()));
        runtime.boot().await.unwrap();
        assert!(matches!(runtime.run("   ").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_install_failure_carries_exit_code() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npm install", ScriptedProcess::exits(2).with_output("npm ERR!"));
        let runtime = runtime_with(backend);
        runtime.boot().await.unwrap();

        match runtime.install_deps().await {
            Err(Error::ProcessExit { command, code }) => {
                assert_eq!(command, "npm install");
                assert_eq!(code, 2);
            }
            other => panic!("expected ProcessExit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_install_success() {
        let runtime = runtime_with(Arc::new(MemoryBackend::new()));
        runtime.boot().await.unwrap();
        runtime.install_deps().await.unwrap();
    }

    #[tokio::test]
    async fn test_dev_server_ready() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::serves(3000).with_output("compiling..."));
        let runtime = runtime_with(backend);
        runtime.boot().await.unwrap();

        let server = runtime.start_dev_server().await.unwrap();
        assert_eq!(server.url, "http://localhost:3000");
        assert_eq!(server.port, 3000);
        assert!(runtime.is_dev_server_running());
        assert_eq!(runtime.dev_server_url().as_deref(), Some("http://localhost:3000"));

        assert!(runtime.stop_dev_server());
        assert!(!runtime.is_dev_server_running());
        assert!(!runtime.stop_dev_server());
    }

    #[tokio::test]
    async fn test_dev_server_single_instance() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::serves(3000));
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();

        let first = runtime.start_dev_server().await.unwrap();
        let second = runtime.start_dev_server().await.unwrap();

        assert_ne!(first.process.id(), second.process.id());
        // The first server had already exited when the second became ready
        assert!(first.process.has_exited());
        assert_eq!(first.process.wait().await, crate::sandbox::memory::KILLED_EXIT_CODE);
        assert!(!second.process.has_exited());
        assert_eq!(backend.live_processes(), 1);
    }

    #[tokio::test]
    async fn test_dev_server_timeout_requires_explicit_stop() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::hangs());
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();

        let err = runtime.start_dev_server().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        // Not cleaned up automatically
        assert!(runtime.is_dev_server_running());
        assert_eq!(backend.live_processes(), 1);

        assert!(runtime.stop_dev_server());
        assert!(!runtime.is_dev_server_running());
    }

    #[tokio::test]
    async fn test_dev_server_timeout_with_auto_stop() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::hangs());
        let config = SandboxConfig {
            dev_ready_timeout: Duration::from_millis(200),
            stop_on_timeout: true,
            ..SandboxConfig::default()
        };
        let runtime = SandboxRuntime::new(backend, config);
        runtime.boot().await.unwrap();

        assert!(matches!(runtime.start_dev_server().await, Err(Error::Timeout(_))));
        assert!(!runtime.is_dev_server_running());
    }

    #[tokio::test]
    async fn test_dev_server_crash_is_distinct_from_timeout() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::exits(1).with_output("Error: port in use"));
        let runtime = runtime_with(backend);
        runtime.boot().await.unwrap();

        let err = runtime.start_dev_server().await.unwrap_err();
        assert!(matches!(err, Error::ProcessExit { code: 1, .. }));
        assert!(!runtime.is_dev_server_running());
    }

    #[tokio::test]
    async fn test_stop_while_waiting_is_not_a_crash() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::hangs());
        let config = SandboxConfig {
            dev_ready_timeout: Duration::from_secs(30),
            ..SandboxConfig::default()
        };
        let runtime = Arc::new(SandboxRuntime::new(backend, config));
        runtime.boot().await.unwrap();

        let starter = {
            let runtime = runtime.clone();
            tokio::spawn(async move { runtime.start_dev_server().await })
        };
        while !runtime.is_dev_server_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        runtime.stop_dev_server();

        let result = tokio::time::timeout(Duration::from_secs(5), starter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_reset_reboots_fresh_sandbox() {
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::serves(3000));
        let runtime = runtime_with(backend.clone());
        runtime.boot().await.unwrap();
        runtime.write_file("a.ts", "1").await.unwrap();
        runtime.start_dev_server().await.unwrap();
        let old = backend.instance().unwrap();

        runtime.reset().await.unwrap();

        assert!(old.is_torn_down());
        assert!(runtime.is_ready());
        assert!(!runtime.is_dev_server_running());
        assert_eq!(backend.boot_count(), 2);
        assert!(runtime.read_file("a.ts").await.unwrap_err().is_not_found());
    }
}
