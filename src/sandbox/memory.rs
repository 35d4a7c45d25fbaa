//! In-memory sandbox backend
//!
//! Keeps the filesystem in memory and runs scripted processes instead of
//! real ones. Like the browser sandboxes it stands in for, writes do not
//! create parent directories and there is no native rename.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use super::backend::{
    DirEntry, SandboxBackend, SandboxInstance, ServerReady, SpawnOptions, SpawnedProcess,
};
use super::tree::{normalize_path, parent_dirs, FileTree};
use crate::error::{Error, Result};

/// Exit code reported by a scripted process that was killed
pub const KILLED_EXIT_CODE: i32 = 143;

/// Behaviour of a scripted process
#[derive(Debug, Clone, Default)]
pub struct ScriptedProcess {
    /// Output chunks emitted right after spawn
    pub output: Vec<String>,
    /// Emit a server-ready event for this port after the output
    pub ready_port: Option<u16>,
    /// Delay before the process exits (or reports ready)
    pub delay: Duration,
    /// Exit code; `None` keeps the process alive until killed
    pub exit_code: Option<i32>,
}

impl ScriptedProcess {
    /// A process that exits immediately with `code`
    pub fn exits(code: i32) -> Self {
        ScriptedProcess {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    /// A process that runs until killed and never reports ready
    pub fn hangs() -> Self {
        ScriptedProcess::default()
    }

    /// A long-running server that reports ready on `port`
    pub fn serves(port: u16) -> Self {
        ScriptedProcess {
            ready_port: Some(port),
            ..Default::default()
        }
    }

    /// Add an output chunk
    pub fn with_output(mut self, chunk: impl Into<String>) -> Self {
        self.output.push(chunk.into());
        self
    }

    /// Delay exit or readiness
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Shared bookkeeping between the backend and its instances
#[derive(Debug, Default)]
struct Shared {
    scripts: Mutex<HashMap<String, ScriptedProcess>>,
    history: Mutex<Vec<String>>,
    live: AtomicUsize,
}

/// In-memory sandbox backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
    boots: AtomicUsize,
    fail_boot: AtomicBool,
    current: Mutex<Option<Arc<MemoryInstance>>>,
}

impl MemoryBackend {
    /// Create a backend where every unscripted command exits with 0
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Script a command. `key` matches the full command line first, then the program name.
    pub fn script(&self, key: impl Into<String>, process: ScriptedProcess) {
        lock(&self.shared.scripts).insert(key.into(), process);
    }

    /// Make subsequent boots fail
    pub fn fail_boot(&self, fail: bool) {
        self.fail_boot.store(fail, Ordering::SeqCst);
    }

    /// Number of successful boots
    pub fn boot_count(&self) -> usize {
        self.boots.load(Ordering::SeqCst)
    }

    /// Every command line spawned so far, in order
    pub fn spawned_commands(&self) -> Vec<String> {
        lock(&self.shared.history).clone()
    }

    /// Processes spawned and not yet exited
    pub fn live_processes(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// The most recently booted instance
    pub fn instance(&self) -> Option<Arc<MemoryInstance>> {
        lock(&self.current).clone()
    }
}

#[async_trait]
impl SandboxBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn boot(&self) -> Result<Arc<dyn SandboxInstance>> {
        if self.fail_boot.load(Ordering::SeqCst) {
            return Err(Error::Sandbox("memory sandbox refused to boot".to_string()));
        }
        let instance = Arc::new(MemoryInstance::new(self.shared.clone()));
        *lock(&self.current) = Some(instance.clone());
        self.boots.fetch_add(1, Ordering::SeqCst);
        Ok(instance)
    }
}

#[derive(Debug, Default)]
struct MemoryFs {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemoryFs {
    fn dir_exists(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn parent_exists(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.dirs.contains(parent),
            None => true,
        }
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir);
        self.files.keys().any(|p| p.starts_with(&prefix))
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
    }
}

/// A booted in-memory sandbox
#[derive(Debug)]
pub struct MemoryInstance {
    fs: Mutex<MemoryFs>,
    ready_tx: broadcast::Sender<ServerReady>,
    torn_down: AtomicBool,
    shared: Arc<Shared>,
}

impl MemoryInstance {
    fn new(shared: Arc<Shared>) -> Self {
        let (ready_tx, _) = broadcast::channel(16);
        MemoryInstance {
            fs: Mutex::new(MemoryFs::default()),
            ready_tx,
            torn_down: AtomicBool::new(false),
            shared,
        }
    }

    /// Every file currently in the sandbox
    pub fn files(&self) -> BTreeMap<String, String> {
        lock(&self.fs).files.clone()
    }

    /// Whether `teardown` has run
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_torn_down() {
            return Err(Error::Sandbox("memory sandbox was torn down".to_string()));
        }
        Ok(())
    }

    fn lookup_script(&self, cmd: &str, command_line: &str) -> ScriptedProcess {
        let scripts = lock(&self.shared.scripts);
        scripts
            .get(command_line)
            .or_else(|| scripts.get(cmd))
            .cloned()
            .unwrap_or_else(|| ScriptedProcess::exits(0))
    }
}

#[async_trait]
impl SandboxInstance for MemoryInstance {
    async fn mount(&self, tree: &FileTree) -> Result<()> {
        self.check_alive()?;
        let mut fs = lock(&self.fs);
        for dir in tree.directories() {
            fs.files.remove(&dir);
            fs.dirs.insert(dir);
        }
        for (path, content) in tree.files() {
            fs.files.insert(path, content);
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.check_alive()?;
        let path = normalize_path(path)?;
        let mut fs = lock(&self.fs);
        if !fs.parent_exists(&path) {
            return Err(Error::NotFound(format!("parent directory of {}", path)));
        }
        if fs.dirs.contains(&path) {
            return Err(Error::Sandbox(format!("{} is a directory", path)));
        }
        fs.files.insert(path, content.to_string());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.check_alive()?;
        let path = normalize_path(path)?;
        lock(&self.fs)
            .files
            .get(&path)
            .cloned()
            .ok_or(Error::NotFound(path))
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        self.check_alive()?;
        let path = normalize_path(path)?;
        let mut fs = lock(&self.fs);
        if fs.files.remove(&path).is_some() {
            return Ok(());
        }
        if !fs.dirs.contains(&path) {
            return Err(Error::NotFound(path));
        }
        if fs.has_children(&path) && !recursive {
            return Err(Error::Sandbox(format!("directory not empty: {}", path)));
        }
        let prefix = format!("{}/", path);
        fs.files.retain(|p, _| !p.starts_with(&prefix));
        fs.dirs.retain(|d| d != &path && !d.starts_with(&prefix));
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.check_alive()?;
        let dir = if path.is_empty() || path == "." || path == "/" {
            String::new()
        } else {
            normalize_path(path)?
        };
        let fs = lock(&self.fs);
        if !fs.dir_exists(&dir) {
            return Err(Error::NotFound(dir));
        }
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        let direct_child = |p: &String| -> Option<String> {
            p.strip_prefix(&prefix)
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(|rest| rest.to_string())
        };
        let mut entries: Vec<DirEntry> = fs
            .dirs
            .iter()
            .filter_map(direct_child)
            .map(DirEntry::directory)
            .collect();
        entries.extend(fs.files.keys().filter_map(direct_child).map(DirEntry::file));
        Ok(entries)
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> Result<()> {
        self.check_alive()?;
        let path = normalize_path(path)?;
        let mut fs = lock(&self.fs);
        if fs.files.contains_key(&path) {
            return Err(Error::Sandbox(format!("{} is a file", path)));
        }
        if recursive {
            for parent in parent_dirs(&path) {
                if fs.files.contains_key(&parent) {
                    return Err(Error::Sandbox(format!("{} is a file", parent)));
                }
                fs.dirs.insert(parent);
            }
        } else if !fs.parent_exists(&path) {
            return Err(Error::NotFound(format!("parent directory of {}", path)));
        }
        fs.dirs.insert(path);
        Ok(())
    }

    async fn spawn(&self, cmd: &str, args: &[String], _opts: SpawnOptions) -> Result<SpawnedProcess> {
        self.check_alive()?;
        let command_line = std::iter::once(cmd.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        let script = self.lookup_script(cmd, &command_line);
        lock(&self.shared.history).push(command_line.clone());
        debug!("Memory sandbox running scripted `{}`", command_line);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel::<String>();
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        let ready_tx = self.ready_tx.clone();
        let shared = self.shared.clone();
        shared.live.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            for chunk in script.output {
                let _ = out_tx.send(chunk);
            }

            let killed = tokio::select! {
                _ = &mut kill_rx => true,
                _ = tokio::time::sleep(script.delay) => false,
            };

            let code = if killed {
                KILLED_EXIT_CODE
            } else {
                if let Some(port) = script.ready_port {
                    let _ = ready_tx.send(ServerReady {
                        port,
                        url: format!("http://localhost:{}", port),
                    });
                }
                match script.exit_code {
                    Some(code) => code,
                    None => {
                        // Echo input back until killed
                        loop {
                            tokio::select! {
                                _ = &mut kill_rx => break KILLED_EXIT_CODE,
                                line = in_rx.recv() => match line {
                                    Some(line) => { let _ = out_tx.send(line); }
                                    None => { let _ = (&mut kill_rx).await; break KILLED_EXIT_CODE; }
                                },
                            }
                        }
                    }
                }
            };

            drop(out_tx);
            shared.live.fetch_sub(1, Ordering::SeqCst);
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
        self.torn_down.store(true, Ordering::SeqCst);
        let mut fs = lock(&self.fs);
        fs.files.clear();
        fs.dirs.clear();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
