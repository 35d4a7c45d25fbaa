//! Process handles for sandboxed subprocesses

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::backend::SpawnedProcess;
use super::output::OutputSink;
use crate::error::{Error, Result};

/// How long an exited process may keep flushing output before its exit is published
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Awaitable exit code of a process. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExitWatcher {
    rx: watch::Receiver<Option<i32>>,
}

impl ExitWatcher {
    /// Exit code if the process has already exited
    pub fn code(&self) -> Option<i32> {
        *self.rx.borrow()
    }

    /// Wait for the process to exit.
    ///
    /// A process whose pump task vanished without reporting counts as `-1`.
    pub async fn wait(&self) -> i32 {
        let mut rx = self.rx.clone();
        loop {
            if let Some(code) = *rx.borrow_and_update() {
                return code;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().unwrap_or(-1);
            }
        }
    }
}

/// Handle to a process spawned inside the sandbox
#[derive(Debug)]
pub struct ProcessHandle {
    id: u64,
    command_line: String,
    input: mpsc::UnboundedSender<String>,
    exit: ExitWatcher,
    kill: Mutex<Option<oneshot::Sender<()>>>,
}

impl ProcessHandle {
    /// Wrap a raw backend process, piping its output into `sink`
    pub(crate) fn start(
        id: u64,
        command_line: String,
        spawned: SpawnedProcess,
        sink: OutputSink,
    ) -> Self {
        let SpawnedProcess {
            mut output,
            input,
            exit,
            kill,
        } = spawned;
        let (exit_tx, exit_rx) = watch::channel(None);

        let pump = tokio::spawn(async move {
            while let Some(chunk) = output.recv().await {
                sink.output(chunk);
            }
        });

        let label = command_line.clone();
        tokio::spawn(async move {
            let code = exit.await.unwrap_or(-1);
            let _ = tokio::time::timeout(OUTPUT_DRAIN_GRACE, pump).await;
            debug!("Process {} (`{}`) exited with code {}", id, label, code);
            let _ = exit_tx.send(Some(code));
        });

        ProcessHandle {
            id,
            command_line,
            input,
            exit: ExitWatcher { rx: exit_rx },
            kill: Mutex::new(Some(kill)),
        }
    }

    /// Runtime-assigned process id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Command line as echoed to the output stream
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Exit code watcher
    pub fn exit(&self) -> ExitWatcher {
        self.exit.clone()
    }

    /// Wait for the process to exit
    pub async fn wait(&self) -> i32 {
        self.exit.wait().await
    }

    /// Whether the process has exited
    pub fn has_exited(&self) -> bool {
        self.exit.code().is_some()
    }

    /// Write to the process input
    pub fn write_input(&self, data: impl Into<String>) -> Result<()> {
        self.input
            .send(data.into())
            .map_err(|_| Error::Sandbox(format!("input of `{}` is closed", self.command_line)))
    }

    /// Ask the backend to terminate the process.
    ///
    /// Returns false if the process was already killed through this handle.
    pub fn kill(&self) -> bool {
        let sender = self
            .kill
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match sender {
            Some(tx) => {
                debug!("Killing process {} (`{}`)", self.id, self.command_line);
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }
}

/// The runtime's single dev server slot
#[derive(Debug)]
pub struct DevServerHandle {
    /// Underlying process
    pub process: Arc<ProcessHandle>,
    /// URL once the server reported ready
    pub url: Option<String>,
}

/// A dev server that reported ready
#[derive(Debug, Clone)]
pub struct DevServer {
    /// Externally reachable URL
    pub url: String,
    /// Port the server listens on
    pub port: u16,
    /// Underlying process
    pub process: Arc<ProcessHandle>,
}
