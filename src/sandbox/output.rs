//! Runtime output stream
//!
//! Everything worth showing in a terminal (boot status, mount summaries,
//! echoed command lines, process output, dev server URLs) is published on a
//! broadcast channel. Any number of subscribers may listen; a slow subscriber
//! only loses its own backlog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of chunks buffered per subscriber
const OUTPUT_BUFFER: usize = 1024;

/// Kind of output line, as rendered by a terminal UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Echoed command line
    Input,
    /// Process stdout/stderr
    Output,
    /// Runtime error notice
    Error,
    /// Runtime status notice
    System,
}

/// One chunk of runtime output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunk {
    /// Line kind
    pub kind: OutputKind,
    /// Text as emitted
    pub text: String,
    /// When the chunk was published
    pub timestamp: DateTime<Utc>,
}

/// Publish side of the runtime output stream
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: broadcast::Sender<OutputChunk>,
}

impl OutputSink {
    /// Create a sink with the default buffer size
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(OUTPUT_BUFFER);
        OutputSink { tx }
    }

    /// Subscribe to every chunk published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<OutputChunk> {
        self.tx.subscribe()
    }

    /// Forward every chunk to `callback` on a background task.
    ///
    /// The task ends when the sink is dropped.
    pub fn on_output<F>(&self, mut callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnMut(OutputChunk) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(chunk) => callback(chunk),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Publish a chunk. Having no subscribers is not an error.
    pub fn emit(&self, kind: OutputKind, text: impl Into<String>) {
        let text = text.into();
        trace!(?kind, "{}", text);
        let _ = self.tx.send(OutputChunk {
            kind,
            text,
            timestamp: Utc::now(),
        });
    }

    /// Publish a status notice
    pub fn system(&self, text: impl Into<String>) {
        self.emit(OutputKind::System, text);
    }

    /// Publish an echoed command line
    pub fn input(&self, text: impl Into<String>) {
        self.emit(OutputKind::Input, text);
    }

    /// Publish process output
    pub fn output(&self, text: impl Into<String>) {
        self.emit(OutputKind::Output, text);
    }

    /// Publish an error notice
    pub fn error(&self, text: impl Into<String>) {
        self.emit(OutputKind::Error, text);
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_multiple_subscribers_see_same_chunks() {
        let sink = OutputSink::new();
        let mut a = sink.subscribe();
        let mut b = sink.subscribe();

        sink.input("$ npm install");
        sink.output("added 3 packages");

        for rx in [&mut a, &mut b] {
            let first = rx.recv().await.unwrap();
            assert_eq!(first.kind, OutputKind::Input);
            assert_eq!(first.text, "$ npm install");
            let second = rx.recv().await.unwrap();
            assert_eq!(second.kind, OutputKind::Output);
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let sink = OutputSink::new();
        sink.system("nobody listening");
    }

    #[tokio::test]
    async fn test_on_output_callback() {
        let sink = OutputSink::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let task = sink.on_output(move |chunk| seen_clone.lock().unwrap().push(chunk.text));

        sink.system("booted");
        drop(sink);
        task.await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["booted".to_string()]);
    }
}
