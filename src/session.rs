//! Workspace session
//!
//! One `Workspace` owns a sandbox runtime, the dirty-tracking filesystem
//! over it and the env injector bound to it. Callers construct and pass the
//! handle; nothing here is global.

use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::env::EnvInjector;
use crate::error::Result;
use crate::remote::{HttpRepoHost, RepoHost, RepoRef};
use crate::sandbox::{DevServer, LocalBackend, SandboxBackend, SandboxRuntime};
use crate::vfs::{LoadSummary, WorkspaceFs};

/// What [`Workspace::open`] does after loading
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub inject_env: bool,
    pub install: bool,
    pub start_dev_server: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            inject_env: true,
            install: true,
            start_dev_server: true,
        }
    }
}

/// Result of [`Workspace::open`]
#[derive(Debug)]
pub struct Opened {
    pub summary: LoadSummary,
    pub env_vars: usize,
    pub dev_server: Option<DevServer>,
}

/// A single workspace session
pub struct Workspace {
    config: Config,
    runtime: Arc<SandboxRuntime>,
    fs: WorkspaceFs,
    env: EnvInjector,
}

impl Workspace {
    /// Local host-directory sandbox plus the configured HTTP repository host
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Arc::new(LocalBackend::new(config.sandbox.root.clone()));
        let host = Arc::new(HttpRepoHost::new(&config.remote)?);
        Ok(Workspace::new(backend, host, config.clone()))
    }

    pub fn new(backend: Arc<dyn SandboxBackend>, host: Arc<dyn RepoHost>, config: Config) -> Self {
        let runtime = Arc::new(SandboxRuntime::new(backend, config.sandbox.clone()));
        let fs = WorkspaceFs::new(runtime.clone(), host, config.vfs.clone());
        let env = EnvInjector::new(runtime.clone(), config.env.clone());
        Workspace {
            config,
            runtime,
            fs,
            env,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<SandboxRuntime> {
        &self.runtime
    }

    pub fn fs(&self) -> &WorkspaceFs {
        &self.fs
    }

    pub fn env(&self) -> &EnvInjector {
        &self.env
    }

    /// Load `repo`, then inject env vars, install and start the dev server
    /// as `options` asks
    pub async fn open(
        &self,
        repo: &RepoRef,
        branch: &str,
        token: Option<&SecretString>,
        options: OpenOptions,
    ) -> Result<Opened> {
        let summary = self.fs.load_repo_to_runtime(repo, branch, token).await?;

        let env_vars = if options.inject_env {
            let config = self.env.resolve_env_config().await;
            self.env.inject_env_vars(&config).await?
        } else {
            0
        };

        if options.install {
            self.runtime.install_deps().await?;
        }

        let dev_server = if options.start_dev_server {
            Some(self.runtime.start_dev_server().await?)
        } else {
            None
        };

        Ok(Opened {
            summary,
            env_vars,
            dev_server,
        })
    }

    /// Stop the dev server, tear the sandbox down and drop all bookkeeping
    pub async fn shutdown(&self) -> Result<()> {
        self.fs.clear();
        self.runtime.shutdown().await?;
        info!("Workspace shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::{RemoteEntry, RemoteFile};
    use crate::sandbox::{MemoryBackend, ScriptedProcess};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;

    struct OneFileHost;

    #[async_trait]
    impl RepoHost for OneFileHost {
        async fn tree(
            &self,
            _repo: &RepoRef,
            _git_ref: &str,
            _token: Option<&SecretString>,
        ) -> Result<Vec<RemoteEntry>> {
            Ok(vec![RemoteEntry {
                path: "package.json".to_string(),
                sha: "p1".to_string(),
                size: 2,
            }])
        }

        async fn file(
            &self,
            _repo: &RepoRef,
            _path: &str,
            _git_ref: &str,
            _token: Option<&SecretString>,
        ) -> Result<RemoteFile> {
            Ok(RemoteFile {
                content: "{}".to_string(),
                sha: "p1".to_string(),
            })
        }
    }

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.sandbox.dev_ready_timeout = Duration::from_millis(300);
        config.env.store_path = dir.join("devstudio_env.json");
        config
            .env
            .defaults
            .insert("NEXT_PUBLIC_SITE".to_string(), "acme".to_string());
        config
    }

    #[tokio::test]
    async fn test_open_runs_full_pipeline() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npx", ScriptedProcess::serves(3000));
        let workspace = Workspace::new(backend.clone(), Arc::new(OneFileHost), config(dir.path()));

        let opened = workspace
            .open(&RepoRef::new("acme", "site"), "main", None, OpenOptions::default())
            .await
            .unwrap();

        assert_eq!(opened.summary.loaded, 1);
        assert_eq!(opened.env_vars, 1);
        assert!(opened.dev_server.is_some());
        assert!(backend
            .spawned_commands()
            .iter()
            .any(|c| c == "npm install"));

        let files = backend.instance().unwrap().files();
        assert_eq!(files[".env.local"], "NEXT_PUBLIC_SITE=acme\n");
        // The injected env file is not part of the repository diff
        assert!(!workspace.fs().has_changes());

        workspace.shutdown().await.unwrap();
        assert!(!workspace.runtime().is_ready());
        assert!(backend.instance().unwrap().is_torn_down());
        assert!(workspace.fs().get_repo_info().is_none());
    }

    #[tokio::test]
    async fn test_open_surfaces_install_failure() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.script("npm install", ScriptedProcess::exits(1));
        let workspace = Workspace::new(backend, Arc::new(OneFileHost), config(dir.path()));

        let err = workspace
            .open(&RepoRef::new("acme", "site"), "main", None, OpenOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProcessExit { code: 1, .. }));
    }
}
