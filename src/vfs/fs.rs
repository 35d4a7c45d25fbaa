//! Workspace filesystem
//!
//! Mirrors a remote repository into a [`SandboxRuntime`] and tracks every
//! local mutation against the last loaded or committed baseline. The
//! sandbox holds the bytes; this layer holds what is needed to diff them.
//!
//! Calls are expected to come from one coordinating task. Overlapping a
//! load with edits leaves the bookkeeping in an unspecified state.

use futures::future::join_all;
use secrecy::SecretString;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::skip::should_skip;
use super::snapshot::{DirtyFile, RepoInfo, RepoSnapshot};
use crate::config::VfsConfig;
use crate::error::Result;
use crate::remote::{RemoteEntry, RepoHost, RepoRef};
use crate::sandbox::{normalize_path, SandboxRuntime};

/// Counts reported by [`WorkspaceFs::load_repo_to_runtime`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Files fetched and mounted with their real content
    pub loaded: usize,
    /// Tree entries left out by the skip rules
    pub skipped: usize,
    /// Files above the size ceiling, mounted as a placeholder
    pub oversized: usize,
    /// Files whose fetch failed, mounted as a placeholder
    pub failed: usize,
}

impl LoadSummary {
    /// Number of files mounted into the sandbox
    pub fn mounted(&self) -> usize {
        self.loaded + self.oversized + self.failed
    }
}

enum Fetched {
    Loaded { content: String, sha: String },
    Oversized { content: String },
    Failed { content: String },
}

#[derive(Default)]
struct State {
    info: Option<RepoInfo>,
    snapshot: RepoSnapshot,
}

/// Dirty-tracking filesystem over a sandbox runtime
pub struct WorkspaceFs {
    runtime: Arc<SandboxRuntime>,
    host: Arc<dyn RepoHost>,
    config: VfsConfig,
    state: Mutex<State>,
}

impl WorkspaceFs {
    pub fn new(runtime: Arc<SandboxRuntime>, host: Arc<dyn RepoHost>, config: VfsConfig) -> Self {
        WorkspaceFs {
            runtime,
            host,
            config,
            state: Mutex::new(State::default()),
        }
    }

    /// The runtime files are written through to
    pub fn runtime(&self) -> &Arc<SandboxRuntime> {
        &self.runtime
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load `repo` at `branch` into the sandbox, replacing all bookkeeping.
    ///
    /// The tree listing must succeed. Individual file fetches that fail, and
    /// files above `max_file_size`, are mounted as placeholder comments.
    pub async fn load_repo_to_runtime(
        &self,
        repo: &RepoRef,
        branch: &str,
        token: Option<&SecretString>,
    ) -> Result<LoadSummary> {
        if !self.runtime.is_ready() {
            self.runtime.boot().await?;
        }
        *self.state() = State::default();

        let output = self.runtime.output();
        output.system(format!("Fetching {}@{}...", repo, branch));
        let entries = self.host.tree(repo, branch, token).await.map_err(|e| {
            output.error(format!("Failed to list {}@{}: {}", repo, branch, e));
            e
        })?;

        let mut summary = LoadSummary::default();
        let mut wanted = Vec::with_capacity(entries.len());
        for mut entry in entries {
            match normalize_path(&entry.path) {
                Ok(path) if !should_skip(&path, &self.config.extra_skip_patterns) => {
                    entry.path = path;
                    wanted.push(entry);
                }
                Ok(_) => summary.skipped += 1,
                Err(e) => {
                    warn!("Skipping tree entry {}: {}", entry.path, e);
                    summary.skipped += 1;
                }
            }
        }

        let total = wanted.len();
        output.system(format!(
            "Loading {} files ({} skipped)...",
            total, summary.skipped
        ));

        let mut files = BTreeMap::new();
        let mut shas = BTreeMap::new();
        let batch_size = self.config.fetch_batch_size.max(1);
        for (index, batch) in wanted.chunks(batch_size).enumerate() {
            let fetches = batch
                .iter()
                .map(|entry| self.fetch_entry(repo, branch, token, entry));
            let results = join_all(fetches).await;

            for (entry, fetched) in batch.iter().zip(results) {
                let (content, sha) = match fetched {
                    Fetched::Loaded { content, sha } => {
                        summary.loaded += 1;
                        (content, sha)
                    }
                    Fetched::Oversized { content } => {
                        summary.oversized += 1;
                        (content, entry.sha.clone())
                    }
                    Fetched::Failed { content } => {
                        summary.failed += 1;
                        (content, entry.sha.clone())
                    }
                };
                files.insert(entry.path.clone(), content);
                shas.insert(entry.path.clone(), sha);
            }
            debug!(
                "Fetched batch {} ({}/{} files)",
                index + 1,
                files.len(),
                total
            );
        }

        self.runtime.mount(&files).await?;

        let mut state = self.state();
        state.info = Some(RepoInfo::new(repo.clone(), branch));
        state.snapshot = RepoSnapshot::new(files, shas);
        drop(state);

        info!(
            "Loaded {}@{}: {} files, {} skipped, {} oversized, {} failed",
            repo, branch, summary.loaded, summary.skipped, summary.oversized, summary.failed
        );
        output.system(format!("Loaded {} files from {}", summary.mounted(), repo));
        Ok(summary)
    }

    async fn fetch_entry(
        &self,
        repo: &RepoRef,
        branch: &str,
        token: Option<&SecretString>,
        entry: &RemoteEntry,
    ) -> Fetched {
        if entry.size > self.config.max_file_size {
            debug!("{} is {} bytes, not fetching", entry.path, entry.size);
            return Fetched::Oversized {
                content: format!("// File too large to load ({} bytes)\n", entry.size),
            };
        }

        match self.host.file(repo, &entry.path, branch, token).await {
            Ok(file) => Fetched::Loaded {
                content: file.content,
                sha: file.sha,
            },
            Err(e) => {
                warn!("Failed to fetch {}: {}", entry.path, e);
                Fetched::Failed {
                    content: format!("// Failed to load {}: {}\n", entry.path, e),
                }
            }
        }
    }

    /// Write a file through to the sandbox. Saving a deleted path restores it.
    pub async fn save_file(&self, path: &str, content: &str) -> Result<()> {
        let path = normalize_path(path)?;
        self.runtime.write_file(&path, content).await?;
        self.state().snapshot.record_save(&path, content);
        Ok(())
    }

    /// Create a file. Same as [`save_file`](Self::save_file); whether the
    /// path counts as new is decided by the baseline.
    pub async fn create_file(&self, path: &str, content: &str) -> Result<()> {
        self.save_file(path, content).await
    }

    /// Delete a file. A path already absent from the sandbox is not an error.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let path = normalize_path(path)?;
        match self.runtime.delete_file(&path).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("{} already absent from sandbox", path),
            Err(e) => return Err(e),
        }
        self.state().snapshot.record_delete(&path);
        Ok(())
    }

    /// Rename a file, tracked as a delete of `from` plus a new `to`
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = normalize_path(from)?;
        let to = normalize_path(to)?;
        if from == to {
            return Ok(());
        }
        let content = match self.read_file(&from).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };
        self.runtime.rename(&from, &to).await?;
        self.state().snapshot.record_rename(&from, &to, &content);
        Ok(())
    }

    /// Read a file, from the tracked copy when present, else from the sandbox
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let path = normalize_path(path)?;
        if let Some(content) = self.state().snapshot.current(&path) {
            return Ok(content.clone());
        }
        let content = self.runtime.read_file(&path).await?;
        self.state().snapshot.cache(&path, &content);
        Ok(content)
    }

    /// Every path that differs from the baseline, sorted by path
    pub fn get_dirty_files(&self) -> Vec<DirtyFile> {
        self.state().snapshot.dirty_files()
    }

    pub fn has_changes(&self) -> bool {
        self.state().snapshot.has_changes()
    }

    /// Remote blob id recorded for `path`
    pub fn get_file_sha(&self, path: &str) -> Option<String> {
        let path = normalize_path(path).ok()?;
        self.state().snapshot.sha(&path).cloned()
    }

    /// Record the blob id a commit produced for `path`
    pub fn set_file_sha(&self, path: &str, sha: impl Into<String>) -> Result<()> {
        let path = normalize_path(path)?;
        self.state().snapshot.set_sha(path, sha);
        Ok(())
    }

    pub fn get_repo_info(&self) -> Option<RepoInfo> {
        self.state().info.clone()
    }

    /// Every tracked path, sorted
    pub fn get_all_paths(&self) -> Vec<String> {
        self.state().snapshot.paths()
    }

    /// Restore one file to its baseline content. Returns `false` when the
    /// path has no baseline.
    pub async fn reset_file(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        let Some(original) = self.state().snapshot.original(&path).cloned() else {
            return Ok(false);
        };
        self.runtime.write_file(&path, &original).await?;
        self.state().snapshot.restore(&path);
        Ok(true)
    }

    /// Roll the sandbox and bookkeeping back to the baseline
    pub async fn reset_all(&self) -> Result<()> {
        let (local_only, originals) = {
            let state = self.state();
            (
                state.snapshot.local_only_paths(),
                state.snapshot.originals().clone(),
            )
        };

        for path in &local_only {
            match self.runtime.delete_file(path).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        self.runtime.mount(&originals).await?;

        self.state().snapshot.restore_all();
        self.runtime
            .output()
            .system(format!("Reset {} files to last commit", originals.len()));
        Ok(())
    }

    /// Make the working copy the new baseline.
    ///
    /// Only call after the changes were pushed upstream; nothing is sent here.
    pub fn mark_as_committed(&self) {
        self.state().snapshot.commit();
    }

    /// Forget the loaded repository and all bookkeeping
    pub fn clear(&self) {
        *self.state() = State::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use crate::error::Error;
    use crate::remote::RemoteFile;
    use crate::sandbox::MemoryBackend;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeHost {
        files: BTreeMap<String, (String, u64)>,
        failing: BTreeSet<String>,
        fail_tree: bool,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn with_files(files: &[(&str, &str)]) -> Self {
            FakeHost {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), (c.to_string(), c.len() as u64)))
                    .collect(),
                ..FakeHost::default()
            }
        }
    }

    #[async_trait]
    impl RepoHost for FakeHost {
        async fn tree(
            &self,
            _repo: &RepoRef,
            _git_ref: &str,
            _token: Option<&SecretString>,
        ) -> Result<Vec<RemoteEntry>> {
            if self.fail_tree {
                return Err(Error::Remote("tree unavailable".to_string()));
            }
            Ok(self
                .files
                .iter()
                .map(|(path, (_, size))| RemoteEntry {
                    path: path.clone(),
                    sha: format!("sha-{}", path),
                    size: *size,
                })
                .collect())
        }

        async fn file(
            &self,
            _repo: &RepoRef,
            path: &str,
            _git_ref: &str,
            _token: Option<&SecretString>,
        ) -> Result<RemoteFile> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(path.to_string());

            if self.failing.contains(path) {
                return Err(Error::Remote(format!("{} unavailable", path)));
            }
            let (content, _) = self
                .files
                .get(path)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
            Ok(RemoteFile {
                content: content.clone(),
                sha: format!("blob-{}", path),
            })
        }
    }

    fn workspace(host: FakeHost, config: VfsConfig) -> (WorkspaceFs, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let runtime = Arc::new(SandboxRuntime::new(backend.clone(), SandboxConfig::default()));
        (WorkspaceFs::new(runtime, Arc::new(host), config), backend)
    }

    fn repo() -> RepoRef {
        RepoRef::new("acme", "site")
    }

    async fn loaded(files: &[(&str, &str)]) -> (WorkspaceFs, Arc<MemoryBackend>) {
        let (fs, backend) = workspace(FakeHost::with_files(files), VfsConfig::default());
        fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();
        (fs, backend)
    }

    fn sandbox_files(backend: &MemoryBackend) -> BTreeMap<String, String> {
        backend.instance().unwrap().files()
    }

    #[tokio::test]
    async fn test_load_boots_and_mounts() {
        let (fs, backend) = loaded(&[("src/a.ts", "1"), ("package.json", "{}")]).await;

        assert_eq!(backend.boot_count(), 1);
        assert_eq!(sandbox_files(&backend).get("src/a.ts").map(String::as_str), Some("1"));
        assert_eq!(fs.get_all_paths(), vec!["package.json", "src/a.ts"]);
        assert_eq!(fs.get_file_sha("src/a.ts").as_deref(), Some("blob-src/a.ts"));
        assert_eq!(fs.get_repo_info(), Some(RepoInfo::new(repo(), "main")));
        assert!(!fs.has_changes());
    }

    #[tokio::test]
    async fn test_load_skips_artifacts() {
        let host = FakeHost::with_files(&[
            ("src/a.ts", "1"),
            ("node_modules/react/index.js", "x"),
            ("package-lock.json", "{}"),
            ("dist/out.js", "y"),
        ]);
        let (fs, _) = workspace(host, VfsConfig::default());
        let summary = fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();

        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(fs.get_all_paths(), vec!["src/a.ts"]);
    }

    #[tokio::test]
    async fn test_load_fetches_in_bounded_batches() {
        let files: Vec<(String, String)> = (0..12)
            .map(|i| (format!("src/f{:02}.ts", i), i.to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
        let host = Arc::new(FakeHost::with_files(&refs));
        let backend = Arc::new(MemoryBackend::new());
        let runtime = Arc::new(SandboxRuntime::new(backend, SandboxConfig::default()));
        let config = VfsConfig {
            fetch_batch_size: 5,
            ..VfsConfig::default()
        };
        let fs = WorkspaceFs::new(runtime, host.clone(), config);

        let summary = fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();
        assert_eq!(summary.loaded, 12);
        let max = host.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 5, "max in flight was {}", max);
        assert!(max > 1, "fetches were not concurrent");
    }

    #[tokio::test]
    async fn test_load_degrades_per_file() {
        let mut host = FakeHost::with_files(&[("a.ts", "1"), ("big.json", "x"), ("bad.ts", "2")]);
        host.files.insert("big.json".to_string(), ("x".to_string(), 10_000_000));
        host.failing.insert("bad.ts".to_string());
        let (fs, backend) = workspace(host, VfsConfig::default());

        let summary = fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                loaded: 1,
                skipped: 0,
                oversized: 1,
                failed: 1
            }
        );

        let files = sandbox_files(&backend);
        assert!(files["big.json"].starts_with("// File too large"));
        assert!(files["bad.ts"].starts_with("// Failed to load bad.ts"));
        // Placeholders keep the listed blob id
        assert_eq!(fs.get_file_sha("big.json").as_deref(), Some("sha-big.json"));
    }

    #[tokio::test]
    async fn test_oversized_files_are_not_fetched() {
        let mut host = FakeHost::with_files(&[("big.json", "x")]);
        host.files.insert("big.json".to_string(), ("x".to_string(), 600_000));
        let host = Arc::new(host);
        let runtime = Arc::new(SandboxRuntime::new(
            Arc::new(MemoryBackend::new()),
            SandboxConfig::default(),
        ));
        let fs = WorkspaceFs::new(runtime, host.clone(), VfsConfig::default());
        fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();
        assert!(host.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tree_failure_aborts_load() {
        let host = FakeHost {
            fail_tree: true,
            ..FakeHost::default()
        };
        let (fs, _) = workspace(host, VfsConfig::default());
        let err = fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
        assert!(fs.get_repo_info().is_none());
    }

    #[tokio::test]
    async fn test_fresh_load_replaces_previous_state() {
        let (fs, _) = loaded(&[("a.ts", "1")]).await;
        fs.save_file("a.ts", "changed").await.unwrap();
        fs.create_file("extra.ts", "").await.unwrap();
        assert!(fs.has_changes());

        fs.load_repo_to_runtime(&repo(), "main", None).await.unwrap();
        assert!(!fs.has_changes());
        assert_eq!(fs.get_all_paths(), vec!["a.ts"]);
    }

    #[tokio::test]
    async fn test_load_edit_diff_scenario() {
        let (fs, _) = loaded(&[("a.ts", "1"), ("b.ts", "2"), ("c.ts", "3")]).await;

        fs.save_file("a.ts", "1x").await.unwrap();
        fs.create_file("d.ts", "4").await.unwrap();
        fs.delete_file("b.ts").await.unwrap();

        let dirty = fs.get_dirty_files();
        assert_eq!(dirty.len(), 3);

        let a = dirty.iter().find(|d| d.path == "a.ts").unwrap();
        assert!(!a.is_new && !a.is_deleted);
        assert_eq!(a.content, "1x");
        assert_eq!(a.original_content.as_deref(), Some("1"));

        let d = dirty.iter().find(|d| d.path == "d.ts").unwrap();
        assert!(d.is_new);
        assert_eq!(d.content, "4");

        let b = dirty.iter().find(|d| d.path == "b.ts").unwrap();
        assert!(b.is_deleted);

        assert!(dirty.iter().all(|d| d.path != "c.ts"));
    }

    #[tokio::test]
    async fn test_delete_then_recreate_local_file() {
        let (fs, _) = loaded(&[("a.ts", "1")]).await;
        fs.create_file("tmp.ts", "x").await.unwrap();
        fs.delete_file("tmp.ts").await.unwrap();

        assert!(!fs.has_changes());
        assert!(!fs.get_all_paths().contains(&"tmp.ts".to_string()));
    }

    #[tokio::test]
    async fn test_save_undoes_delete() {
        let (fs, backend) = loaded(&[("a.ts", "1")]).await;
        fs.delete_file("a.ts").await.unwrap();
        assert!(fs.get_dirty_files()[0].is_deleted);

        fs.save_file("a.ts", "2").await.unwrap();
        let dirty = fs.get_dirty_files();
        assert_eq!(dirty.len(), 1);
        assert!(!dirty[0].is_deleted && !dirty[0].is_new);
        assert_eq!(sandbox_files(&backend)["a.ts"], "2");

        fs.save_file("a.ts", "1").await.unwrap();
        assert!(!fs.has_changes());
    }

    #[tokio::test]
    async fn test_delete_tolerates_absent_path() {
        let (fs, _) = loaded(&[("a.ts", "1")]).await;
        fs.delete_file("a.ts").await.unwrap();
        fs.delete_file("a.ts").await.unwrap();
        fs.delete_file("never-existed.ts").await.unwrap();

        let dirty = fs.get_dirty_files();
        assert_eq!(dirty.len(), 1);
        assert!(dirty[0].is_deleted);
    }

    #[tokio::test]
    async fn test_rename_tracks_delete_and_new() {
        let (fs, backend) = loaded(&[("src/a.ts", "1")]).await;
        fs.rename("src/a.ts", "lib/b.ts").await.unwrap();

        let files = sandbox_files(&backend);
        assert!(!files.contains_key("src/a.ts"));
        assert_eq!(files["lib/b.ts"], "1");

        let dirty = fs.get_dirty_files();
        assert_eq!(dirty.len(), 2);
        assert!(dirty.iter().any(|d| d.path == "lib/b.ts" && d.is_new && d.content == "1"));
        assert!(dirty.iter().any(|d| d.path == "src/a.ts" && d.is_deleted));
    }

    #[tokio::test]
    async fn test_rename_onto_same_path_keeps_file() {
        let (fs, backend) = loaded(&[("a.ts", "1")]).await;
        fs.rename("a.ts", "./a.ts").await.unwrap();

        assert_eq!(sandbox_files(&backend).get("a.ts").map(String::as_str), Some("1"));
        assert_eq!(fs.get_all_paths(), vec!["a.ts"]);
        assert!(!fs.has_changes());
    }

    #[tokio::test]
    async fn test_read_falls_back_to_sandbox_and_caches() {
        let (fs, _) = loaded(&[("a.ts", "1")]).await;
        assert_eq!(fs.read_file("a.ts").await.unwrap(), "1");

        // Written behind the VFS's back, e.g. by a build step
        fs.runtime().write_file("gen/out.ts", "generated").await.unwrap();
        assert_eq!(fs.read_file("gen/out.ts").await.unwrap(), "generated");
        assert!(fs.get_all_paths().contains(&"gen/out.ts".to_string()));

        fs.runtime().write_file("gen/out.ts", "regenerated").await.unwrap();
        assert_eq!(fs.read_file("gen/out.ts").await.unwrap(), "generated");

        assert!(fs.read_file("missing.ts").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reset_file() {
        let (fs, backend) = loaded(&[("a.ts", "1")]).await;
        fs.save_file("a.ts", "2").await.unwrap();
        assert!(fs.reset_file("a.ts").await.unwrap());
        assert_eq!(sandbox_files(&backend)["a.ts"], "1");
        assert!(!fs.has_changes());

        fs.create_file("new.ts", "n").await.unwrap();
        assert!(!fs.reset_file("new.ts").await.unwrap());
        assert!(fs.has_changes());
    }

    #[tokio::test]
    async fn test_reset_all_restores_baseline() {
        let (fs, backend) = loaded(&[("a.ts", "1"), ("b.ts", "2"), ("c.ts", "3")]).await;
        fs.save_file("a.ts", "1x").await.unwrap();
        fs.create_file("d.ts", "4").await.unwrap();
        fs.delete_file("b.ts").await.unwrap();
        fs.rename("c.ts", "e.ts").await.unwrap();

        fs.reset_all().await.unwrap();

        assert!(fs.get_dirty_files().is_empty());
        assert_eq!(fs.get_all_paths(), vec!["a.ts", "b.ts", "c.ts"]);
        let files = sandbox_files(&backend);
        assert_eq!(files.len(), 3);
        assert_eq!(files["a.ts"], "1");
        assert_eq!(files["b.ts"], "2");
        assert!(!files.contains_key("d.ts"));
        assert!(!files.contains_key("e.ts"));
    }

    #[tokio::test]
    async fn test_mark_as_committed_sets_new_baseline() {
        let (fs, _) = loaded(&[("a.ts", "1"), ("b.ts", "2")]).await;
        fs.save_file("a.ts", "1x").await.unwrap();
        fs.create_file("d.ts", "4").await.unwrap();
        fs.delete_file("b.ts").await.unwrap();

        fs.mark_as_committed();
        assert!(fs.get_dirty_files().is_empty());
        assert!(fs.get_file_sha("b.ts").is_none());

        fs.set_file_sha("d.ts", "new-blob").unwrap();
        assert_eq!(fs.get_file_sha("d.ts").as_deref(), Some("new-blob"));

        // The committed state is what reset rolls back to
        fs.save_file("a.ts", "again").await.unwrap();
        fs.reset_all().await.unwrap();
        assert_eq!(fs.read_file("a.ts").await.unwrap(), "1x");
    }

    #[tokio::test]
    async fn test_paths_are_normalized() {
        let (fs, _) = loaded(&[("src/a.ts", "1")]).await;
        fs.save_file("./src/a.ts", "2").await.unwrap();
        assert_eq!(fs.get_all_paths(), vec!["src/a.ts"]);
        assert!(fs.save_file("../etc/passwd", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_clear_wipes_state() {
        let (fs, _) = loaded(&[("a.ts", "1")]).await;
        fs.save_file("a.ts", "2").await.unwrap();
        fs.clear();
        assert!(fs.get_repo_info().is_none());
        assert!(fs.get_all_paths().is_empty());
        assert!(!fs.has_changes());
    }

    #[tokio::test]
    async fn test_writes_require_booted_sandbox() {
        let (fs, _) = workspace(FakeHost::default(), VfsConfig::default());
        let err = fs.save_file("a.ts", "1").await.unwrap_err();
        assert!(matches!(err, Error::NotReady(_)));
        assert!(fs.get_all_paths().is_empty());
    }
}
