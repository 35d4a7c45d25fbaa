//! Baseline and working-copy bookkeeping
//!
//! A [`RepoSnapshot`] holds the content each path had when the repository
//! was loaded (or last committed), the current content of every tracked
//! path, and the set of baseline paths deleted since. Dirty state is always
//! derived from those three, never stored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::remote::RepoRef;

/// Repository and branch the workspace was loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub repo: RepoRef,
    pub branch: String,
}

impl RepoInfo {
    pub fn new(repo: RepoRef, branch: impl Into<String>) -> Self {
        RepoInfo {
            repo,
            branch: branch.into(),
        }
    }
}

/// Kind of divergence from the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirtyStatus {
    Modified,
    New,
    Deleted,
}

/// A path whose working content differs from its baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirtyFile {
    pub path: String,
    /// Working content, empty for deleted files
    pub content: String,
    /// Baseline content, `None` for new files
    pub original_content: Option<String>,
    pub is_new: bool,
    pub is_deleted: bool,
    /// Remote blob id of the baseline, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl DirtyFile {
    pub fn status(&self) -> DirtyStatus {
        if self.is_deleted {
            DirtyStatus::Deleted
        } else if self.is_new {
            DirtyStatus::New
        } else {
            DirtyStatus::Modified
        }
    }
}

/// Baseline plus working copy of a loaded repository
#[derive(Debug, Clone, Default)]
pub struct RepoSnapshot {
    original: BTreeMap<String, String>,
    current: BTreeMap<String, String>,
    deleted: BTreeSet<String>,
    shas: BTreeMap<String, String>,
}

impl RepoSnapshot {
    /// Start a snapshot whose baseline and working copy are both `files`
    pub fn new(files: BTreeMap<String, String>, shas: BTreeMap<String, String>) -> Self {
        RepoSnapshot {
            current: files.clone(),
            original: files,
            deleted: BTreeSet::new(),
            shas,
        }
    }

    pub fn original(&self, path: &str) -> Option<&String> {
        self.original.get(path)
    }

    pub fn originals(&self) -> &BTreeMap<String, String> {
        &self.original
    }

    /// Working content of a tracked path
    pub fn current(&self, path: &str) -> Option<&String> {
        self.current.get(path)
    }

    pub fn is_deleted(&self, path: &str) -> bool {
        self.deleted.contains(path)
    }

    /// Every tracked path, sorted
    pub fn paths(&self) -> Vec<String> {
        self.current.keys().cloned().collect()
    }

    /// Tracked paths absent from the baseline
    pub fn local_only_paths(&self) -> Vec<String> {
        self.current
            .keys()
            .filter(|p| !self.original.contains_key(*p))
            .cloned()
            .collect()
    }

    pub fn sha(&self, path: &str) -> Option<&String> {
        self.shas.get(path)
    }

    pub fn set_sha(&mut self, path: impl Into<String>, sha: impl Into<String>) {
        self.shas.insert(path.into(), sha.into());
    }

    /// Record content read through from the sandbox. Does not un-delete.
    pub fn cache(&mut self, path: &str, content: &str) {
        if !self.deleted.contains(path) {
            self.current.insert(path.to_string(), content.to_string());
        }
    }

    /// Record a write. A previously deleted path becomes live again.
    pub fn record_save(&mut self, path: &str, content: &str) {
        self.current.insert(path.to_string(), content.to_string());
        self.deleted.remove(path);
    }

    /// Record a deletion. Only baseline paths are remembered as deleted.
    pub fn record_delete(&mut self, path: &str) {
        self.current.remove(path);
        if self.original.contains_key(path) {
            self.deleted.insert(path.to_string());
        }
    }

    pub fn record_rename(&mut self, from: &str, to: &str, content: &str) {
        self.record_delete(from);
        self.record_save(to, content);
    }

    /// Restore one baseline path. Returns the restored content, or `None`
    /// when the path has no baseline.
    pub fn restore(&mut self, path: &str) -> Option<String> {
        let original = self.original.get(path)?.clone();
        self.current.insert(path.to_string(), original.clone());
        self.deleted.remove(path);
        Some(original)
    }

    /// Discard every working change
    pub fn restore_all(&mut self) {
        self.current = self.original.clone();
        self.deleted.clear();
    }

    /// Make the working copy the new baseline
    pub fn commit(&mut self) {
        self.original = self.current.clone();
        self.deleted.clear();
        let current = &self.current;
        self.shas.retain(|path, _| current.contains_key(path));
    }

    /// Every path whose working state differs from the baseline
    pub fn dirty_files(&self) -> Vec<DirtyFile> {
        let mut dirty = Vec::new();

        for (path, content) in &self.current {
            let original = self.original.get(path);
            if original == Some(content) {
                continue;
            }
            dirty.push(DirtyFile {
                path: path.clone(),
                content: content.clone(),
                original_content: original.cloned(),
                is_new: original.is_none(),
                is_deleted: false,
                sha: self.shas.get(path).cloned(),
            });
        }

        for path in &self.deleted {
            if let Some(original) = self.original.get(path) {
                dirty.push(DirtyFile {
                    path: path.clone(),
                    content: String::new(),
                    original_content: Some(original.clone()),
                    is_new: false,
                    is_deleted: true,
                    sha: self.shas.get(path).cloned(),
                });
            }
        }

        dirty.sort_by(|a, b| a.path.cmp(&b.path));
        dirty
    }

    pub fn has_changes(&self) -> bool {
        !self.deleted.is_empty()
            || self
                .current
                .iter()
                .any(|(path, content)| self.original.get(path) != Some(content))
    }
}
