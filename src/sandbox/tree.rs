//! Mountable file tree
//!
//! A `FileTree` is the nested form of a flat `path -> content` map. Every
//! path is relative and slash-separated; intermediate directories exist
//! implicitly once any file beneath them is inserted.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A node in a [`FileTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Subdirectory with its own children
    Directory(FileTree),
    /// Regular file with textual contents
    File { contents: String },
}

/// Directory-keyed tree of files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    entries: BTreeMap<String, Node>,
}

impl FileTree {
    /// Create an empty tree
    pub fn new() -> Self {
        FileTree::default()
    }

    /// Build a tree from a flat `path -> content` map
    pub fn from_files<'a, I>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut tree = FileTree::new();
        for (path, content) in files {
            tree.insert(path, content.clone())?;
        }
        Ok(tree)
    }

    /// Insert a file, creating intermediate directories
    pub fn insert(&mut self, path: &str, contents: String) -> Result<()> {
        let normalized = normalize_path(path)?;
        let segments: Vec<&str> = normalized.split('/').collect();
        let (file_name, dirs) = segments
            .split_last()
            .ok_or_else(|| Error::InvalidInput("empty path".to_string()))?;

        let mut current = self;
        for dir in dirs {
            let node = current
                .entries
                .entry((*dir).to_string())
                .or_insert_with(|| Node::Directory(FileTree::new()));
            current = match node {
                Node::Directory(children) => children,
                Node::File { .. } => {
                    return Err(Error::InvalidInput(format!(
                        "{} conflicts with existing file {}",
                        normalized, dir
                    )))
                }
            };
        }

        if let Some(Node::Directory(_)) = current.entries.get(*file_name) {
            return Err(Error::InvalidInput(format!(
                "{} conflicts with existing directory",
                normalized
            )));
        }
        current
            .entries
            .insert((*file_name).to_string(), Node::File { contents });
        Ok(())
    }

    /// Direct children of this directory
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Whether the tree has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files anywhere in the tree
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .map(|node| match node {
                Node::Directory(children) => children.file_count(),
                Node::File { .. } => 1,
            })
            .sum()
    }

    /// Flatten back into a `path -> content` map
    pub fn files(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.collect_files("", &mut out);
        out
    }

    /// Every directory path in the tree, parents before children
    pub fn directories(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_dirs("", &mut out);
        out
    }

    fn collect_files(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        for (name, node) in &self.entries {
            let path = join(prefix, name);
            match node {
                Node::Directory(children) => children.collect_files(&path, out),
                Node::File { contents } => {
                    out.insert(path, contents.clone());
                }
            }
        }
    }

    fn collect_dirs(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, node) in &self.entries {
            if let Node::Directory(children) = node {
                let path = join(prefix, name);
                out.push(path.clone());
                children.collect_dirs(&path, out);
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Normalize a sandbox path to relative, slash-separated form.
///
/// Leading `/` and `./` are stripped, backslashes become slashes and empty or
/// `.` segments are dropped. `..` segments are rejected.
pub fn normalize_path(path: &str) -> Result<String> {
    let replaced = path.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::InvalidInput(format!(
                    "path escapes the sandbox: {}",
                    path
                )))
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(Error::InvalidInput(format!("empty path: {:?}", path)));
    }
    Ok(segments.join("/"))
}

/// Ancestor directories of a normalized path, outermost first.
///
/// `src/lib/a.ts` yields `["src", "src/lib"]`.
pub fn parent_dirs(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    (1..segments.len())
        .map(|n| segments[..n].join("/"))
        .collect()
}
