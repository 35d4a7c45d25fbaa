//! Repository host contract and wire types

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// `owner/name` reference to a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepoRef {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::str::FromStr for RepoRef {
    type Err = Error;

    /// Accepts `owner/name` or a GitHub URL such as `https://github.com/owner/name.git`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches('/');
        let path = match trimmed.find("github.com") {
            Some(idx) => trimmed[idx + "github.com".len()..].trim_start_matches(|c: char| c == ':' || c == '/'),
            None => trimmed,
        };
        let mut parts = path.split('/');
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                let name = name.trim_end_matches(".git");
                if name.is_empty() {
                    return Err(Error::InvalidInput(format!("Invalid repository: {}", s)));
                }
                Ok(RepoRef::new(owner, name))
            }
            _ => Err(Error::InvalidInput(format!(
                "Invalid repository: {} (expected owner/name)",
                s
            ))),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One entry of a remote tree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Remote blob identifier
    pub sha: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Response of the tree endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTree {
    pub files: Vec<RemoteEntry>,
}

/// Response of the file endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub content: String,
    pub sha: String,
}

/// Remote repository host
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// List every file of `repo` at `git_ref`
    async fn tree(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        token: Option<&SecretString>,
    ) -> Result<Vec<RemoteEntry>>;

    /// Fetch one file's content at `git_ref`
    async fn file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
        token: Option<&SecretString>,
    ) -> Result<RemoteFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parsing() {
        let plain: RepoRef = "acme/site".parse().unwrap();
        assert_eq!(plain, RepoRef::new("acme", "site"));

        let url: RepoRef = "https://github.com/acme/site.git".parse().unwrap();
        assert_eq!(url, RepoRef::new("acme", "site"));

        let trailing: RepoRef = "https://github.com/acme/site/".parse().unwrap();
        assert_eq!(trailing.to_string(), "acme/site");

        let ssh: RepoRef = "git@github.com:acme/site.git".parse().unwrap();
        assert_eq!(ssh, RepoRef::new("acme", "site"));

        assert!("acme".parse::<RepoRef>().is_err());
        assert!("/site".parse::<RepoRef>().is_err());
    }

    #[test]
    fn test_tree_entry_size_defaults() {
        let tree: RemoteTree =
            serde_json::from_str(r#"{"files":[{"path":"a.ts","sha":"abc"}]}"#).unwrap();
        assert_eq!(tree.files[0].size, 0);
    }
}
