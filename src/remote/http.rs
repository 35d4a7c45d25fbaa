//! HTTP repository host client

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::{RemoteEntry, RemoteFile, RemoteTree, RepoHost, RepoRef};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};

/// Repository host reached over HTTP
///
/// `GET {base}/tree?repo=owner/name&ref=branch` lists files and
/// `GET {base}/file?repo=owner/name&path=...&ref=branch` fetches one.
#[derive(Clone)]
pub struct HttpRepoHost {
    client: Client,
    base_url: Url,
    default_token: Option<SecretString>,
}

impl HttpRepoHost {
    /// Create a client from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid repository host URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpRepoHost {
            client,
            base_url,
            default_token: config.token.clone(),
        })
    }

    fn endpoint(&self, name: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Repository host URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .push(name);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get(&self, url: Url, token: Option<&SecretString>) -> Result<Response> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = token.or(self.default_token.as_ref()) {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }

        debug!("GET {}", url.path());
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(Error::Unauthorized(format!(
                "repository host rejected credentials ({})",
                status
            ))),
            404 => Err(Error::NotFound(format!("{} ({})", url.path(), body))),
            _ => Err(Error::Remote(format!("{} returned {}: {}", url.path(), status, body))),
        }
    }
}

#[async_trait]
impl RepoHost for HttpRepoHost {
    async fn tree(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        token: Option<&SecretString>,
    ) -> Result<Vec<RemoteEntry>> {
        let repo_name = repo.to_string();
        let url = self.endpoint("tree", &[("repo", &repo_name), ("ref", git_ref)])?;
        let tree: RemoteTree = self.get(url, token).await?.json().await?;
        Ok(tree.files)
    }

    async fn file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
        token: Option<&SecretString>,
    ) -> Result<RemoteFile> {
        let repo_name = repo.to_string();
        let url = self.endpoint(
            "file",
            &[("repo", &repo_name), ("path", path), ("ref", git_ref)],
        )?;
        Ok(self.get(url, token).await?.json().await?)
    }
}
