//! Read-only relay of a user's public repositories from the GitHub REST API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::GithubConfig, error::AppError};

/// Upstream JSON, relayed without reshaping.
pub type RepoSummary = Value;

const REPO_LIMIT: &str = "5";

#[async_trait]
pub trait RepoLookup: Send + Sync {
    /// Up to five repositories of `username`, oldest first.
    async fn recent_repos(&self, username: &str) -> Result<Vec<RepoSummary>, AppError>;
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex =
            Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9]){0,38}$").expect("static regex");
    }
    USERNAME_RE.is_match(username)
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    credentials: Option<(String, String)>,
}

impl GithubClient {
    pub fn new(cfg: &GithubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build github http client")?;
        let credentials = match (&cfg.client_id, &cfg.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        };
        Ok(Self {
            http,
            api_url: cfg.api_url.clone(),
            credentials,
        })
    }
}

#[async_trait]
impl RepoLookup for GithubClient {
    async fn recent_repos(&self, username: &str) -> Result<Vec<RepoSummary>, AppError> {
        if !is_valid_username(username) {
            warn!(username, "not a github username");
            return Err(AppError::GithubNotFound);
        }

        let mut req = self
            .http
            .get(format!("{}/users/{}/repos", self.api_url, username))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("per_page", REPO_LIMIT),
                ("sort", "created"),
                ("direction", "asc"),
            ]);
        if let Some((id, secret)) = &self.credentials {
            req = req.basic_auth(id, Some(secret));
        }

        let res = req
            .send()
            .await
            .map_err(|e| AppError::Upstream(anyhow::Error::new(e).context("github request")))?;

        let status = res.status();
        if !status.is_success() {
            warn!(username, %status, "github lookup failed");
            return Err(AppError::GithubNotFound);
        }

        let repos = res
            .json::<Vec<RepoSummary>>()
            .await
            .map_err(|e| AppError::Upstream(anyhow::Error::new(e).context("decode github repos")))?;
        debug!(username, count = repos.len(), "github repos fetched");
        Ok(repos)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str) -> GithubConfig {
        GithubConfig {
            api_url: api_url.into(),
            client_id: None,
            client_secret: None,
            timeout_secs: 1,
        }
    }

    #[test]
    fn username_syntax() {
        assert!(is_valid_username("octocat"));
        assert!(is_valid_username("some-user-42"));
        assert!(!is_valid_username("-leading"));
        assert!(!is_valid_username("double--dash"));
        assert!(!is_valid_username("../etc/passwd"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"a".repeat(40)));
    }

    #[tokio::test]
    async fn invalid_username_never_leaves_the_process() {
        // unroutable base url: any outbound attempt would surface as Upstream
        let client = GithubClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.recent_repos("../admin").await.unwrap_err();
        assert!(matches!(err, AppError::GithubNotFound));
    }

    #[tokio::test]
    async fn transport_failure_is_upstream_error() {
        let client = GithubClient::new(&config("http://127.0.0.1:9")).unwrap();
        let err = client.recent_repos("octocat").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
