use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, StatusCode,
    header::{HeaderMap, LINK},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::types::{IssueComment, Label};

const USER_AGENT: &str = concat!("gqlkit-release-check/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const PER_PAGE: &str = "100";

/// Errors returned by a single GitHub REST call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status} body: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The handful of pull request endpoints the release check talks to. Every
/// URL comes from the webhook payload, so implementations follow links rather
/// than building routes.
#[async_trait]
pub trait PullRequestApi {
    async fn list_comments(&self, comments_url: &str) -> ApiResult<Vec<IssueComment>>;

    async fn create_comment(&self, comments_url: &str, body: &str) -> ApiResult<()>;

    async fn update_comment(&self, comment_url: &str, body: &str) -> ApiResult<()>;

    /// Adds labels and returns the issue's full label list afterwards.
    async fn add_labels(&self, labels_url: &str, labels: &[String]) -> ApiResult<Vec<Label>>;

    async fn remove_label(&self, label_url: &str) -> ApiResult<()>;
}

pub fn get_github_token() -> Result<String> {
    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Ok(token) = std::env::var(var) {
            if !token.trim().is_empty() {
                return Ok(token);
            }
        }
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("Failed to run gh CLI")?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// Token-authenticated REST client.
#[derive(Debug, Clone)]
pub struct GitHub {
    http: Client,
    auth_header: String,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a [String],
}

impl GitHub {
    pub fn new(token: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self {
            http,
            auth_header: format!("Bearer {token}"),
        })
    }

    /// Builds a client from the token found in the environment or gh CLI.
    pub fn from_env() -> Result<Self> {
        let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
        Self::new(&token)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(%method, url, "github request");
        self.http
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .header(reqwest::header::ACCEPT, ACCEPT)
    }

    async fn send(request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        Ok(response)
    }
}

/// `url` with the largest page size, unless the caller already chose one.
fn first_page(url: &str) -> ApiResult<Url> {
    let mut url = Url::parse(url)?;
    if !url.query_pairs().any(|(key, _)| key == "per_page") {
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);
    }
    Ok(url)
}

/// The `rel="next"` target of a `Link` response header.
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.trim().split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#);
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

#[async_trait]
impl PullRequestApi for GitHub {
    async fn list_comments(&self, comments_url: &str) -> ApiResult<Vec<IssueComment>> {
        let mut all_comments = Vec::new();
        let mut next = Some(first_page(comments_url)?.to_string());

        while let Some(url) = next {
            let response = Self::send(self.request(Method::GET, &url)).await?;
            next = next_page(response.headers());
            let comments: Vec<IssueComment> = response.json().await?;
            debug!(url, count = comments.len(), "fetched comment page");
            all_comments.extend(comments);
        }

        Ok(all_comments)
    }

    async fn create_comment(&self, comments_url: &str, body: &str) -> ApiResult<()> {
        Self::send(
            self.request(Method::POST, comments_url)
                .json(&CommentBody { body }),
        )
        .await?;
        Ok(())
    }

    async fn update_comment(&self, comment_url: &str, body: &str) -> ApiResult<()> {
        Self::send(
            self.request(Method::PATCH, comment_url)
                .json(&CommentBody { body }),
        )
        .await?;
        Ok(())
    }

    async fn add_labels(&self, labels_url: &str, labels: &[String]) -> ApiResult<Vec<Label>> {
        let response = Self::send(
            self.request(Method::POST, labels_url)
                .json(&LabelsBody { labels }),
        )
        .await?;
        Ok(response.json().await?)
    }

    async fn remove_label(&self, label_url: &str) -> ApiResult<()> {
        Self::send(self.request(Method::DELETE, label_url)).await?;
        Ok(())
    }
}

/// Reads through to the wrapped client and logs mutations instead of sending
/// them.
#[derive(Debug, Clone)]
pub struct DryRun<A>(pub A);

#[async_trait]
impl<A> PullRequestApi for DryRun<A>
where
    A: PullRequestApi + Send + Sync,
{
    async fn list_comments(&self, comments_url: &str) -> ApiResult<Vec<IssueComment>> {
        self.0.list_comments(comments_url).await
    }

    async fn create_comment(&self, comments_url: &str, body: &str) -> ApiResult<()> {
        info!(url = comments_url, body, "dry run: would create comment");
        Ok(())
    }

    async fn update_comment(&self, comment_url: &str, body: &str) -> ApiResult<()> {
        info!(url = comment_url, body, "dry run: would update comment");
        Ok(())
    }

    async fn add_labels(&self, labels_url: &str, labels: &[String]) -> ApiResult<Vec<Label>> {
        info!(url = labels_url, ?labels, "dry run: would add labels");
        Ok(labels
            .iter()
            .map(|name| Label {
                name: name.clone(),
                url: format!("{labels_url}/{name}"),
            })
            .collect())
    }

    async fn remove_label(&self, label_url: &str) -> ApiResult<()> {
        info!(url = label_url, "dry run: would remove label");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn first_page_requests_largest_page_size() {
        let url = first_page("https://api.github.com/repos/o/r/issues/1/comments").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/o/r/issues/1/comments?per_page=100"
        );

        let url =
            first_page("https://api.github.com/repos/o/r/issues/1/comments?per_page=5").unwrap();
        assert_eq!(url.query(), Some("per_page=5"));
    }

    #[test]
    fn next_page_follows_next_relation_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(next_page(&headers), None);

        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/issues/1/comments?page=1>; rel=\"prev\", \
                 <https://api.github.com/repositories/1/issues/1/comments?page=3>; rel=\"next\", \
                 <https://api.github.com/repositories/1/issues/1/comments?page=5>; rel=\"last\"",
            ),
        );
        assert_eq!(
            next_page(&headers).as_deref(),
            Some("https://api.github.com/repositories/1/issues/1/comments?page=3")
        );

        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/issues/1/comments?page=1>; rel=\"first\"",
            ),
        );
        assert_eq!(next_page(&headers), None);
    }
}
