//! Thin GitHub pull-request client — enough to open a PR against the
//! REST API, not a general-purpose GitHub SDK.

use crate::{ForgeClient, ForgeError, OpenPullRequestRequest, PrHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct GithubForgeClient {
    http: reqwest::Client,
    token: String,
}

impl GithubForgeClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), token: token.into() }
    }
}

#[derive(Serialize)]
struct CreatePrRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatePrResponse {
    html_url: String,
    number: u64,
}

#[async_trait]
impl ForgeClient for GithubForgeClient {
    async fn open_pull_request(&self, request: OpenPullRequestRequest<'_>) -> Result<PrHandle, ForgeError> {
        let url = format!("https://api.github.com/repos/{}/{}/pulls", request.owner, request.repo);
        let body = CreatePrRequest {
            title: request.title,
            head: request.head_branch,
            base: request.base_branch,
            body: request.body,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("User-Agent", "patchforge")
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ForgeError::Provider(format!("github returned {status}: {text}")));
        }

        let parsed: CreatePrResponse = response.json().await?;
        Ok(PrHandle { url: parsed.html_url, number: parsed.number })
    }
}
