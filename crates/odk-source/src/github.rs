//! Live GitHub adapter for [`SourceGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;

use odk_schemas::{Issue, IssueDraft};

use crate::{Collection, GatewayError, SourceGateway};

/// GitHub requires a User-Agent on every API call.
const USER_AGENT: &str = concat!("orderdeck/", env!("CARGO_PKG_VERSION"));

/// Upper bound on any single tracker call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub REST adapter. The credential is a fixed token forwarded on every
/// request; the base URL is overridable so tests can point at a local stub.
pub struct GithubGateway {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GithubGateway {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn issues_url(&self, collection: &Collection) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.base_url, collection.org, collection.repo
        )
    }

    fn authorization(&self) -> String {
        format!("token {}", self.token)
    }
}

#[async_trait]
impl SourceGateway for GithubGateway {
    async fn fetch(&self, collection: &Collection) -> Result<Vec<Issue>, GatewayError> {
        let resp = self
            .http
            .get(self.issues_url(collection))
            .header(header::AUTHORIZATION, self.authorization())
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<Vec<Issue>>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn create(
        &self,
        collection: &Collection,
        draft: &IssueDraft,
    ) -> Result<Issue, GatewayError> {
        let resp = self
            .http
            .post(self.issues_url(collection))
            .header(header::AUTHORIZATION, self.authorization())
            .header(header::USER_AGENT, USER_AGENT)
            .json(draft)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<Issue>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
