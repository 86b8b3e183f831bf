//! `DocumentBackend` over the GitHub contents API.
//!
//! - `GET  {base}/repos/{repo}/contents/{path}` -> `200 {content, sha}` | `404`
//! - `PUT  {base}/repos/{repo}/contents/{path}` with `{message, content, sha?, branch?}`
//!   -> `200|201 {content: {sha}}` | `409` | `401/403` | `404`
//!
//! Payloads travel base64-encoded; see `medialog_core::codec`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use medialog_core::codec;

use crate::backend::{DocumentBackend, GetOutcome, PutOutcome, PutRequest, RemoteDocument};
use crate::config::StoreConfig;
use crate::credential::CredentialStore;
use crate::error::StoreError;

const GITHUB_JSON: &str = "application/vnd.github+json";

// ── Wire types ──

#[derive(Deserialize)]
pub(crate) struct ContentsResponse {
    #[serde(default)]
    content: String,
    sha: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Decode a successful contents response into the document it carries.
pub(crate) fn document_from(path: &str, body: ContentsResponse) -> Result<RemoteDocument, StoreError> {
    if body.encoding.as_deref() == Some("none") {
        return Err(StoreError::Status {
            status: 200,
            path: path.to_string(),
            message: "document too large for the contents API".into(),
        });
    }
    Ok(RemoteDocument {
        path: path.to_string(),
        content: codec::decode(&body.content)?,
        version: body.sha,
    })
}

#[derive(Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Deserialize)]
struct PutResponseContent {
    sha: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

// ── Status classification ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Success,
    NotFound,
    Conflict,
    Unauthorized,
    Other,
}

fn classify(status: StatusCode) -> Class {
    match status {
        s if s.is_success() => Class::Success,
        StatusCode::NOT_FOUND => Class::NotFound,
        StatusCode::CONFLICT => Class::Conflict,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Class::Unauthorized,
        _ => Class::Other,
    }
}

// ── Backend ──

pub struct GitHubBackend {
    http: reqwest::Client,
    config: StoreConfig,
    credentials: Arc<dyn CredentialStore>,
}

impl GitHubBackend {
    pub fn new(config: StoreConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("medialog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.repo,
            path.trim_start_matches('/')
        )
    }

    async fn error_status(path: &str, response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or(text);
        StoreError::Status {
            status,
            path: path.to_string(),
            message,
        }
    }
}

#[async_trait::async_trait]
impl DocumentBackend for GitHubBackend {
    async fn get(&self, path: &str) -> Result<GetOutcome, StoreError> {
        let Some(token) = self.credentials.token() else {
            return Err(StoreError::Unauthorized);
        };
        let mut request = self
            .http
            .get(self.contents_url(path))
            .header(ACCEPT, GITHUB_JSON)
            .bearer_auth(token);
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch)]);
        }
        let response = request.send().await?;
        let status = response.status();
        debug!(path, %status, "GET contents");

        match classify(status) {
            Class::Success => {
                let body: ContentsResponse = response.json().await?;
                Ok(GetOutcome::Found(document_from(path, body)?))
            }
            Class::NotFound => Ok(GetOutcome::NotFound),
            Class::Unauthorized => Err(StoreError::Unauthorized),
            Class::Conflict | Class::Other => Err(Self::error_status(path, response).await),
        }
    }

    async fn put(&self, request: PutRequest<'_>) -> Result<PutOutcome, StoreError> {
        let Some(token) = self.credentials.token() else {
            return Ok(PutOutcome::Unauthorized);
        };
        let body = PutBody {
            message: request.message,
            content: codec::encode(request.content),
            sha: request.expected_version,
            branch: self.config.branch.as_deref(),
        };
        let response = self
            .http
            .put(self.contents_url(request.path))
            .header(ACCEPT, GITHUB_JSON)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        debug!(path = request.path, %status, has_version = request.expected_version.is_some(), "PUT contents");

        match classify(status) {
            Class::Success => {
                let body: PutResponse = response.json().await?;
                Ok(PutOutcome::Ok {
                    version: body.content.sha,
                })
            }
            Class::Conflict => Ok(PutOutcome::Conflict),
            Class::NotFound => Ok(PutOutcome::NotFound),
            Class::Unauthorized => Ok(PutOutcome::Unauthorized),
            Class::Other => Err(Self::error_status(request.path, response).await),
        }
    }

    fn discard_credential(&self) {
        self.credentials.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticCredential;

    #[test]
    fn classify_statuses() {
        assert_eq!(classify(StatusCode::OK), Class::Success);
        assert_eq!(classify(StatusCode::CREATED), Class::Success);
        assert_eq!(classify(StatusCode::NOT_FOUND), Class::NotFound);
        assert_eq!(classify(StatusCode::CONFLICT), Class::Conflict);
        assert_eq!(classify(StatusCode::UNAUTHORIZED), Class::Unauthorized);
        assert_eq!(classify(StatusCode::FORBIDDEN), Class::Unauthorized);
        assert_eq!(classify(StatusCode::UNPROCESSABLE_ENTITY), Class::Other);
        assert_eq!(classify(StatusCode::INTERNAL_SERVER_ERROR), Class::Other);
    }

    #[test]
    fn contents_url_trims_slashes() {
        let mut config = StoreConfig::for_repo("aztkp/my-radiko");
        config.api_base = "https://ghe.example.com/api/v3/".into();
        let backend = GitHubBackend::new(config, Arc::new(StaticCredential::default())).unwrap();
        assert_eq!(
            backend.contents_url("/logs/2024-02.md"),
            "https://ghe.example.com/api/v3/repos/aztkp/my-radiko/contents/logs/2024-02.md"
        );
    }

    #[test]
    fn put_body_omits_missing_version() {
        let body = PutBody {
            message: "📅 Update calendar",
            content: codec::encode("x"),
            sha: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "eA==");
        assert!(json.get("sha").is_none());
        assert!(json.get("branch").is_none());
    }

    #[test]
    fn contents_response_parses_wrapped_payload() {
        let raw = r#"{"name":"schedule.json","sha":"abc123","encoding":"base64","content":"e30=\n"}"#;
        let body: ContentsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.sha, "abc123");
        assert_eq!(codec::decode(&body.content).unwrap(), "{}");
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let raw = r#"{"sha":"abc123","encoding":"base64","content":"not base64!!"}"#;
        let body: ContentsResponse = serde_json::from_str(raw).unwrap();
        let err = document_from("schedule.json", body).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[test]
    fn oversized_document_is_reported() {
        let raw = r#"{"sha":"abc123","encoding":"none","content":""}"#;
        let body: ContentsResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            document_from("logs/2024-02.md", body),
            Err(StoreError::Status { ref path, .. }) if path == "logs/2024-02.md"
        ));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized_without_network() {
        let backend = GitHubBackend::new(
            StoreConfig::for_repo("a/b"),
            Arc::new(StaticCredential::new(None)),
        )
        .unwrap();
        assert!(backend.get("schedule.json").await.unwrap_err().is_unauthorized());
        let outcome = backend
            .put(PutRequest {
                path: "schedule.json",
                content: "{}",
                expected_version: None,
                message: "m",
            })
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Unauthorized);
    }
}
