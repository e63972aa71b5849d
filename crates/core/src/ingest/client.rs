use crate::config::Settings;
use crate::domain::snapshot::ChainExpiry;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;

const DASHBOARD_PATH: &str = "/api/dashboard";
const SET_TOKEN_PATH: &str = "/api/set-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request never produced a response (connect, timeout, DNS).
    Network,
    /// Backend answered with a non-success status or an unparseable body.
    Backend,
    /// Backend refused the session token.
    AuthRejected,
}

/// A failed fetch, classified so the poller can surface it without parsing
/// error strings.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl FetchFailure {
    fn network(err: reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Network,
            detail: err.to_string(),
        }
    }

    fn backend(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Backend,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FailureKind::Network => "network error",
            FailureKind::Backend => "backend error",
            FailureKind::AuthRejected => "auth rejected",
        };
        write!(f, "{kind}: {}", self.detail)
    }
}

impl std::error::Error for FetchFailure {}

/// The upstream analytics backend, seen as a source of raw JSON documents.
/// Normalization happens after this seam, so implementations stay dumb.
#[async_trait::async_trait]
pub trait DashboardSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_dashboard(&self) -> Result<Value>;

    async fn fetch_option_chain(&self, expiry: ChainExpiry) -> Result<Value>;
}

#[derive(Debug)]
pub struct VolGuardClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,

    // Remembered so an expired backend session can be re-armed transparently.
    token: tokio::sync::Mutex<Option<String>>,
}

impl VolGuardClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_base_url()?.to_string();

        let timeout_secs = std::env::var("VOLGUARD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("VOLGUARD_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build dashboard http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
            token: tokio::sync::Mutex::new(settings.api_token.clone()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Arm the backend session with a broker token and remember it for
    /// transparent re-sends.
    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.push_token(token).await?;
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn push_token(&self, token: &str) -> Result<(), FetchFailure> {
        let res = self
            .http
            .post(self.url(SET_TOKEN_PATH))
            .query(&[("token", token)])
            .send()
            .await
            .map_err(FetchFailure::network)?;

        let status = res.status();
        if is_auth_rejection(status) {
            return Err(FetchFailure {
                kind: FailureKind::AuthRejected,
                detail: format!("token rejected: HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(FetchFailure::backend(format!("set-token HTTP {status}")));
        }
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Value, FetchFailure> {
        let res = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(FetchFailure::network)?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|err| FetchFailure::backend(format!("failed to read body: {err}")))?;

        if is_auth_rejection(status) {
            return Err(FetchFailure {
                kind: FailureKind::AuthRejected,
                detail: format!("HTTP {status}: {text}"),
            });
        }
        if !status.is_success() {
            return Err(FetchFailure::backend(format!("HTTP {status}: {text}")));
        }

        serde_json::from_str::<Value>(&text)
            .map_err(|err| FetchFailure::backend(format!("response is not valid JSON: {err}")))
    }

    /// GET with transient-error retries plus one transparent token re-send
    /// when the backend has lost its session.
    async fn get_with_auth_retry(&self, path: &str) -> Result<Value, FetchFailure> {
        let mut resent_token = false;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_json(path).await {
                Ok(v) => return Ok(v),
                Err(err) if err.kind == FailureKind::AuthRejected => {
                    let token = self.token.lock().await.clone();
                    let Some(token) = token.filter(|_| !resent_token) else {
                        return Err(err);
                    };
                    resent_token = true;
                    tracing::warn!(path, "backend session rejected; re-sending stored token");
                    self.push_token(&token).await?;
                }
                Err(err) if attempt < self.retries => {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        path,
                        error = %err,
                        "dashboard fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait::async_trait]
impl DashboardSource for VolGuardClient {
    fn source_name(&self) -> &'static str {
        "volguard_http"
    }

    async fn fetch_dashboard(&self) -> Result<Value> {
        self.get_with_auth_retry(DASHBOARD_PATH)
            .await
            .map_err(Into::into)
    }

    async fn fetch_option_chain(&self, expiry: ChainExpiry) -> Result<Value> {
        let path = format!("/api/option-chain/{}", expiry.as_str());
        self.get_with_auth_retry(&path).await.map_err(Into::into)
    }
}

/// The backend signals a bad or missing session with 400 or 401.
fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED
    )
}
