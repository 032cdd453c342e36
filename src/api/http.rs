//! Shared HTTP plumbing for the service adapters.
//!
//! Every adapter talks JSON over HTTPS with a per-request token. This
//! client attaches the token in the service's header scheme and maps HTTP
//! failures onto [`MigrateError`] so the rate limiter and orchestrator can
//! tell retryable failures from fatal ones.

use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::ServiceSettings;
use crate::error::{MigrateError, Result};
use crate::models::{Credential, ServiceKind};

const USER_AGENT: &str = concat!("tuneshift/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the credential is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: OAuth <token>` (SoundCloud)
    OAuth,
}

impl AuthScheme {
    fn header_value(self, credential: &Credential) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {}", credential.token()),
            AuthScheme::OAuth => format!("OAuth {}", credential.token()),
        }
    }
}

/// JSON client bound to one service's base URL and auth scheme.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: AuthScheme,
    service: ServiceKind,
}

impl ApiClient {
    /// Create a client. `settings.api_base` overrides `default_base` when set.
    pub fn new(
        service: ServiceKind,
        default_base: &str,
        settings: &ServiceSettings,
        auth: AuthScheme,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = settings
            .api_base
            .as_deref()
            .unwrap_or(default_base)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            auth,
            service,
        })
    }

    /// Service this client talks to.
    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// Resolve an endpoint path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET `path` with query parameters.
    pub async fn get(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        self.send(Method::GET, credential, path, query, None).await
    }

    /// POST a JSON body to `path`.
    pub async fn post(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value> {
        self.send(Method::POST, credential, path, query, Some(body)).await
    }

    /// PUT a JSON body to `path`.
    pub async fn put(&self, credential: &Credential, path: &str, body: &Value) -> Result<Value> {
        self.send(Method::PUT, credential, path, &[], Some(body)).await
    }

    /// Send one request and decode the JSON response. An empty body decodes as `null`.
    pub async fn send(
        &self,
        method: Method,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path);
        debug!("{} {} {} {:?}", self.service, method, url, query);

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, self.auth.header_value(credential));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                MigrateError::Transport(format!("{}: {}", self.service, e))
            } else {
                MigrateError::Request(e)
            }
        })?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await?;

        if !status.is_success() {
            let err = classify(self.service, status, retry_after, &text);
            error!("{} {} failed: {}", self.service, url, err);
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// `Retry-After` in seconds, if present and numeric.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Best-effort error message from a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error").unwrap_or(&json);

    error
        .get("message")
        .or_else(|| error.get("userMessage"))
        .or_else(|| error.get("error_description"))
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(|s| s.to_string())
}

/// `error.errors[].reason` values that mean "slow down" rather than "not allowed".
/// YouTube reports its quota and rate limits as 403.
const RATE_LIMIT_REASONS: &[&str] = &[
    "quotaExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "dailyLimitExceeded",
];

/// Whether an error body carries a rate or quota reason.
fn is_rate_limit_body(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    json.get("error")
        .and_then(|e| e.get("errors"))
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors.iter().any(|e| {
                e.get("reason")
                    .and_then(|r| r.as_str())
                    .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r))
            })
        })
        .unwrap_or(false)
}

/// Map a non-success status onto the error taxonomy.
fn classify(
    service: ServiceKind,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> MigrateError {
    let detail = error_message(body).unwrap_or_else(|| status.to_string());
    let message = format!("{}: {}", service, detail);

    match status {
        StatusCode::FORBIDDEN if is_rate_limit_body(body) => MigrateError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MigrateError::Unauthorized(message),
        StatusCode::NOT_FOUND => MigrateError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => MigrateError::RateLimited { retry_after },
        s if s.is_server_error() => MigrateError::Transport(message),
        _ => MigrateError::Api(message),
    }
}
