// HTTP transport seam for the StayFinder API.
//
// The client talks to an `HttpBackend` trait rather than to reqwest
// directly, so tests can drive the full request path against an in-process
// mock. The real backend is a thin wrapper over a pooled `reqwest::Client`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use reqwest::Method;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    // Non-2xx response; `message` is extracted from the response envelope
    // when present.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // The operation requires a session and none is active.
    #[error("not authenticated")]
    Unauthorized,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

// Transport configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stayfinder.example/api".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("stayfinder-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// One outbound API request, fully described so backends stay interchangeable.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
    // Random id carried through logs to tie a response back to its request.
    pub correlation_id: String,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
            correlation_id: format!("req-{:08x}", rand::random::<u32>()),
        }
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

// Raw response as seen by the client layer. Status interpretation and
// envelope decoding happen above the seam.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpBackend: Send + Sync + 'static {
    // Execute one request to completion. `Err` means the request never
    // produced an HTTP response; any status code comes back as `Ok`.
    async fn execute(&self, request: ApiRequest) -> Result<HttpResponse, ApiError>;
}

// ---------------------------------------------------------------------------
// ReqwestBackend
// ---------------------------------------------------------------------------

pub struct ReqwestBackend {
    http: reqwest::Client,
    base_url: String,
}

impl ReqwestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        if url::Url::parse(&config.base_url).is_err() {
            return Err(ApiError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn execute(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .query(&request.query);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(
            correlation_id = %request.correlation_id,
            method = %request.method,
            %url,
            "sending request"
        );

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(
            correlation_id = %request.correlation_id,
            status,
            bytes = body.len(),
            "received response"
        );

        Ok(HttpResponse { status, body })
    }
}

// ---------------------------------------------------------------------------
// Mock backend for tests
// ---------------------------------------------------------------------------
