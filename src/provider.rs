use async_trait::async_trait;
use axum::{
    Json,
    body::{Body, to_bytes},
    extract::Request,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Duration};

use crate::session::{Session, SessionData};

/// Path of the provider's session endpoint, relative to its base URL.
pub const SESSION_ENDPOINT: &str = "/api/auth/get-session";

/// Largest request body forwarded to the provider. Anything bigger is answered
/// with 400 by the adapter and never reaches the provider.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// Connection-scoped headers that must not cross a proxy hop.
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

// 1. IdentityProvider Contract
/// IdentityProvider
///
/// The two-method capability behind which all authentication lives. The request
/// pipeline only calls `handle`; the client navigation guard only calls `get_session`.
/// Neither ever looks at credentials itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Answers a raw auth request. The returned response is sent to the client as is,
    /// including whatever error status the provider chose.
    async fn handle(&self, request: Request) -> Response;

    /// Fetches the session identified by `credentials` (cookies or an
    /// `Authorization` header).
    async fn get_session(&self, credentials: &HeaderMap) -> Result<Session, ProviderError>;
}

/// ProviderError
///
/// Failures talking to the provider when it could not produce an answer of its own.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("identity provider did not answer in time")]
    Timeout,
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider answered with status {0}")]
    Status(StatusCode),
    #[error("request body could not be read: {0}")]
    Body(String),
    #[error("malformed session payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        let status = match self {
            ProviderError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProviderError::Body(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

// 2. The Real Implementation (remote provider over HTTP)
/// HttpIdentityProvider
///
/// Talks to a provider that exposes its auth routes under `/api/auth`. The server
/// points it at the identity service; the client points it at the server, whose
/// `/api` mount forwards to the same service.
///
/// Redirects are never followed: OAuth-style flows answer with 302s that belong to
/// the browser, not to this hop.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    /// new
    ///
    /// Builds the HTTP client. `timeout` bounds every call, from connect to the last
    /// byte of the response body.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn forward(&self, request: Request) -> Result<Response, ProviderError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ProviderError::Body(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        // reqwest derives Host from the upstream URL.
        headers.remove(header::HOST);

        tracing::debug!(method = %parts.method, url = %url, "forwarding to identity provider");

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    /// Forwards `request` and relays the provider's answer. Failures to get an answer
    /// map through `ProviderError`'s `IntoResponse`.
    ///
    /// The body is buffered before sending. One larger than `MAX_BODY_BYTES` is
    /// rejected with 400 here and the provider is never contacted.
    async fn handle(&self, request: Request) -> Response {
        match self.forward(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "identity provider request failed");
                err.into_response()
            }
        }
    }

    async fn get_session(&self, credentials: &HeaderMap) -> Result<Session, ProviderError> {
        let mut headers = credentials.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let response = self
            .client
            .get(format!("{}{}", self.base_url, SESSION_ENDPOINT))
            .headers(headers)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        // The provider answers `null` when there is no session.
        let data = response.json::<Option<SessionData>>().await?;
        Ok(Session { data })
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

// 3. The Mock Implementation (For Tests)
/// MockIdentityProvider
///
/// In-process stand-in for the provider. `handle` echoes the request it saw as JSON,
/// so tests can tell exactly what reached the provider; `get_session` returns the
/// configured session.
#[derive(Clone, Default)]
pub struct MockIdentityProvider {
    pub session: Session,
    /// When true, every call fails as if the provider were unreachable.
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            session: Session::anonymous(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn handle(&self, request: Request) -> Response {
        if self.should_fail {
            return ProviderError::Transport("Mock Provider Error: Simulation requested".into())
                .into_response();
        }

        let (parts, body) = request.into_parts();
        let body = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return ProviderError::Body(e.to_string()).into_response(),
        };
        let cookie = parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok());

        (
            StatusCode::OK,
            [("x-provider", "mock")],
            Json(serde_json::json!({
                "method": parts.method.as_str(),
                "path": parts.uri.path(),
                "query": parts.uri.query(),
                "cookie": cookie,
                "body": body,
            })),
        )
            .into_response()
    }

    async fn get_session(&self, _credentials: &HeaderMap) -> Result<Session, ProviderError> {
        if self.should_fail {
            return Err(ProviderError::Transport(
                "Mock Provider Error: Simulation requested".into(),
            ));
        }
        Ok(self.session.clone())
    }
}

/// ProviderState
///
/// Shared handle to the provider, cloned into every request.
pub type ProviderState = Arc<dyn IdentityProvider>;
