use axum::{
    Router,
    body::Body,
    extract::FromRef,
    http::{HeaderName, Request},
    response::Response,
};
use std::{path::Path, time::Duration};

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::Span;

// --- Module Structure ---

// Server side: configuration, the provider contract, and the API route table.
pub mod config;
pub mod provider;
pub mod routes;
pub mod session;

// Client side: history, base path and the navigation guard.
pub mod client;

use routes::API_MOUNT;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use provider::{HttpIdentityProvider, IdentityProvider, MockIdentityProvider, ProviderState};
pub use session::{Session, UserRef};

/// The single client entry document served by the SPA fallback.
pub const INDEX_DOCUMENT: &str = "index.html";

/// AppState
///
/// Everything a request may touch. Immutable after startup and cheap to clone;
/// concurrent requests share it without locks.
#[derive(Clone)]
pub struct AppState {
    /// The external identity provider all `/api/auth/*` traffic is delegated to.
    pub provider: ProviderState,
    /// The loaded configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ProviderState {
    fn from_ref(app_state: &AppState) -> ProviderState {
        app_state.provider.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the request pipeline. Stages, outermost first:
///
/// 1. CORS: permissive headers on every response, preflights answered here.
/// 2. Request id and access log: one `request completed` event per request.
/// 3. API routes nested under `/api`, first match wins.
/// 4. Static files from `config.static_root`.
/// 5. SPA fallback: `index.html` with status 200 for unmatched GET paths.
///
/// The route table is assembled here once and never changes afterwards.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 4 + 5. Static resolution with the SPA fallback behind it.
    let static_files = static_service(&state.config.static_root);

    // 3. API routes first; anything they do not match falls to the static stage.
    let base_router = Router::new()
        .nest(API_MOUNT, routes::api_routes())
        .fallback_service(static_files)
        .with_state(state);

    // 2. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        // Completion is the single log line; start and failure hooks stay silent.
                        .on_request(())
                        .on_response(access_log)
                        .on_failure(()),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 1. CORS Layer (outermost)
        .layer(cors)
}

/// static_service
///
/// Serves files under `root` with a content type guessed from the extension.
/// Misses are answered by `root/index.html` with status 200 so the client router
/// can resolve the path. Directories count as misses, so `/assets` never turns into
/// a redirect. Methods other than GET and HEAD get 405 from `ServeDir` and never
/// reach the fallback.
pub fn static_service(root: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(root)
        .append_index_html_on_directories(false)
        .fallback(ServeFile::new(root.join(INDEX_DOCUMENT)))
}

/// trace_span_logger
///
/// Span wrapping one request. Only the path is recorded; query strings can carry
/// tokens during provider callbacks.
fn trace_span_logger(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}

fn access_log(response: &Response, latency: Duration, _span: &Span) {
    tracing::info!(
        status = response.status().as_u16(),
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );
}
