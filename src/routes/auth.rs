use crate::{AppState, provider::ProviderState};
use axum::{
    Router,
    extract::{OriginalUri, Request, State},
    response::Response,
    routing::{MethodFilter, on},
};

/// Auth Router Module
///
/// `/auth` and everything under it belongs to the identity provider. The pipeline
/// does not look at these requests; it hands them over whole and returns whatever
/// comes back.
pub fn auth_routes() -> Router<AppState> {
    let methods = MethodFilter::GET.or(MethodFilter::POST);

    Router::new()
        // GET|POST /auth
        .route("/auth", on(methods, delegate_to_provider))
        // GET|POST /auth/{*rest}
        // Sign-in, sign-up, sign-out, session lookup and provider callbacks.
        .route("/auth/{*rest}", on(methods, delegate_to_provider))
}

/// delegate_to_provider
///
/// Restores the URI the client actually sent (nesting strips the mount prefix) and
/// forwards the request to the provider.
pub async fn delegate_to_provider(
    State(provider): State<ProviderState>,
    OriginalUri(uri): OriginalUri,
    mut request: Request,
) -> Response {
    *request.uri_mut() = uri;
    provider.handle(request).await
}
