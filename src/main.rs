use gatehouse::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    provider::{HttpIdentityProvider, ProviderState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, wires the identity provider into the
/// request pipeline and serves it on all interfaces.
#[tokio::main]
async fn main() {
    // 1. Configuration (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid configuration");

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise our own crate at debug and HTTP plumbing at info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gatehouse=debug,tower_http=info".into());

    // 3. Log format per environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Identity Provider
    let provider = HttpIdentityProvider::new(&config.provider_url, config.provider_timeout)
        .expect("FATAL: could not build the identity provider client");
    tracing::info!(
        provider = provider.base_url(),
        timeout_secs = config.provider_timeout.as_secs(),
        static_root = %config.static_root.display(),
        "identity provider configured"
    );
    let provider = Arc::new(provider) as ProviderState;

    // 5. Router and Server Startup
    let addr = config.bind_addr();
    let port = config.port;
    let app = create_router(AppState { provider, config });

    let listener = TcpListener::bind(addr)
        .await
        .expect("FATAL: could not bind the listen address");

    tracing::info!("Server is running on http://localhost:{}", port);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated");
}
