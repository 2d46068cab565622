use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;
/// Provider call budget used when `AUTH_PROVIDER_TIMEOUT_SECS` is not set.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_STATIC_ROOT: &str = "client/dist";
const LOCAL_PROVIDER_URL: &str = "http://localhost:4000";

/// AppConfig
///
/// Holds the server's entire configuration. Loaded once at startup and immutable
/// afterwards; handlers pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format and how strict loading is.
    pub env: Env,
    // Listen port. The bind address itself is always 0.0.0.0.
    pub port: u16,
    // Build artefact directory of the client (index.html plus hashed assets).
    pub static_root: PathBuf,
    // Base URL of the external identity provider.
    pub provider_url: String,
    // Upper bound for a single call to the identity provider.
    pub provider_timeout: Duration,
}

/// Env
///
/// Runtime context. `Local` favours developer convenience (pretty logs, provider
/// URL fallback); `Production` demands explicit settings and logs JSON.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// ConfigError
///
/// Raised by `AppConfig::load` when the environment cannot produce a usable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for test scaffolding. Points at a provider
    /// that is never contacted by the mock-backed tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: DEFAULT_PORT,
            static_root: PathBuf::from(DEFAULT_STATIC_ROOT),
            provider_url: LOCAL_PROVIDER_URL.to_string(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` when `AUTH_PROVIDER_URL` is absent in production,
    /// and `ConfigError::Invalid` for a port or timeout that does not parse (a zero
    /// timeout is rejected too, since it would fail every provider call).
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let provider_timeout = match env::var("AUTH_PROVIDER_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "AUTH_PROVIDER_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            Err(_) => DEFAULT_PROVIDER_TIMEOUT,
        };

        // Local runs may lean on a provider started next to the server; production must say where it is.
        let provider_url = match (env, env::var("AUTH_PROVIDER_URL")) {
            (_, Ok(url)) => url,
            (Env::Local, Err(_)) => LOCAL_PROVIDER_URL.to_string(),
            (Env::Production, Err(_)) => return Err(ConfigError::Missing("AUTH_PROVIDER_URL")),
        };

        let static_root = env::var("STATIC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_ROOT));

        Ok(Self {
            env,
            port,
            static_root,
            provider_url: provider_url.trim_end_matches('/').to_string(),
            provider_timeout,
        })
    }

    /// All interfaces, configured port.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
