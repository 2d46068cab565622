use axum::http::HeaderMap;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crate::{
    client::{NavigationError, history::route_path},
    provider::ProviderState,
};

/// The login view; the only route reachable without a session.
pub const AUTH_PATH: &str = "/auth";
/// Where signed-in users are sent when they open the login view.
pub const HOME_PATH: &str = "/";
/// Upper bound on a session lookup unless `with_session_timeout` says otherwise.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Decision
///
/// What a guard run concluded about one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Cancel the transition and navigate here instead.
    Redirect(String),
}

/// decide
///
/// The guard's decision table, one arm per combination of (authenticated,
/// target is the login view).
pub fn decide(authenticated: bool, target_path: &str) -> Decision {
    match (authenticated, route_path(target_path) == AUTH_PATH) {
        (false, false) => Decision::Redirect(AUTH_PATH.to_string()),
        (false, true) => Decision::Allow,
        (true, true) => Decision::Redirect(HOME_PATH.to_string()),
        (true, false) => Decision::Allow,
    }
}

/// NavigationGuard
///
/// Runs before every route transition. Each run fetches the session afresh; nothing
/// is cached between runs.
///
/// Every run takes a ticket from a monotonically increasing counter before it
/// suspends on the provider. When it resumes and a newer run has started in the
/// meantime, its result is reported as `NavigationError::Superseded` instead of a
/// decision, so a slow answer for an abandoned navigation can never win.
pub struct NavigationGuard {
    provider: ProviderState,
    credentials: HeaderMap,
    session_timeout: Duration,
    latest: AtomicU64,
}

impl NavigationGuard {
    pub fn new(provider: ProviderState) -> Self {
        Self {
            provider,
            credentials: HeaderMap::new(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            latest: AtomicU64::new(0),
        }
    }

    /// Headers sent with every session lookup (the session cookie, typically).
    pub fn with_credentials(mut self, credentials: HeaderMap) -> Self {
        self.credentials = credentials;
        self
    }

    /// Upper bound on a session lookup. A lookup that takes longer counts as "no session".
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// before_each
    ///
    /// Decides the transition from `current_path` to `target_path`.
    ///
    /// # Errors
    /// `NavigationError::Superseded` when another run started before this one's
    /// session lookup finished.
    pub async fn before_each(
        &self,
        target_path: &str,
        current_path: &str,
    ) -> Result<Decision, NavigationError> {
        let attempt = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let authenticated = self.is_authenticated().await;

        let latest = self.latest.load(Ordering::SeqCst);
        if latest != attempt {
            tracing::debug!(attempt, latest, to = target_path, "discarding stale guard result");
            return Err(NavigationError::Superseded { attempt, latest });
        }

        let decision = decide(authenticated, target_path);
        tracing::debug!(
            from = current_path,
            to = target_path,
            authenticated,
            ?decision,
            "navigation guard"
        );
        Ok(decision)
    }

    // Fails closed: an unreachable or slow provider is treated like a signed-out user.
    async fn is_authenticated(&self) -> bool {
        let lookup = self.provider.get_session(&self.credentials);
        match tokio::time::timeout(self.session_timeout, lookup).await {
            Ok(Ok(session)) => session.is_authenticated(),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "session lookup failed, treating as signed out");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.session_timeout.as_millis() as u64,
                    "session lookup timed out, treating as signed out"
                );
                false
            }
        }
    }
}
