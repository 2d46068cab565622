use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use gatehouse::{
    MockIdentityProvider, Session, UserRef,
    client::{
        AUTH_PATH, BasePath, ClientRouter, DEFAULT_SESSION_TIMEOUT, Decision, HOME_PATH,
        NavigationError, NavigationGuard, WebHistory, decide, router::MAX_REDIRECTS,
    },
    provider::{IdentityProvider, ProviderError, ProviderState},
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

// --- Test Providers ---

/// Answers session lookups from a script, cycling through `sessions` by call
/// number. With `hold_first`, the first lookup blocks until `release` is called.
struct ScriptedProvider {
    sessions: Vec<Session>,
    hold_first: bool,
    gate: Notify,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            hold_first: false,
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn holding_first(sessions: Vec<Session>) -> Self {
        Self {
            hold_first: true,
            ..Self::new(sessions)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn handle(&self, _request: Request) -> Response {
        StatusCode::NOT_IMPLEMENTED.into_response()
    }

    async fn get_session(&self, _credentials: &HeaderMap) -> Result<Session, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 && self.hold_first {
            self.gate.notified().await;
        }
        Ok(self.sessions[call % self.sessions.len()].clone())
    }
}

/// Never answers within any reasonable time.
struct HangingProvider;

#[async_trait]
impl IdentityProvider for HangingProvider {
    async fn handle(&self, _request: Request) -> Response {
        StatusCode::NOT_IMPLEMENTED.into_response()
    }

    async fn get_session(&self, _credentials: &HeaderMap) -> Result<Session, ProviderError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(signed_in())
    }
}

// --- Helpers ---

fn signed_in() -> Session {
    Session::for_user(UserRef {
        id: "u_1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        ..UserRef::default()
    })
}

fn guard_for(session: Session) -> NavigationGuard {
    NavigationGuard::new(Arc::new(MockIdentityProvider::with_session(session)))
}

fn router_at(provider: ProviderState, base: &str, initial: &str) -> ClientRouter {
    ClientRouter::new(
        NavigationGuard::new(provider),
        WebHistory::new(BasePath::new(base), initial),
    )
}

fn redirect(path: &str) -> Decision {
    Decision::Redirect(path.to_string())
}

// --- Decision Table ---

#[test]
fn test_decision_table_is_exhaustive() {
    let cases = [
        (false, "/dashboard", redirect(AUTH_PATH)),
        (false, AUTH_PATH, Decision::Allow),
        (true, AUTH_PATH, redirect(HOME_PATH)),
        (true, "/dashboard", Decision::Allow),
    ];

    for (authenticated, target, expected) in cases {
        assert_eq!(
            decide(authenticated, target),
            expected,
            "authenticated={authenticated} target={target}"
        );
    }
}

#[test]
fn test_decision_ignores_query_and_fragment() {
    assert_eq!(decide(false, "/auth?redirect=%2Fdashboard"), Decision::Allow);
    assert_eq!(decide(true, "/auth#sign-up"), redirect("/"));
    assert_eq!(decide(false, "/dashboard?tab=1"), redirect("/auth"));
}

#[test]
fn test_only_exact_auth_path_is_public() {
    // Anything else, even a lookalike, needs a session.
    assert_eq!(decide(false, "/auth/reset"), redirect("/auth"));
    assert_eq!(decide(false, "/authx"), redirect("/auth"));
    assert_eq!(decide(false, "/"), redirect("/auth"));
}

// --- Navigation Guard ---

#[tokio::test]
async fn test_unauthenticated_dashboard_redirects_to_auth() {
    let guard = guard_for(Session::anonymous());

    let decision = guard.before_each("/dashboard", "/").await.unwrap();
    assert_eq!(decision, redirect("/auth"));
}

#[tokio::test]
async fn test_authenticated_auth_redirects_home() {
    let guard = guard_for(signed_in());

    let decision = guard.before_each("/auth", "/dashboard").await.unwrap();
    assert_eq!(decision, redirect("/"));
}

#[tokio::test]
async fn test_allowed_transitions() {
    assert_eq!(
        guard_for(Session::anonymous())
            .before_each("/auth", "/")
            .await
            .unwrap(),
        Decision::Allow
    );
    assert_eq!(
        guard_for(signed_in())
            .before_each("/dashboard", "/auth")
            .await
            .unwrap(),
        Decision::Allow
    );
}

#[tokio::test]
async fn test_session_without_user_is_unauthenticated() {
    let session = Session {
        data: Some(Default::default()),
    };
    let guard = guard_for(session);

    assert_eq!(
        guard.before_each("/dashboard", "/").await.unwrap(),
        redirect("/auth")
    );
}

#[tokio::test]
async fn test_guard_is_idempotent() {
    for session in [Session::anonymous(), signed_in()] {
        let guard = guard_for(session);
        for target in ["/auth", "/dashboard"] {
            let first = guard.before_each(target, "/").await;
            let second = guard.before_each(target, "/").await;
            assert_eq!(first, second);
        }
    }
}

#[tokio::test]
async fn test_session_is_fetched_on_every_navigation() {
    let provider = Arc::new(ScriptedProvider::new(vec![signed_in()]));
    let guard = NavigationGuard::new(provider.clone());

    for _ in 0..3 {
        guard.before_each("/dashboard", "/").await.unwrap();
    }
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_session_change_is_seen_immediately() {
    let provider = Arc::new(ScriptedProvider::new(vec![signed_in(), Session::anonymous()]));
    let guard = NavigationGuard::new(provider);

    assert_eq!(guard.before_each("/dashboard", "/").await.unwrap(), Decision::Allow);
    assert_eq!(
        guard.before_each("/dashboard", "/").await.unwrap(),
        redirect("/auth")
    );
}

#[tokio::test]
async fn test_provider_failure_fails_closed() {
    let guard = NavigationGuard::new(Arc::new(MockIdentityProvider::new_failing()));

    assert_eq!(
        guard.before_each("/dashboard", "/").await.unwrap(),
        redirect("/auth")
    );
    assert_eq!(guard.before_each("/auth", "/").await.unwrap(), Decision::Allow);
}

#[test]
fn test_session_timeout_defaults_and_overrides() {
    let guard = guard_for(Session::anonymous());
    assert_eq!(guard.session_timeout(), DEFAULT_SESSION_TIMEOUT);
    assert_eq!(DEFAULT_SESSION_TIMEOUT, Duration::from_secs(30));

    let guard = guard.with_session_timeout(Duration::from_secs(2));
    assert_eq!(guard.session_timeout(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_session_timeout_fails_closed() {
    let guard = NavigationGuard::new(Arc::new(HangingProvider))
        .with_session_timeout(Duration::from_millis(50));

    assert_eq!(
        guard.before_each("/dashboard", "/").await.unwrap(),
        redirect("/auth")
    );
}

#[tokio::test]
async fn test_stale_guard_result_is_discarded() {
    let provider = Arc::new(ScriptedProvider::holding_first(vec![Session::anonymous()]));
    let guard = Arc::new(NavigationGuard::new(provider.clone()));

    // First navigation suspends inside its session lookup.
    let first = tokio::spawn({
        let guard = guard.clone();
        async move { guard.before_each("/dashboard", "/").await }
    });
    while provider.calls() < 1 {
        tokio::task::yield_now().await;
    }

    // A second navigation starts and finishes while the first is still waiting.
    let second = guard.before_each("/auth", "/").await;
    assert_eq!(second, Ok(Decision::Allow));

    provider.release();
    let first = first.await.unwrap();
    assert_eq!(
        first,
        Err(NavigationError::Superseded {
            attempt: 1,
            latest: 2
        })
    );
}

// --- Client Router ---

#[tokio::test]
async fn test_router_sends_anonymous_user_to_auth() {
    let provider = Arc::new(ScriptedProvider::new(vec![Session::anonymous()]));
    let router = router_at(provider.clone(), "/", "/");

    let reached = router.push("/dashboard").await.unwrap();
    assert_eq!(reached, "/auth");
    assert_eq!(router.current(), "/auth");
    assert_eq!(router.history_len(), 2);
    // One run for /dashboard, one for the redirect target.
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_router_sends_signed_in_user_home() {
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/",
        "/dashboard",
    );

    assert_eq!(router.push("/auth").await.unwrap(), "/");
    assert_eq!(router.current(), "/");
    assert_eq!(router.push("/settings?tab=profile").await.unwrap(), "/settings?tab=profile");
}

#[tokio::test]
async fn test_router_replace_overwrites_current_entry() {
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/",
        "/",
    );

    router.replace("/dashboard").await.unwrap();
    assert_eq!(router.current(), "/dashboard");
    assert_eq!(router.history_len(), 1);
}

#[tokio::test]
async fn test_router_guards_history_traversal() {
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/",
        "/",
    );
    router.push("/projects").await.unwrap();
    router.push("/projects/42").await.unwrap();

    assert_eq!(router.back().await.unwrap(), "/projects");
    assert_eq!(router.current(), "/projects");
    assert_eq!(router.forward().await.unwrap(), "/projects/42");
    assert_eq!(router.history_len(), 3);
    assert_eq!(router.forward().await, Err(NavigationError::NoHistory));
}

#[tokio::test]
async fn test_router_back_to_auth_when_signed_in_is_redirected() {
    // Signed in after visiting the login view: going back must not show it again.
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/",
        "/auth",
    );
    router.push("/dashboard").await.unwrap();

    assert_eq!(router.back().await.unwrap(), "/");
    assert_eq!(router.current(), "/");
}

#[tokio::test]
async fn test_router_back_at_start_has_no_history() {
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/",
        "/",
    );

    assert_eq!(router.back().await, Err(NavigationError::NoHistory));
}

#[tokio::test]
async fn test_router_stops_redirect_loops() {
    // A session that flips on every lookup bounces between "/" and "/auth" forever.
    let provider = Arc::new(ScriptedProvider::new(vec![signed_in(), Session::anonymous()]));
    let router = router_at(provider.clone(), "/", "/dashboard");

    let result = router.push("/auth").await;
    assert_eq!(
        result,
        Err(NavigationError::RedirectLoop {
            limit: MAX_REDIRECTS
        })
    );
    assert_eq!(router.current(), "/dashboard");
    assert_eq!(provider.calls(), MAX_REDIRECTS + 1);
}

#[tokio::test]
async fn test_router_strips_base_path() {
    let router = router_at(
        Arc::new(MockIdentityProvider::with_session(signed_in())),
        "/portal/",
        "/portal/dashboard",
    );

    assert_eq!(router.current(), "/dashboard");
    assert_eq!(router.href("/auth"), "/portal/auth");
}

// --- Base Path ---

#[test]
fn test_base_path_normalisation() {
    assert_eq!(BasePath::new("").as_str(), "");
    assert_eq!(BasePath::new("/").as_str(), "");
    assert_eq!(BasePath::new("portal").as_str(), "/portal");
    assert_eq!(BasePath::new("/portal/").as_str(), "/portal");
}

#[test]
fn test_base_path_strip_and_href() {
    let base = BasePath::new("/portal");

    assert_eq!(base.strip("/portal/dashboard"), "/dashboard");
    assert_eq!(base.strip("/portal"), "/");
    assert_eq!(base.strip("/PORTAL/auth"), "/auth");
    assert_eq!(base.strip("/elsewhere"), "/elsewhere");
    assert_eq!(base.href("/auth"), "/portal/auth");

    let root = BasePath::new("/");
    assert_eq!(root.strip("/dashboard"), "/dashboard");
    assert_eq!(root.href("/dashboard"), "/dashboard");
}

#[test]
fn test_build_time_base_path_is_normalised() {
    let base = BasePath::from_build_env();
    let raw = base.as_str();

    assert!(raw.is_empty() || (raw.starts_with('/') && !raw.ends_with('/')), "{raw}");
}
