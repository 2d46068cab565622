//! Client-side navigation.
//!
//! The single-page client never renders a protected view before the provider has
//! confirmed a session. `guard` holds the decision, `router` applies it to the
//! history kept in `history`.

pub mod guard;
pub mod history;
pub mod router;

pub use guard::{
    AUTH_PATH, DEFAULT_SESSION_TIMEOUT, Decision, HOME_PATH, NavigationGuard, decide,
};
pub use history::{BasePath, WebHistory};
pub use router::ClientRouter;

/// NavigationError
///
/// Reasons a navigation ended without reaching any route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// A newer navigation started while this one waited on the session lookup.
    #[error("navigation attempt {attempt} superseded by attempt {latest}")]
    Superseded { attempt: u64, latest: u64 },
    #[error("navigation exceeded {limit} chained redirects")]
    RedirectLoop { limit: usize },
    #[error("no history entry in that direction")]
    NoHistory,
}
