use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::{
    NavigationError,
    guard::{Decision, NavigationGuard},
    history::WebHistory,
};

/// Longest redirect chain a single navigation may follow.
pub const MAX_REDIRECTS: usize = 10;

/// ClientRouter
///
/// Client-side navigation: every transition, history traversal included, goes
/// through the guard before the history changes. A redirect replaces the
/// transition and is itself guarded, so the router only ever lands on a path the
/// guard allowed.
pub struct ClientRouter {
    guard: NavigationGuard,
    history: Mutex<WebHistory>,
}

impl ClientRouter {
    pub fn new(guard: NavigationGuard, history: WebHistory) -> Self {
        Self {
            guard,
            history: Mutex::new(history),
        }
    }

    /// The route the client is currently showing.
    pub fn current(&self) -> String {
        self.history().location().to_string()
    }

    /// Browser URL for `route`, base path included.
    pub fn href(&self, route: &str) -> String {
        self.history().base().href(route)
    }

    pub fn history_len(&self) -> usize {
        self.history().len()
    }

    /// push
    ///
    /// Navigates to `location` and records it as a new history entry. Returns the
    /// route actually reached, which differs from `location` after a redirect.
    pub async fn push(&self, location: &str) -> Result<String, NavigationError> {
        let reached = self.resolve(location).await?;
        self.history().push(reached.clone());
        Ok(reached)
    }

    /// Like `push`, but overwrites the current history entry.
    pub async fn replace(&self, location: &str) -> Result<String, NavigationError> {
        let reached = self.resolve(location).await?;
        self.history().replace(reached.clone());
        Ok(reached)
    }

    pub async fn back(&self) -> Result<String, NavigationError> {
        self.traverse(-1).await
    }

    pub async fn forward(&self) -> Result<String, NavigationError> {
        self.traverse(1).await
    }

    async fn traverse(&self, delta: isize) -> Result<String, NavigationError> {
        let target = self.history().peek(delta)?.to_string();
        let reached = self.resolve(&target).await?;

        let mut history = self.history();
        if reached == target {
            history.go(delta)?;
        } else {
            history.push(reached.clone());
        }
        Ok(reached)
    }

    async fn resolve(&self, location: &str) -> Result<String, NavigationError> {
        let from = self.current();
        let mut target = location.to_string();

        for _ in 0..=MAX_REDIRECTS {
            match self.guard.before_each(&target, &from).await? {
                Decision::Allow => return Ok(target),
                Decision::Redirect(next) => {
                    tracing::debug!(from = %target, to = %next, "navigation redirected");
                    target = next;
                }
            }
        }

        Err(NavigationError::RedirectLoop {
            limit: MAX_REDIRECTS,
        })
    }

    fn history(&self) -> MutexGuard<'_, WebHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
