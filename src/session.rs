use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session
///
/// What the identity provider reports about the caller. `data` is `None` when the
/// provider answered with `null` (no session at all).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub data: Option<SessionData>,
}

/// SessionData
///
/// Body of the provider's session endpoint: the signed-in user and the session record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub session: Option<SessionInfo>,
}

/// UserRef
///
/// The provider's user record. `role` is an additional field configured on the
/// provider and may be absent for older accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session with no data, as returned for anonymous callers.
    pub fn anonymous() -> Self {
        Self { data: None }
    }

    /// A session carrying `user` and no session record.
    pub fn for_user(user: UserRef) -> Self {
        Self {
            data: Some(SessionData {
                user: Some(user),
                session: None,
            }),
        }
    }

    pub fn user(&self) -> Option<&UserRef> {
        self.data.as_ref().and_then(|data| data.user.as_ref())
    }

    /// is_authenticated
    ///
    /// The only classification the navigation layer makes: a user is present or not.
    /// Expiry and role are the provider's business.
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}
