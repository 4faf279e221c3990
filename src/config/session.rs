use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials saved by the admin login flow.
///
/// Field names follow the keys the web console keeps in browser storage, so a
/// session can be pasted across unchanged.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Session {
    #[serde(rename = "authToken", default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "agencyId", default)]
    pub agency_id: Option<AgencyId>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AgencyId {
    Number(i64),
    Text(String),
}

impl fmt::Display for AgencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgencyId::Number(n) => write!(f, "{n}"),
            AgencyId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Session {
    /// First non-empty of `authToken`, `token`, `user.token`.
    pub fn bearer_token(&self) -> Option<&str> {
        let user_token = self.user.as_ref().and_then(|u| u.token.as_deref());
        [self.auth_token.as_deref(), self.token.as_deref(), user_token]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
    }

    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.role.as_deref())
    }

    /// Sessions without a role are treated as admin; the backend still
    /// enforces its own checks.
    pub fn is_admin(&self) -> bool {
        self.role().map_or(true, |r| r.eq_ignore_ascii_case("admin"))
    }
}
