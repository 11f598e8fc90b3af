//! Role gate: decides whether a caller may enter a route.
//!
//! The gate is a pure function of the route and the caller's directory
//! record. Callers must evaluate it on every entry into a protected route,
//! since `status` can change between visits.

use serde::{Deserialize, Serialize};

use crate::user::{UserRecord, UserStatus};

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectTo(String),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }
}

/// Wire form of [`Access`]: `{"allow":true}` or `{"allow":false,"redirectTo":"/trips"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub allow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl From<Access> for AccessDecision {
    fn from(access: Access) -> Self {
        match access {
            Access::Allow => Self { allow: true, redirect_to: None },
            Access::RedirectTo(path) => Self { allow: false, redirect_to: Some(path) },
        }
    }
}

/// Which routes ordinary users may visit and where rejected callers go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoutePolicy {
    /// Where callers without a record are sent.
    #[serde(default = "default_sign_in")]
    pub sign_in: String,
    /// Where ordinary users are sent when they hit a restricted route.
    #[serde(default = "default_landing")]
    pub landing: String,
    /// Routes open to `user` status. `/` matches only the root; any other
    /// entry also covers its sub-paths.
    #[serde(default = "default_ordinary")]
    pub ordinary: Vec<String>,
}

fn default_sign_in() -> String {
    "/sign-in".to_string()
}
fn default_landing() -> String {
    "/trips".to_string()
}
fn default_ordinary() -> Vec<String> {
    vec!["/".to_string(), "/trips".to_string()]
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            sign_in: default_sign_in(),
            landing: default_landing(),
            ordinary: default_ordinary(),
        }
    }
}

impl RoutePolicy {
    /// Decide whether the holder of `record` may enter `route`.
    pub fn authorize(&self, route: &str, record: Option<&UserRecord>) -> Access {
        let Some(record) = record else {
            return Access::RedirectTo(self.sign_in.clone());
        };

        match record.status {
            UserStatus::Admin => Access::Allow,
            UserStatus::User if self.is_ordinary(route) => Access::Allow,
            UserStatus::User => Access::RedirectTo(self.landing.clone()),
        }
    }

    /// Whether `route` is one of the routes open to every signed-in user.
    pub fn is_ordinary(&self, route: &str) -> bool {
        let path = normalize(route);
        self.ordinary.iter().any(|allowed| {
            let allowed = normalize(allowed);
            if allowed == "/" {
                return path == "/";
            }
            path == allowed
                || path
                    .strip_prefix(allowed)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Drop query/fragment and trailing slashes; the root stays `/`.
fn normalize(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    let path = route[..end].trim_end_matches('/');
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
