//! User directory types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role flag carried by every directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    User,
    Admin,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::User => "user",
            UserStatus::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserStatus::Admin)
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserStatus::User),
            "admin" => Ok(UserStatus::Admin),
            other => Err(format!("unknown user status: {}", other)),
        }
    }
}

/// Authenticated identity taken from the identity provider session.
///
/// Independent of any directory record; the access token is the third-party
/// (Google) token, used only for profile enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: String,
    pub email: String,
    pub name: String,
    pub access_token: Option<String>,
}

/// One directory record per principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub account_id: String,
    pub email: String,
    pub name: String,
    pub image_url: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub status: UserStatus,
}

impl UserRecord {
    /// Fresh record for a principal seen for the first time.
    pub fn new(new_user: NewUser, joined_at: DateTime<Utc>) -> Self {
        Self {
            account_id: new_user.account_id,
            email: new_user.email,
            name: new_user.name,
            image_url: new_user.image_url,
            joined_at,
            status: UserStatus::User,
        }
    }
}

/// Body of `POST /api/user`. `joinedAt` and `status` are always set server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub account_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewUser {
    pub fn from_principal(principal: &Principal, image_url: Option<String>) -> Self {
        Self {
            account_id: principal.account_id.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            image_url,
        }
    }
}

/// Response of `GET /api/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<UserRecord>,
    pub total: u64,
}

/// Response of `GET /api/user/:accountId/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: UserStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> UserRecord {
        UserRecord {
            account_id: "acc-1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            image_url: None,
            joined_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
            status: UserStatus::User,
        }
    }

    #[test]
    fn test_record_json_uses_camel_case_fields() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["accountId"], "acc-1");
        assert_eq!(json["status"], "user");
        assert!(json["imageUrl"].is_null());
        assert_eq!(json["joinedAt"], "2025-05-01T12:00:00Z");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("admin".parse::<UserStatus>(), Ok(UserStatus::Admin));
        assert_eq!("user".parse::<UserStatus>(), Ok(UserStatus::User));
        assert!("Admin".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_status_default_is_user() {
        assert_eq!(UserStatus::default(), UserStatus::User);
        assert!(!UserStatus::User.is_admin());
        assert!(UserStatus::Admin.is_admin());
    }

    #[test]
    fn test_new_record_starts_as_user() {
        let principal = Principal {
            account_id: "acc-2".to_string(),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            access_token: Some("ya29.token".to_string()),
        };
        let joined = Utc::now();
        let rec = UserRecord::new(
            NewUser::from_principal(&principal, Some("https://img/bob.png".to_string())),
            joined,
        );
        assert_eq!(rec.status, UserStatus::User);
        assert_eq!(rec.joined_at, joined);
        assert_eq!(rec.image_url.as_deref(), Some("https://img/bob.png"));
    }

    #[test]
    fn test_new_user_image_url_optional() {
        let body: NewUser =
            serde_json::from_str(r#"{"accountId":"a","email":"e","name":"n"}"#).unwrap();
        assert!(body.image_url.is_none());
    }
}
