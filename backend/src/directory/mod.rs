//! User directory: one record per principal.
//!
//! Two backends implement [`Directory`]: the local SQLite store and an HTTP
//! client for another instance's facade.

mod http;
mod sqlite;

pub use http::HttpDirectory;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use travel_common::{NewUser, UserRecord, UserStatus, UsersPage};

/// Page size used when walking the whole directory.
const SCAN_PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Directory unreachable: {0}")]
    Upstream(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for DirectoryError {
    fn from(err: rusqlite::Error) -> Self {
        DirectoryError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        DirectoryError::Upstream(err.to_string())
    }
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Backend name reported by `/health`.
    fn backend(&self) -> &'static str;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), DirectoryError>;

    /// Look up the record for an account.
    async fn find_user(&self, account_id: &str) -> Result<Option<UserRecord>, DirectoryError>;

    /// Store a new record unless one already exists for the account.
    ///
    /// Returns the stored record either way, so two racing callers both get
    /// the single winning record.
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, DirectoryError>;

    /// Set `status = admin`. Idempotent; `NotFound` if the account has no record.
    async fn promote(&self, account_id: &str) -> Result<UserRecord, DirectoryError>;

    async fn user_status(&self, account_id: &str) -> Result<UserStatus, DirectoryError> {
        self.find_user(account_id)
            .await?
            .map(|user| user.status)
            .ok_or_else(|| DirectoryError::NotFound(account_id.to_string()))
    }

    /// Newest records first.
    async fn list_users(&self, limit: u32, offset: u32) -> Result<UsersPage, DirectoryError>;

    /// Every record, newest first.
    async fn all_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let mut users = Vec::new();
        loop {
            let page = self.list_users(SCAN_PAGE_SIZE, users.len() as u32).await?;
            let fetched = page.users.len();
            users.extend(page.users);
            if fetched < SCAN_PAGE_SIZE as usize || users.len() as u64 >= page.total {
                return Ok(users);
            }
        }
    }
}
