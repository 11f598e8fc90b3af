//! Best-effort profile enrichment for newly seen principals.

mod google;

pub use google::GooglePeopleClient;

use async_trait::async_trait;

/// Why a profile photo could not be fetched. Never fatal to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("No provider access token in session")]
    MissingToken,
    #[error("Profile request failed: {0}")]
    RequestFailed(String),
    #[error("Profile API returned {0}")]
    Status(u16),
    #[error("Malformed profile payload: {0}")]
    Malformed(String),
    #[error("Profile has no photo")]
    NoPhoto,
}

#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Resolve the caller's profile picture URL using their provider token.
    async fn profile_photo(&self, access_token: Option<&str>) -> Result<String, EnrichmentError>;
}
