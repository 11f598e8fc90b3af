//! Caller authentication: OIDC session tokens and the facade service key.

mod api_key;
mod jwks;

pub use api_key::{generate_api_key, ApiKeyVerifier, API_KEY_HEADER};
pub use jwks::{bearer_token, JwksClient};

use travel_common::Principal;

/// Header carrying the third-party (Google) access token of the session.
pub const PROVIDER_TOKEN_HEADER: &str = "x-provider-token";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("JWKS fetch error: {0}")]
    JwksFetchError(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
}

/// Identity of the caller for one request.
///
/// Built from the request headers and passed explicitly to everything that
/// needs to know who is calling.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub principal: Principal,
}

impl SessionContext {
    pub fn account_id(&self) -> &str {
        &self.principal.account_id
    }

    pub fn access_token(&self) -> Option<&str> {
        self.principal.access_token.as_deref()
    }
}

/// Who is calling a facade endpoint.
#[derive(Debug, Clone)]
pub enum Caller {
    /// Holder of the service API key; trusted with every record.
    Service,
    /// A signed-in user.
    Session(SessionContext),
}

impl Caller {
    pub fn session(&self) -> Option<&SessionContext> {
        match self {
            Caller::Service => None,
            Caller::Session(session) => Some(session),
        }
    }
}
