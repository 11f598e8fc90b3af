pub mod authorize;
pub mod dashboard;
pub mod health;
pub mod session;
pub mod trips;
pub mod users;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Router;
use serde::Deserialize;
use travel_common::UserStatus;

use crate::auth::{Caller, SessionContext};
use crate::directory::DirectoryError;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Every route the backend serves.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(session::router(state.clone()))
        .merge(authorize::router(state.clone()))
        .merge(trips::router(state.clone()))
        .merge(dashboard::router(state))
}

/// `?limit=&offset=` query, clamped to sane bounds.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

/// Require a valid session token.
pub(crate) async fn require_session(state: &AppState, headers: &HeaderMap) -> ApiResult<SessionContext> {
    Ok(state.jwks_client.authenticate(headers).await?)
}

/// Identify a facade caller: service key first, then session token.
pub(crate) async fn require_caller(state: &AppState, headers: &HeaderMap) -> ApiResult<Caller> {
    if state.api_keys.verify(headers) {
        return Ok(Caller::Service);
    }
    Ok(Caller::Session(require_session(state, headers).await?))
}

/// Whether the session's own directory record is currently `admin`.
///
/// Read fresh from the directory on every call.
pub(crate) async fn session_is_admin(state: &AppState, session: &SessionContext) -> ApiResult<bool> {
    match state.directory.user_status(session.account_id()).await {
        Ok(status) => Ok(status == UserStatus::Admin),
        Err(DirectoryError::NotFound(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Service key holders and admins pass; everyone else is forbidden.
pub(crate) async fn require_admin_caller(state: &AppState, caller: &Caller) -> ApiResult<()> {
    let Caller::Session(session) = caller else {
        return Ok(());
    };
    if session_is_admin(state, session).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("admin access required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 20, 0)]
    #[case(Some(5000), Some(40), 100, 40)]
    #[case(Some(0), None, 1, 0)]
    #[case(Some(7), Some(3), 7, 3)]
    fn test_page_query_bounds(
        #[case] limit: Option<u32>,
        #[case] offset: Option<u32>,
        #[case] expected_limit: u32,
        #[case] expected_offset: u32,
    ) {
        let query = PageQuery { limit, offset };
        assert_eq!(query.limit(), expected_limit);
        assert_eq!(query.offset(), expected_offset);
    }
}
