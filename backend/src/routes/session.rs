use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use serde::Serialize;
use travel_common::{UserRecord, UserStatus};

use super::require_session;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// `null` while the caller is not yet reconciled.
    pub user: Option<UserRecord>,
    pub status: Option<UserStatus>,
}

/// GET /api/session - reconcile the caller and return their record.
async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionResponse>> {
    let session = require_session(&state, &headers).await?;
    let user = state.reconciler.reconcile(&session).await;

    Ok(Json(SessionResponse {
        status: user.as_ref().map(|u| u.status),
        user,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/session", get(session))
        .with_state(state)
}
