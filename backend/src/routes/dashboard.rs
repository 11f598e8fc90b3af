//! Admin API, guarded by the role gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use travel_common::Access;

use crate::dashboard::{load_dashboard, Dashboard};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Middleware that runs the role gate against the caller's current record.
///
/// The record is re-read on every request, so a promotion (or its absence)
/// takes effect immediately.
async fn require_admin(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let session = match state.jwks_client.authenticate(request.headers()).await {
        Ok(session) => session,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let record = match state.directory.find_user(session.account_id()).await {
        Ok(record) => record,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let Some(record) = record else {
        return ApiError::Unauthorized("no directory record for this account".to_string())
            .into_response();
    };

    match state.config.gate.authorize(request.uri().path(), Some(&record)) {
        Access::Allow => next.run(request).await,
        Access::RedirectTo(_) => {
            tracing::debug!(account_id = session.account_id(), "Admin route refused");
            ApiError::Forbidden("admin access required".to_string()).into_response()
        }
    }
}

/// GET /api/dashboard
async fn dashboard(State(state): State<Arc<AppState>>) -> ApiResult<Json<Dashboard>> {
    let dashboard = load_dashboard(state.directory.as_ref(), &state.store, Utc::now()).await?;
    Ok(Json(dashboard))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/dashboard", get(dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}
