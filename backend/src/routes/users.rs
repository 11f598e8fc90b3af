//! Directory facade: `/api/user*` and `/api/users`.
//!
//! Callers present either the service key (`X-Api-Key`) or a session
//! token. Sessions may read and create their own record; anything touching
//! another account needs a directory record that is already `admin`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, patch, post},
    Json, Router,
};
use travel_common::{NewUser, StatusResponse, UserRecord, UsersPage};

use super::{require_admin_caller, require_caller, session_is_admin, PageQuery};
use crate::auth::Caller;
use crate::config::PromotionPolicy;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Reading a record: the service, the account itself, or an admin.
async fn authorize_read(state: &AppState, caller: &Caller, account_id: &str) -> ApiResult<()> {
    match caller {
        Caller::Session(session) if session.account_id() == account_id => Ok(()),
        _ => require_admin_caller(state, caller).await,
    }
}

/// Promotion: the service, an admin, or self-promotion where policy allows it.
async fn authorize_promotion(state: &AppState, caller: &Caller, account_id: &str) -> ApiResult<()> {
    let Caller::Session(session) = caller else {
        return Ok(());
    };

    let promotion = &state.config.promotion;
    let own_account = session.account_id() == account_id;
    let self_service = promotion.policy == PromotionPolicy::SelfService
        || promotion.bootstrap_admins.iter().any(|a| a == account_id);

    if own_account && self_service {
        return Ok(());
    }
    if session_is_admin(state, session).await? {
        return Ok(());
    }

    tracing::warn!(
        caller = session.account_id(),
        target = account_id,
        "Promotion refused"
    );
    Err(ApiError::Forbidden("not allowed to promote this account".to_string()))
}

/// GET /api/user/:account_id
async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    let caller = require_caller(&state, &headers).await?;
    authorize_read(&state, &caller, &account_id).await?;

    state
        .directory
        .find_user(&account_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("user {}", account_id)))
}

/// POST /api/user - create unless present; returns the stored record.
async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new_user): Json<NewUser>,
) -> ApiResult<Json<UserRecord>> {
    let caller = require_caller(&state, &headers).await?;
    let new_user = match &caller {
        Caller::Service => new_user,
        Caller::Session(session) if session.account_id() != new_user.account_id => {
            return Err(ApiError::Forbidden(
                "sessions may only create their own record".to_string(),
            ));
        }
        // Identity fields come from the token; only the photo is caller-supplied.
        Caller::Session(session) => NewUser::from_principal(&session.principal, new_user.image_url),
    };
    if new_user.account_id.trim().is_empty() {
        return Err(ApiError::InvalidRequest("accountId must not be empty".to_string()));
    }

    let user = state.directory.create_user(new_user).await?;
    Ok(Json(user))
}

/// PATCH /api/user/:account_id/admin
async fn promote_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    let caller = require_caller(&state, &headers).await?;
    authorize_promotion(&state, &caller, &account_id).await?;

    let user = state.directory.promote(&account_id).await?;
    tracing::info!(account_id = %account_id, "Account promoted to admin");
    Ok(Json(user))
}

/// GET /api/user/:account_id/status
async fn user_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let caller = require_caller(&state, &headers).await?;
    authorize_read(&state, &caller, &account_id).await?;

    let status = state.directory.user_status(&account_id).await?;
    Ok(Json(StatusResponse { status }))
}

/// GET /api/users?limit&offset
async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<UsersPage>> {
    let caller = require_caller(&state, &headers).await?;
    require_admin_caller(&state, &caller).await?;

    let users = state.directory.list_users(page.limit(), page.offset()).await?;
    Ok(Json(users))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/user", post(create_user))
        .route("/api/user/:account_id", get(get_user))
        .route("/api/user/:account_id/admin", patch(promote_user))
        .route("/api/user/:account_id/status", get(user_status))
        .route("/api/users", get(list_users))
        .with_state(state)
}
