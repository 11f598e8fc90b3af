use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use travel_common::AccessDecision;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub route: String,
}

/// GET /api/authorize?route= - run the role gate for a page navigation.
///
/// Never fails: a missing or invalid session is simply "no record", which
/// the gate turns into a redirect to sign-in.
async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AuthorizeQuery>,
) -> Json<AccessDecision> {
    let record = match state.jwks_client.authenticate(&headers).await {
        Ok(session) => state.reconciler.reconcile(&session).await,
        Err(e) => {
            tracing::debug!("Gate check without session: {}", e);
            None
        }
    };

    let access = state.config.gate.authorize(&query.route, record.as_ref());
    tracing::debug!(route = %query.route, allowed = access.is_allowed(), "Gate decision");
    Json(access.into())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/authorize", get(authorize))
        .with_state(state)
}
