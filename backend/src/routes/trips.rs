use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use travel_common::{GeneratedTrip, TripCriteria, TripRecord, TripsPage};

use super::{require_session, PageQuery};
use crate::auth::SessionContext;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Longest itinerary accepted.
const MAX_DAYS: u32 = 30;

#[derive(Debug, Serialize)]
pub struct CreatedTrip {
    pub id: String,
}

fn validate(criteria: &TripCriteria) -> ApiResult<()> {
    if criteria.country.trim().is_empty() {
        return Err(ApiError::InvalidRequest("country is required".to_string()));
    }
    if !(1..=MAX_DAYS).contains(&criteria.number_of_days) {
        return Err(ApiError::InvalidRequest(format!(
            "numberOfDays must be between 1 and {}",
            MAX_DAYS
        )));
    }
    Ok(())
}

/// Validate, rate-limit and run one generation for the session's account.
async fn generate_for(
    state: &AppState,
    session: &SessionContext,
    mut criteria: TripCriteria,
) -> ApiResult<GeneratedTrip> {
    validate(&criteria)?;

    let account_id = session.account_id().to_string();
    if state.generate_limiter.check_key(&account_id).is_err() {
        tracing::warn!(account_id = %account_id, "Trip generation rate limited");
        return Err(ApiError::RateLimited);
    }

    criteria.user_id = Some(account_id);
    Ok(state.trip_generator.generate(&criteria).await?)
}

/// POST /api/generate-trip - generate without storing.
async fn generate_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(criteria): Json<TripCriteria>,
) -> ApiResult<Json<GeneratedTrip>> {
    let session = require_session(&state, &headers).await?;
    let generated = generate_for(&state, &session, criteria).await?;
    Ok(Json(generated))
}

/// POST /api/trips - generate and store under the caller's account.
async fn create_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(criteria): Json<TripCriteria>,
) -> ApiResult<Json<CreatedTrip>> {
    let session = require_session(&state, &headers).await?;
    let generated = generate_for(&state, &session, criteria).await?;

    let record = state
        .store
        .insert_trip(session.account_id(), &generated.trip, &generated.image_urls)?;
    tracing::info!(trip_id = %record.id, account_id = session.account_id(), "Trip stored");

    Ok(Json(CreatedTrip { id: record.id }))
}

/// GET /api/trips?limit&offset
async fn list_trips(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> ApiResult<Json<TripsPage>> {
    require_session(&state, &headers).await?;
    Ok(Json(state.store.list_trips(page.limit(), page.offset())?))
}

/// GET /api/trips/:id
async fn get_trip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<TripRecord>> {
    require_session(&state, &headers).await?;
    state
        .store
        .get_trip(&id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("trip {}", id)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/generate-trip", post(generate_trip))
        .route("/api/trips", post(create_trip).get(list_trips))
        .route("/api/trips/:id", get(get_trip))
        .with_state(state)
}
