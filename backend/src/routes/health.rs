//! `/health` and `/metrics`, both reflecting whether the user directory answers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::directory::Directory;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the directory cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    /// Active directory backend: `sqlite` or `remote`.
    pub directory: &'static str,
}

impl HealthResponse {
    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Ping the directory and summarise the result.
pub async fn check(directory: &dyn Directory) -> HealthResponse {
    let status = match directory.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(backend = directory.backend(), "Directory health check failed: {}", e);
            "degraded"
        }
    };
    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        directory: directory.backend(),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let report = check(state.directory.as_ref()).await;
    let code = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

fn render_metrics(report: &HealthResponse, limited_accounts: usize) -> String {
    format!(
        "# HELP travel_planner_directory_up Whether the user directory answered its last ping\n\
         # TYPE travel_planner_directory_up gauge\n\
         travel_planner_directory_up{{backend=\"{}\"}} {}\n\
         # HELP travel_planner_generate_limiter_accounts Accounts tracked by the trip generation limiter\n\
         # TYPE travel_planner_generate_limiter_accounts gauge\n\
         travel_planner_generate_limiter_accounts {}\n\
         # HELP travel_planner_info Service information\n\
         # TYPE travel_planner_info gauge\n\
         travel_planner_info{{version=\"{}\"}} 1\n",
        report.directory,
        u8::from(report.is_ok()),
        limited_accounts,
        report.version,
    )
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let report = check(state.directory.as_ref()).await;
    let body = render_metrics(&report, state.generate_limiter.len());
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}
