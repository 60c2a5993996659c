//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use tracing::warn;

use crate::domain::TrainId;
use crate::planning::{OverrideCommand, PlanningError, StopRef};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trains", get(list_trains))
        .route("/trains/:id", get(train_detail))
        .route(
            "/trains/:id/stops/:index/override",
            put(set_override).delete(clear_override),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// All known trains, in id order.
async fn list_trains(State(state): State<AppState>) -> Json<Vec<TrainSummary>> {
    let planning = state.planning.read().await;
    Json(planning.trains().map(TrainSummary::from_record).collect())
}

/// One train with its full stop list.
async fn train_detail(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<TrainDetail>, AppError> {
    let planning = state.planning.read().await;
    let train = planning
        .train(TrainId(id))
        .ok_or(PlanningError::UnknownTrain(TrainId(id)))?;
    Ok(Json(TrainDetail::from_record(train)))
}

/// Set a dispatcher override and recompute all delays.
async fn set_override(
    State(state): State<AppState>,
    Path((id, index)): Path<(u32, usize)>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<TrainDetail>, AppError> {
    let at = StopRef::new(TrainId(id), index);
    let mut planning = state.planning.write().await;
    planning.set_override(at, OverrideCommand::from(req))?;
    planning.recompute();

    let train = planning
        .train(at.train)
        .ok_or(PlanningError::UnknownTrain(at.train))?;
    Ok(Json(TrainDetail::from_record(train)))
}

/// Remove a dispatcher override and recompute all delays.
async fn clear_override(
    State(state): State<AppState>,
    Path((id, index)): Path<(u32, usize)>,
) -> Result<Json<TrainDetail>, AppError> {
    let at = StopRef::new(TrainId(id), index);
    let mut planning = state.planning.write().await;
    planning.clear_override(at)?;
    planning.recompute();

    let train = planning
        .train(at.train)
        .ok_or(PlanningError::UnknownTrain(at.train))?;
    Ok(Json(TrainDetail::from_record(train)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
}

impl From<PlanningError> for AppError {
    fn from(e: PlanningError) -> Self {
        match e {
            PlanningError::UnknownTrain(_) | PlanningError::StopOutOfRange { .. } => {
                AppError::NotFound {
                    message: e.to_string(),
                }
            }
            PlanningError::UnknownOrigin(_) | PlanningError::SelfReference(_) => {
                AppError::BadRequest {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
        };

        warn!(%status, %message, "request rejected");

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
