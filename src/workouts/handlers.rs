use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::dates::{day_bounds, parse_day};
use crate::state::AppState;
use crate::workouts::repo::{self, WorkoutEntry};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/workouts", post(create_workout).get(list_workouts))
        .route("/workouts/:id", delete(delete_workout))
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkoutRequest {
    pub exercise: String,
    pub sets: i32,
    pub reps: i32,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub performed_at: OffsetDateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    /// YYYY-MM-DD
    pub date: String,
}

#[instrument(skip(state, payload))]
async fn create_workout(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutEntry>), (StatusCode, String)> {
    if payload.exercise.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "exercise must not be empty".into()));
    }
    if payload.sets < 1 || payload.reps < 1 {
        return Err((StatusCode::BAD_REQUEST, "sets and reps must be at least 1".into()));
    }
    if payload.weight_kg.is_some_and(|w| w < 0.0) {
        return Err((StatusCode::BAD_REQUEST, "weight must not be negative".into()));
    }

    let entry = WorkoutEntry {
        id: Uuid::new_v4(),
        exercise: payload.exercise,
        sets: payload.sets,
        reps: payload.reps,
        weight_kg: payload.weight_kg,
        performed_at: payload.performed_at,
        notes: payload.notes,
        created_at: OffsetDateTime::now_utc(),
    };
    repo::insert(&state.db, &entry).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
async fn list_workouts(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<WorkoutEntry>>, (StatusCode, String)> {
    let day = parse_day(&query.date).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let (from, to) = day_bounds(day);
    let entries = repo::list_between(&state.db, from, to)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}

#[instrument(skip(state))]
async fn delete_workout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete(&state.db, id).await.map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Workout not found".into()))
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
