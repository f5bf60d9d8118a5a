use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::body::dto::{DailyCaloriesRequest, RangeQuery, SaveBodyRequest};
use crate::body::repo::{self, BodyComposition, DailyCalories};
use crate::body::services::{self, NewBodyComposition};
use crate::dates::{day_bounds, parse_day};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/body", post(save_body).get(list_body))
        .route("/body/latest", get(latest_body))
        .route(
            "/body/daily-calories",
            post(upsert_daily_calories).get(list_daily_calories),
        )
}

#[instrument(skip(state, payload))]
async fn save_body(
    State(state): State<AppState>,
    Json(payload): Json<SaveBodyRequest>,
) -> Result<(StatusCode, Json<BodyComposition>), (StatusCode, String)> {
    let input = NewBodyComposition {
        recorded_at: payload.recorded_at,
        height_cm: payload.height_cm,
        weight_kg: payload.weight_kg,
        age: payload.age,
        gender: payload.gender,
        body_fat_pct: payload.body_fat_pct,
        muscle_mass_kg: payload.muscle_mass_kg,
        basal_metabolic_rate: payload.basal_metabolic_rate,
        activity_level: payload.activity_level,
    };
    if let Err(msg) = services::validate(&input) {
        return Err((StatusCode::BAD_REQUEST, msg));
    }
    let row = services::save_body_composition(&state.db, input)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
async fn list_body(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<BodyComposition>>, (StatusCode, String)> {
    let from = parse_day(&query.from).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let to = parse_day(&query.to).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let (start, _) = day_bounds(from);
    let (_, end) = day_bounds(to);
    let rows = repo::list_between(&state.db, start, end)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn latest_body(
    State(state): State<AppState>,
) -> Result<Json<BodyComposition>, (StatusCode, String)> {
    match repo::latest(&state.db).await.map_err(internal)? {
        Some(row) => Ok(Json(row)),
        None => Err((StatusCode::NOT_FOUND, "No body composition yet".into())),
    }
}

#[instrument(skip(state, payload))]
async fn upsert_daily_calories(
    State(state): State<AppState>,
    Json(payload): Json<DailyCaloriesRequest>,
) -> Result<Json<DailyCalories>, (StatusCode, String)> {
    let day = parse_day(&payload.date).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if payload.consumed < 0.0 || payload.burned < 0.0 {
        return Err((StatusCode::BAD_REQUEST, "calories must not be negative".into()));
    }
    let row = repo::upsert_daily_calories(&state.db, day, payload.consumed, payload.burned)
        .await
        .map_err(internal)?;
    Ok(Json(row))
}

#[instrument(skip(state))]
async fn list_daily_calories(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DailyCalories>>, (StatusCode, String)> {
    let from = parse_day(&query.from).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let to = parse_day(&query.to).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let rows = repo::list_daily_calories(&state.db, from, to)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
