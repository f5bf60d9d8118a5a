use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::dates::parse_day;
use crate::foods::dto::{
    BatchCreateRequest, CreateFromProductRequest, CreateRecordRequest, DayQuery,
    DayTotalsResponse,
};
use crate::foods::repo::{self, DayRecord, FoodMaster, FoodRecord};
use crate::foods::services::{self, NewFoodRecord};
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods/records", get(list_records))
        .route("/foods/totals", get(day_totals))
        .route("/foods/favorites", get(list_favorites))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/foods/records", post(create_record))
        .route("/foods/records/batch", post(create_records_batch))
        .route("/foods/records/from-product", post(create_record_from_product))
        .route("/foods/records/:id", delete(delete_record))
        .route(
            "/foods/favorites/:master_id",
            post(add_favorite).delete(remove_favorite),
        )
}

#[instrument(skip(state, payload))]
async fn create_record(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<FoodRecord>), (StatusCode, String)> {
    let record = services::save_food_item(
        &state.db,
        payload.name,
        payload.nutrition,
        payload.amount_grams,
        payload.meal_type,
        payload.eaten_at,
        payload.category,
        payload.photo_url,
    )
    .await
    .map_err(bad_save)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state, payload))]
async fn create_records_batch(
    State(state): State<AppState>,
    Json(payload): Json<BatchCreateRequest>,
) -> Result<(StatusCode, Json<Vec<FoodRecord>>), (StatusCode, String)> {
    if payload.entries.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "entries must be non-empty".into()));
    }
    let entries = payload
        .entries
        .into_iter()
        .map(|e| {
            if e.amount_grams <= 0.0 {
                return Err((StatusCode::BAD_REQUEST, "amount must be positive".into()));
            }
            Ok(NewFoodRecord {
                name: e.name,
                nutrition: e.nutrition,
                serving_multiplier: e.amount_grams / 100.0,
                meal_type: e.meal_type,
                eaten_at: e.eaten_at,
                category: e.category,
                photo_url: e.photo_url,
            })
        })
        .collect::<Result<Vec<_>, (StatusCode, String)>>()?;

    let records = services::save_multiple_food_entries(&state.db, entries)
        .await
        .map_err(bad_save)?;
    Ok((StatusCode::CREATED, Json(records)))
}

#[instrument(skip(state, payload))]
async fn create_record_from_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateFromProductRequest>,
) -> Result<(StatusCode, Json<FoodRecord>), (StatusCode, String)> {
    let record = services::save_barcode_product(
        &state.db,
        payload.name,
        payload.brand,
        payload.nutrition,
        payload.amount_grams,
        payload.meal_type,
        payload.eaten_at,
        payload.image_url,
    )
    .await
    .map_err(bad_save)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state))]
async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<DayRecord>>, (StatusCode, String)> {
    let day = parse_day(&query.date).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let records = services::records_for_day(&state.db, day)
        .await
        .map_err(internal)?;
    Ok(Json(records))
}

#[instrument(skip(state))]
async fn day_totals(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DayTotalsResponse>, (StatusCode, String)> {
    let day = parse_day(&query.date).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let records = services::records_for_day(&state.db, day)
        .await
        .map_err(internal)?;
    Ok(Json(DayTotalsResponse {
        date: query.date,
        record_count: records.len(),
        total: services::total_from_records(&records),
    }))
}

#[instrument(skip(state))]
async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_record(&state.db, id).await.map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Record not found".into()))
    }
}

#[instrument(skip(state))]
async fn add_favorite(
    State(state): State<AppState>,
    Path(master_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    match repo::find_master(&state.db, master_id).await.map_err(internal)? {
        Some(_) => {
            repo::insert_favorite(&state.db, master_id)
                .await
                .map_err(internal)?;
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err((StatusCode::NOT_FOUND, "Food not found".into())),
    }
}

#[instrument(skip(state))]
async fn remove_favorite(
    State(state): State<AppState>,
    Path(master_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = repo::delete_favorite(&state.db, master_id)
        .await
        .map_err(internal)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Favorite not found".into()))
    }
}

#[instrument(skip(state))]
async fn list_favorites(
    State(state): State<AppState>,
) -> Result<Json<Vec<FoodMaster>>, (StatusCode, String)> {
    let favorites = repo::list_favorites(&state.db).await.map_err(internal)?;
    Ok(Json(favorites))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn bad_save(e: anyhow::Error) -> (StatusCode, String) {
    // Input checks in the service surface as ensure! messages.
    let msg = e.to_string();
    if msg.contains("must") {
        (StatusCode::BAD_REQUEST, msg)
    } else {
        error!(error = %msg, "save failed");
        (StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}
