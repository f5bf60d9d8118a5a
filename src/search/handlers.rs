use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::search::barcode_api::BarcodeApiError;
use crate::search::dto::{FoodHitItem, ManualEntryRequest, NameSearchQuery};
use crate::search::services::ResolvedProduct;
use crate::search::shared_store::{NewSharedProduct, SharedProduct, SharedStoreError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/search/barcode/:code", get(search_barcode))
        .route("/search/foods", get(search_foods))
        .route("/search/manual", post(save_manual_entry))
        .route("/search/products/:id/verify", post(verify_product))
        .route("/search/products/:id/report", post(report_product))
}

#[instrument(skip(state))]
async fn search_barcode(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ResolvedProduct>, (StatusCode, String)> {
    match state.search.search_product_by_barcode(&code).await {
        Ok(Some(product)) => Ok(Json(product)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            "Product not found; enter it manually".into(),
        )),
        Err(BarcodeApiError::InvalidUrl) => {
            warn!(barcode = %code, "rejected malformed barcode");
            Err((StatusCode::BAD_REQUEST, "Invalid barcode".into()))
        }
        Err(e) => {
            error!(error = %e, barcode = %code, "barcode resolution failed");
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

#[instrument(skip(state))]
async fn search_foods(
    State(state): State<AppState>,
    Query(query): Query<NameSearchQuery>,
) -> Json<Vec<FoodHitItem>> {
    let hits = state.search.search_food_by_name(&query.q).await;
    Json(hits.into_iter().map(FoodHitItem::from).collect())
}

#[instrument(skip(state, payload))]
async fn save_manual_entry(
    State(state): State<AppState>,
    Json(payload): Json<ManualEntryRequest>,
) -> Result<(StatusCode, Json<SharedProduct>), (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".into()));
    }
    let product = NewSharedProduct {
        barcode: payload.barcode,
        name: payload.name,
        brand: payload.brand,
        nutrition: payload.nutrition,
        category: payload.category,
        package_size: payload.package_size,
        image_url: payload.image_url,
        description: payload.description,
    };
    match state.search.save_manual_entry(product).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(created))),
        Err(e) => {
            error!(error = %e, "manual entry submit failed");
            Err(store_error(e))
        }
    }
}

#[instrument(skip(state))]
async fn verify_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .search
        .verify_product(&id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

#[instrument(skip(state))]
async fn report_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .search
        .report_product(&id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(store_error)
}

fn store_error(e: SharedStoreError) -> (StatusCode, String) {
    match e {
        SharedStoreError::AlreadyActioned => (StatusCode::CONFLICT, e.to_string()),
        SharedStoreError::ProductNotFound => (StatusCode::NOT_FOUND, e.to_string()),
        SharedStoreError::AuthenticationFailed(_) | SharedStoreError::Network(_) => {
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
