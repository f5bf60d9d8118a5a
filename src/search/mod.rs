pub mod barcode_api;
pub mod dataset;
mod dto;
pub mod handlers;
pub mod services;
pub mod shared_store;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
