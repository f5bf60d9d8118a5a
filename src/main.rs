mod app;
mod body;
mod config;
mod dates;
mod foods;
mod nutrition;
mod search;
mod state;
mod workouts;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nutritrack=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    // One-shot backfill: older builds stored body snapshots at arbitrary
    // times of day. No-op once the table is clean.
    match body::services::normalize_recorded_dates(&app_state.db).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(rows = n, "body composition dates normalized"),
        Err(e) => tracing::warn!(error = %e, "date normalization pass failed"),
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
