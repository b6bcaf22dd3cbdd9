mod answers;
mod app;
mod auth;
mod config;
mod error;
mod questions;
mod state;
mod store;
mod users;

#[cfg(test)]
mod testutil;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "quorum=debug,axum=info,tower_http=info".to_string());
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

    if let Some(admin) = app_state.config.admin.clone() {
        match auth::services::ensure_admin(&app_state, &admin).await {
            Ok(Some(user)) => tracing::info!(user_uuid = %user.uuid, "bootstrap admin created"),
            Ok(None) => tracing::debug!(username = %admin.username, "bootstrap admin already present"),
            Err(e) => return Err(anyhow::anyhow!("failed to create bootstrap admin: {e}")),
        }
    }

    app::serve(app::build_app(app_state)).await
}
