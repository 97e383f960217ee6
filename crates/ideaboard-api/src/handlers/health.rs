use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use crate::state::AppState;

/// Liveness plus a database round trip when a pool is configured.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, database) = match &state.pool {
        None => (StatusCode::OK, "not_configured"),
        Some(pool) => match ideaboard_db::ping(pool).await {
            Ok(()) => (StatusCode::OK, "ok"),
            Err(e) => {
                warn!(subsystem = "api", error = %e, "Health check: database unreachable");
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
        },
    };

    (
        status,
        Json(serde_json::json!({
            "status": if status.is_success() { "healthy" } else { "degraded" },
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
