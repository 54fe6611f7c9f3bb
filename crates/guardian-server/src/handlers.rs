//! API route handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use guardian_core::{ModerationRequest, ModerationResponse};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// POST /v1/moderations - Moderate one piece of content.
///
/// The body is decoded by hand so malformed JSON gets the same
/// `{error, code}` body as every other API error.
pub async fn moderate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ModerationResponse>> {
    let req: ModerationRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    debug!(
        request_id = %req.request_id,
        tenant = %req.tenant_id,
        mode = ?req.response_mode,
        "Received moderation request"
    );

    let outcome = tokio::time::timeout(state.request_timeout, state.pipeline.moderate(&req))
        .await
        .map_err(|_| {
            let timeout_ms = state.request_timeout.as_millis() as u64;
            warn!(request_id = %req.request_id, timeout_ms, "Moderation timed out");
            ApiError::Timeout(timeout_ms)
        })??;

    Ok(Json(outcome.response))
}

/// GET /health - Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
