//! Liveness handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Emails buffered in the aggregator and not yet written
    pub pending_events: u64,
}

/// GET /api/health - Database reachability and buffer depth
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    // A pooled connection proves the database is reachable and unlocked
    state.db.conn()?;

    Ok(Json(HealthResponse {
        status: "ok",
        pending_events: state.aggregator.pending_events(),
    }))
}
