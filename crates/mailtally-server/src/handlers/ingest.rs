//! Pipeline ingestion handler

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::{get_user, AppError, AppState, MAX_BODY_SIZE};
use mailtally_core::FlushReport;

/// Counts from one completed processing run
#[derive(Debug, Deserialize)]
pub struct CategoryCountsRequest {
    pub counts: HashMap<String, u64>,
    /// When the run happened; defaults to now. Decides the tally day (UTC).
    pub timestamp: Option<DateTime<Utc>>,
}

/// POST /api/accounts/:id/category-counts - Record a processing run
///
/// Answers with the flush report. Storage trouble is reported in `failures`
/// and retried on a later flush rather than failing the pipeline. Counts that
/// could never be stored get a 400 and nothing is buffered.
pub async fn record_category_counts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<FlushReport>, AppError> {
    let user = get_user(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: CategoryCountsRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    state.db.require_account(&id)?;

    let timestamp = req.timestamp.unwrap_or_else(Utc::now);
    let categories = req.counts.len();

    // The flush holds the buffer lock across SQLite writes
    let aggregator = state.aggregator.clone();
    let account_id = id.clone();
    let report = tokio::task::spawn_blocking(move || {
        aggregator.record_batch(&account_id, &req.counts, timestamp)
    })
    .await??;

    if !report.is_clean() {
        warn!(
            account_id = %id,
            failures = report.failures.len(),
            "Some category counts were not written"
        );
    }

    // Audit is best-effort here; the counts are already accepted
    if let Err(e) = state.db.log_audit(
        &user,
        "record",
        Some("category_counts"),
        Some(&id),
        Some(&format!(
            "date={}, categories={}, emails={}",
            timestamp.date_naive(),
            categories,
            report.emails_flushed
        )),
    ) {
        warn!(error = %e, "Failed to audit category counts");
    }

    Ok(Json(report))
}
