//! Audit log handler

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user, AppError, AppState, MAX_PAGE_LIMIT};
use mailtally_core::AuditEntry;

const DEFAULT_AUDIT_LIMIT: i64 = 100;

/// `?limit=N&account=ID`
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
    /// Only entries about this account
    pub account: Option<String>,
}

/// GET /api/audit - Recent audit entries, newest first
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
    request: Request,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let user = get_user(request.headers());
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let account = query.account.as_deref().map(str::trim).filter(|a| !a.is_empty());
    let entries = match account {
        Some(account_id) => state.db.list_account_audit_log(account_id, limit)?,
        None => state.db.list_audit_log(limit)?,
    };

    let details = match account {
        Some(account_id) => format!("limit={}, account={}", limit, account_id),
        None => format!("limit={}", limit),
    };
    state
        .db
        .log_audit(&user, "list", Some("audit_log"), None, Some(&details))?;

    Ok(Json(entries))
}
