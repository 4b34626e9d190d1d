//! Blocked category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user, AppError, AppState, SuccessResponse, MAX_BODY_SIZE};
use mailtally_core::models::BlockedCategory;

/// Request body for blocking a category
#[derive(Debug, Deserialize)]
pub struct BlockCategoryRequest {
    pub category: String,
}

/// GET /api/accounts/:id/blocked-categories
pub async fn list_blocked_categories(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Vec<BlockedCategory>>, AppError> {
    let user = get_user(request.headers());

    state.db.require_account(&id)?;
    let blocked = state.db.list_blocked_categories(&id)?;

    state.db.log_audit(
        &user,
        "list",
        Some("blocked_category"),
        Some(&id),
        Some(&format!("count={}", blocked.len())),
    )?;

    Ok(Json(blocked))
}

/// POST /api/accounts/:id/blocked-categories - Block a category (idempotent)
pub async fn block_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<BlockedCategory>, AppError> {
    let user = get_user(request.headers());

    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: BlockCategoryRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    state.db.require_account(&id)?;
    let blocked = state.db.block_category(&id, &req.category)?;

    state.db.log_audit(
        &user,
        "block",
        Some("blocked_category"),
        Some(&id),
        Some(&format!("category={}", blocked.category)),
    )?;

    Ok(Json(blocked))
}

/// DELETE /api/accounts/:id/blocked-categories/:category
pub async fn unblock_category(
    State(state): State<Arc<AppState>>,
    Path((id, category)): Path<(String, String)>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = get_user(request.headers());

    if !state.db.unblock_category(&id, &category)? {
        return Err(AppError::not_found(&format!(
            "category '{}' is not blocked for account {}",
            category, id
        )));
    }

    state.db.log_audit(
        &user,
        "unblock",
        Some("blocked_category"),
        Some(&id),
        Some(&format!("category={}", category)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
