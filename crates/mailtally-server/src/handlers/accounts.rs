//! Account management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user, AppError, AppState, SuccessResponse, MAX_BODY_SIZE};
use mailtally_core::models::Account;

/// Request body for creating an account
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// GET /api/accounts - List all accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Account>>, AppError> {
    let user = get_user(request.headers());

    let accounts = state.db.list_accounts()?;

    // Audit log - read access
    state.db.log_audit(
        &user,
        "list",
        Some("account"),
        None,
        Some(&format!("count={}", accounts.len())),
    )?;

    Ok(Json(accounts))
}

/// POST /api/accounts - Register an account (idempotent)
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Account>, AppError> {
    let user = get_user(request.headers());

    // Extract JSON body
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let req: CreateAccountRequest =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let account = state.db.create_account(
        &req.id,
        req.email.as_deref(),
        req.display_name.as_deref(),
    )?;

    // Audit log
    state.db.log_audit(
        &user,
        "create",
        Some("account"),
        Some(&account.id),
        None,
    )?;

    Ok(Json(account))
}

/// GET /api/accounts/:id - Get one account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Account>, AppError> {
    let user = get_user(request.headers());

    let account = state.db.require_account(&id)?;

    state
        .db
        .log_audit(&user, "view", Some("account"), Some(&id), None)?;

    Ok(Json(account))
}

/// DELETE /api/accounts/:id - Delete an account with its tallies and blocks
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = get_user(request.headers());

    if !state.db.delete_account(&id)? {
        return Err(AppError::not_found(&format!("account {}", id)));
    }

    state
        .db
        .log_audit(&user, "delete", Some("account"), Some(&id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
