//! Recommendation and category statistics handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{get_user, AppError, AppState};
use mailtally_core::models::{AggregatedTally, RecommendationReason, RecommendationResult};
use mailtally_core::DEFAULT_WINDOW_DAYS;

/// Query parameters for windowed endpoints
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Kept as text so malformed values get the same JSON error as out-of-range ones
    pub days: Option<String>,
}

impl WindowQuery {
    fn days(&self, max_days: u32) -> Result<u32, AppError> {
        let Some(raw) = self.days.as_deref() else {
            return Ok(DEFAULT_WINDOW_DAYS.min(max_days));
        };

        let out_of_range = || {
            AppError::validation(&format!(
                "days must be between 1 and {}, got {}",
                max_days, raw
            ))
        };

        let days: i64 = raw.trim().parse().map_err(|_| out_of_range())?;
        match u32::try_from(days) {
            Ok(d) if (1..=max_days).contains(&d) => Ok(d),
            _ => Err(out_of_range()),
        }
    }
}

/// GET /api/accounts/:id/recommendations - Blocking recommendations
pub async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WindowQuery>,
    request: Request,
) -> Result<Json<RecommendationResult>, AppError> {
    let user = get_user(request.headers());
    let days = params.days(state.recommendation_config().max_window_days)?;

    state.db.require_account(&id)?;
    let result = state.recommendations.get_recommendations(&id, days)?;

    // Audit log - read access
    state.db.log_audit(
        &user,
        "recommendations",
        Some("account"),
        Some(&id),
        Some(&format!(
            "days={}, recommended={}",
            days,
            result.recommendations.len()
        )),
    )?;

    Ok(Json(result))
}

/// GET /api/accounts/:id/recommendations/:category/details - Why a category is recommended
pub async fn get_recommendation_details(
    State(state): State<Arc<AppState>>,
    Path((id, category)): Path<(String, String)>,
    Query(params): Query<WindowQuery>,
    request: Request,
) -> Result<Json<RecommendationReason>, AppError> {
    let user = get_user(request.headers());
    let days = params.days(state.recommendation_config().max_window_days)?;

    state.db.require_account(&id)?;
    let reason = state
        .recommendations
        .get_recommendation_reasons(&id, &category, days)?;

    state.db.log_audit(
        &user,
        "recommendation_details",
        Some("account"),
        Some(&id),
        Some(&format!("category={}, days={}", category, days)),
    )?;

    Ok(Json(reason))
}

/// GET /api/accounts/:id/category-stats - Raw aggregate, no recommendation logic
pub async fn get_category_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WindowQuery>,
    request: Request,
) -> Result<Json<AggregatedTally>, AppError> {
    let user = get_user(request.headers());
    let days = params.days(state.recommendation_config().max_window_days)?;

    state.db.require_account(&id)?;
    let stats = state.recommendations.get_category_stats(&id, days)?;

    state.db.log_audit(
        &user,
        "category_stats",
        Some("account"),
        Some(&id),
        Some(&format!("days={}", days)),
    )?;

    Ok(Json(stats))
}
