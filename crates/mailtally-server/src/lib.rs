//! Mailtally Web Server
//!
//! Axum-based REST API over the category statistics engine.
//!
//! - Pipeline ingestion of per-run category counts
//! - Blocking recommendations, their explanations and raw category stats
//! - Account and blocked-category management
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses
//! - Graceful shutdown that flushes buffered counts

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use mailtally_core::{
    BlockingRecommendationService, CategoryAggregator, Database, RecommendationConfig,
};

mod handlers;
mod scheduler;

pub use scheduler::{start_retention_scheduler, RetentionScheduleConfig};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Maximum accepted request body (ingestion batches included)
pub const MAX_BODY_SIZE: usize = 256 * 1024;

/// Header set by an authenticating reverse proxy, used for audit attribution
const FORWARDED_USER_HEADER: &str = "x-forwarded-user";

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Process-wide aggregator shared by every ingestion request
    pub aggregator: Arc<CategoryAggregator>,
    pub recommendations: BlockingRecommendationService,
    pub config: ServerConfig,
}

impl AppState {
    /// Wire the engine around one database and one resolved config
    pub fn new(db: Database, recommendation: RecommendationConfig, config: ServerConfig) -> Self {
        let store = Arc::new(db.clone());
        let recommendation = Arc::new(recommendation);

        Self {
            aggregator: Arc::new(CategoryAggregator::new(store.clone(), recommendation.clone())),
            recommendations: BlockingRecommendationService::new(
                store.clone(),
                store,
                recommendation,
            ),
            db,
            config,
        }
    }

    pub fn recommendation_config(&self) -> &RecommendationConfig {
        self.recommendations.config()
    }
}

/// Who made the request (for audit logging)
/// Returns the proxy-supplied user, or "anonymous"
pub fn get_user(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(FORWARDED_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account).delete(handlers::delete_account),
        )
        // Pipeline ingestion
        .route(
            "/accounts/:id/category-counts",
            post(handlers::record_category_counts),
        )
        // Statistics and recommendations
        .route(
            "/accounts/:id/recommendations",
            get(handlers::get_recommendations),
        )
        .route(
            "/accounts/:id/recommendations/:category/details",
            get(handlers::get_recommendation_details),
        )
        .route(
            "/accounts/:id/category-stats",
            get(handlers::get_category_stats),
        )
        // Blocked categories
        .route(
            "/accounts/:id/blocked-categories",
            get(handlers::list_blocked_categories).post(handlers::block_category),
        )
        .route(
            "/accounts/:id/blocked-categories/:category",
            delete(handlers::unblock_category),
        )
        // Audit
        .route("/audit", get(handlers::list_audit_log));

    let cors_methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if state.config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(cors_methods)
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(cors_methods)
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server with default server settings
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    recommendation: RecommendationConfig,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, recommendation, ServerConfig::default()).await
}

/// Start the server with custom configuration
///
/// Runs until Ctrl+C or SIGTERM, then flushes buffered counts before returning.
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    recommendation: RecommendationConfig,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(db.clone(), recommendation, config));

    match RetentionScheduleConfig::from_env() {
        Some(schedule) => {
            start_retention_scheduler(
                db,
                Arc::new(state.recommendation_config().clone()),
                schedule,
            );
        }
        None => info!("Retention scheduler disabled"),
    }

    let app = create_router(state.clone());
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let report = state.aggregator.flush();
    if report.is_clean() {
        info!(keys = report.keys_flushed, "Flushed buffered tallies on shutdown");
    } else {
        warn!(
            lost_keys = report.failures.len(),
            "Some buffered tallies could not be written before shutdown"
        );
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
///
/// Body shape: `{"error": <kind>, "message": <text>}`
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn validation(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation_error",
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal_error",
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.kind,
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Caller mistakes keep their message; everything else is sanitized
        if let Some(core) = err.downcast_ref::<mailtally_core::Error>() {
            match core {
                mailtally_core::Error::Validation(msg) => return Self::validation(msg),
                mailtally_core::Error::NotFound(msg) => return Self::not_found(msg),
                _ => {}
            }
        }

        Self {
            // Return generic message to client, keep full error for logging
            internal: Some(err),
            ..Self::internal("An internal error occurred")
        }
    }
}
