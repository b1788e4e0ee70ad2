use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState};
use crate::openapi::ApiDoc;

/// REST endpoints under `/api`, without state or middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/login", post(handlers::login))
        .route(
            "/api/leads",
            get(handlers::list_leads).post(handlers::create_lead),
        )
        .route(
            "/api/leads/:id",
            get(handlers::get_lead).put(handlers::update_lead),
        )
        .route(
            "/api/leads/:id/status",
            patch(handlers::update_lead_status),
        )
        .route("/api/renewals", get(handlers::list_renewals))
        .route("/api/dashboard", get(handlers::dashboard))
        .route(
            "/api/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        )
}

/// Health check and API documentation (not rate limited).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
