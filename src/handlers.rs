use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db_storage::{LeadFilter, LeadRepository, SettingsRepository, UserRepository};
use crate::errors::AppError;
use crate::models::*;
use crate::pipeline::PipelineStage;
use crate::reports::{compute_stats, RECENT_LEADS_LIMIT};

/// Key of the single entry in [`AppState::settings_cache`].
pub const SETTINGS_CACHE_KEY: &str = "site";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    pub leads: LeadRepository,
    pub users: UserRepository,
    pub settings: SettingsRepository,
    /// Site settings are read on every landing page view; cached here and
    /// invalidated when saved. `None` caches the absence of the row.
    pub settings_cache: Cache<&'static str, Option<SiteSettings>>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let settings_cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.settings_cache_ttl_secs))
            .max_capacity(1)
            .build();

        Self {
            leads: LeadRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            settings: SettingsRepository::new(db),
            config,
            settings_cache,
        }
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "certsync-crm",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserProfile),
        (status = 401, description = "Wrong username or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserProfile>, AppError> {
    tracing::info!("POST /login - username: {}", request.username);

    let user = state
        .users
        .find_by_username(&request.username)
        .await?
        .filter(|user| constant_time_compare(&user.password, &request.password))
        .ok_or_else(|| {
            AppError::Unauthorized(format!("invalid credentials for '{}'", request.username))
        })?;

    Ok(Json(UserProfile::from(user)))
}

/// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    params(LeadQueryParams),
    responses(
        (status = 200, description = "Leads, newest first", body = [LeadRecord]),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "leads"
)]
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadQueryParams>,
) -> Result<Json<Vec<LeadRecord>>, AppError> {
    tracing::debug!("GET /leads - params: {:?}", params);

    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(label) => Some(
            label
                .parse::<PipelineStage>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };

    let filter = LeadFilter {
        status,
        search: params.q,
    };
    let leads = state.leads.list(&filter).await?;

    Ok(Json(leads))
}

/// POST /api/leads
///
/// Used by both the CRM form and the landing page capture form.
#[utoipa::path(
    post,
    path = "/api/leads",
    request_body = LeadInput,
    responses(
        (status = 200, description = "Created lead", body = LeadRecord),
        (status = 400, description = "Invalid field")
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(input): Json<LeadInput>,
) -> Result<Json<LeadRecord>, AppError> {
    tracing::info!("POST /leads - origin: {:?}", input.origin);

    let lead = state.leads.create(input).await?;
    Ok(Json(lead))
}

/// GET /api/leads/:id
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead", body = LeadRecord),
        (status = 404, description = "Unknown lead")
    ),
    tag = "leads"
)]
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeadRecord>, AppError> {
    Ok(Json(state.leads.get(&id).await?))
}

/// PUT /api/leads/:id
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    params(("id" = String, Path, description = "Lead id")),
    request_body = LeadInput,
    responses(
        (status = 200, description = "Updated lead", body = LeadRecord),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Unknown lead")
    ),
    tag = "leads"
)]
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<LeadInput>,
) -> Result<Json<LeadRecord>, AppError> {
    tracing::info!("PUT /leads/{}", id);

    Ok(Json(state.leads.update(&id, input).await?))
}

/// PATCH /api/leads/:id/status
///
/// Status-only transition issued by the Kanban board.
#[utoipa::path(
    patch,
    path = "/api/leads/{id}/status",
    params(("id" = String, Path, description = "Lead id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated lead", body = LeadRecord),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Unknown lead")
    ),
    tag = "leads"
)]
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<LeadRecord>, AppError> {
    tracing::info!("PATCH /leads/{}/status - {}", id, request.status);

    let status = request
        .status
        .parse::<PipelineStage>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(state.leads.update_status(&id, status).await?))
}

/// GET /api/renewals
#[utoipa::path(
    get,
    path = "/api/renewals",
    responses((status = 200, description = "Issued leads due for renewal", body = [LeadRecord])),
    tag = "leads"
)]
pub async fn list_renewals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LeadRecord>>, AppError> {
    let leads = state
        .leads
        .list_renewals(state.config.renewal_window_days)
        .await?;
    tracing::debug!("GET /renewals - {} lead(s) due", leads.len());

    Ok(Json(leads))
}

/// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Funnel counters and recent leads", body = DashboardResponse)),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, AppError> {
    let records = state.leads.list(&LeadFilter::default()).await?;
    let leads = leads_from_records(records.clone())?;

    let stats = compute_stats(
        &leads,
        Utc::now().date_naive(),
        state.config.renewal_window_days,
    );
    // records are already newest first
    let recent_leads = records.into_iter().take(RECENT_LEADS_LIMIT).collect();

    Ok(Json(DashboardResponse {
        stats,
        recent_leads,
    }))
}

/// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "Site settings, or an empty object if never saved", body = SiteSettings)),
    tag = "settings"
)]
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(cached) = state.settings_cache.get(SETTINGS_CACHE_KEY).await {
        tracing::debug!("Settings served from cache");
        return Ok(Json(settings_body(cached.as_ref())));
    }

    let settings = state.settings.get().await?;
    state
        .settings_cache
        .insert(SETTINGS_CACHE_KEY, settings.clone())
        .await;

    Ok(Json(settings_body(settings.as_ref())))
}

/// The saved row, or an empty object before settings were ever saved.
fn settings_body(settings: Option<&SiteSettings>) -> serde_json::Value {
    match settings {
        Some(settings) => json!(settings),
        None => json!({}),
    }
}

/// POST /api/settings
#[utoipa::path(
    post,
    path = "/api/settings",
    request_body = SiteSettings,
    responses((status = 200, description = "Saved settings", body = SiteSettings)),
    tag = "settings"
)]
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, AppError> {
    tracing::info!("POST /settings");

    let saved = state.settings.save(&settings).await?;
    state.settings_cache.invalidate(SETTINGS_CACHE_KEY).await;

    Ok(Json(saved))
}
