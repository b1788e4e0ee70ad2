use utoipa::OpenApi;

use crate::handlers;
use crate::models::{
    DashboardResponse, DashboardStats, LeadInput, LeadRecord, LoginRequest, SiteSettings,
    StatusUpdateRequest, UserProfile,
};
use crate::pipeline::{CertificateType, PipelineStage};

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "CertSync CRM API", description = "Leads, pipeline and site settings"),
    paths(
        handlers::login,
        handlers::list_leads,
        handlers::create_lead,
        handlers::get_lead,
        handlers::update_lead,
        handlers::update_lead_status,
        handlers::list_renewals,
        handlers::dashboard,
        handlers::get_settings,
        handlers::save_settings,
    ),
    components(schemas(
        LeadRecord,
        LeadInput,
        StatusUpdateRequest,
        LoginRequest,
        UserProfile,
        SiteSettings,
        DashboardStats,
        DashboardResponse,
        PipelineStage,
        CertificateType,
    )),
    tags(
        (name = "auth", description = "Back office login"),
        (name = "leads", description = "Lead capture and pipeline"),
        (name = "dashboard", description = "Funnel overview"),
        (name = "settings", description = "Landing page settings")
    )
)]
pub struct ApiDoc;
