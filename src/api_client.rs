use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::board::LeadStore;
use crate::errors::AppError;
use crate::models::{leads_from_records, Lead, LeadInput, LeadRecord, LoginRequest, SiteSettings, UserProfile};
use crate::pipeline::PipelineStage;

/// Client for the CRM REST API.
///
/// This is the lead store the board uses on the presentation side: records
/// arrive in snake_case and are converted to typed [`Lead`]s here.
#[derive(Clone)]
pub struct CrmApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl CrmApiClient {
    /// Creates a new `CrmApiClient` for `base_url` (without trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CRM client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-2xx answer into an error and parses the body otherwise.
    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status {
                StatusCode::NOT_FOUND => AppError::NotFound(format!("{}: {}", what, error_text)),
                StatusCode::UNAUTHORIZED => AppError::Unauthorized(error_text),
                StatusCode::BAD_REQUEST => AppError::BadRequest(error_text),
                _ => AppError::ExternalApiError(format!(
                    "CRM API returned {} for {}: {}",
                    status, what, error_text
                )),
            });
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse CRM response for {}: {}", what, e))
        })
    }

    pub async fn fetch_lead_records(&self) -> Result<Vec<LeadRecord>, AppError> {
        let url = self.url("/api/leads");
        tracing::debug!("Fetching leads: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "list leads").await
    }

    pub async fn post_lead(&self, input: &LeadInput) -> Result<LeadRecord, AppError> {
        let url = self.url("/api/leads");
        tracing::info!("Creating lead: {}", input.name);

        let response = self
            .client
            .post(&url)
            .json(input)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "create lead").await
    }

    pub async fn patch_lead_status(
        &self,
        lead_id: &str,
        status: PipelineStage,
    ) -> Result<LeadRecord, AppError> {
        let url = self.url(&format!("/api/leads/{}/status", lead_id));
        tracing::info!("Updating lead {} status to {}", lead_id, status);

        let response = self
            .client
            .patch(&url)
            .json(&json!({ "status": status.label() }))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "update lead status").await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, AppError> {
        let url = self.url("/api/login");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "login").await
    }

    pub async fn get_settings(&self) -> Result<SiteSettings, AppError> {
        let response = self
            .client
            .get(self.url("/api/settings"))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "settings").await
    }

    pub async fn save_settings(&self, settings: &SiteSettings) -> Result<SiteSettings, AppError> {
        let response = self
            .client
            .post(self.url("/api/settings"))
            .json(settings)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        Self::parse(response, "save settings").await
    }
}

#[async_trait]
impl LeadStore for CrmApiClient {
    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        leads_from_records(self.fetch_lead_records().await?)
    }

    async fn create_lead(&self, input: &LeadInput) -> Result<Lead, AppError> {
        Lead::try_from(self.post_lead(input).await?)
    }

    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: PipelineStage,
    ) -> Result<Lead, AppError> {
        Lead::try_from(self.patch_lead_status(lead_id, status).await?)
    }
}
