use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::board::LeadStore;
use crate::errors::{AppError, ResultExt};
use crate::models::{leads_from_records, Lead, LeadInput, LeadRecord, SiteSettings, User};
use crate::pipeline::PipelineStage;
use crate::reports::MAX_RENEWAL_WINDOW_DAYS;
use crate::validation::normalize_lead_input;

/// Origin recorded when a submission does not name one.
pub const DEFAULT_ORIGIN: &str = "Landing Page";

fn parse_lead_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id.trim()).map_err(|_| lead_not_found())
}

fn lead_not_found() -> AppError {
    AppError::NotFound("Lead não encontrado".to_string())
}

/// Escapes LIKE wildcards so search text matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Filter for lead listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<PipelineStage>,
    /// Case-insensitive match on name, email or document.
    pub search: Option<String>,
}

/// Access to the `leads` table.
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Leads matching `filter`, newest first.
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<LeadRecord>, AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);

        sqlx::query_as::<_, LeadRecord>(
            r#"
            SELECT * FROM leads
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR document ILIKE $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status.map(PipelineStage::label))
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .context("listing leads")
    }

    /// Issued leads whose certificate expires within `window_days` (or already expired).
    pub async fn list_renewals(&self, window_days: u64) -> Result<Vec<LeadRecord>, AppError> {
        // bounded so CURRENT_DATE + window stays a valid date
        let window = window_days.min(MAX_RENEWAL_WINDOW_DAYS) as i32;

        sqlx::query_as::<_, LeadRecord>(
            r#"
            SELECT * FROM leads
            WHERE status = $1
              AND expiration_date IS NOT NULL
              AND expiration_date <= CURRENT_DATE + $2::int
            ORDER BY expiration_date ASC
            "#,
        )
        .bind(PipelineStage::Issued.label())
        .bind(window)
        .fetch_all(&self.pool)
        .await
        .context("listing renewals")
    }

    pub async fn get(&self, id: &str) -> Result<LeadRecord, AppError> {
        let id = parse_lead_id(id)?;
        sqlx::query_as::<_, LeadRecord>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(lead_not_found)
    }

    /// Inserts a lead. Status defaults to "Novo Lead", origin to "Landing Page".
    pub async fn create(&self, input: LeadInput) -> Result<LeadRecord, AppError> {
        let input = normalize_lead_input(input)?;

        let record = sqlx::query_as::<_, LeadRecord>(
            r#"
            INSERT INTO leads (name, document, certificate_type, phone, email, origin, status, expiration_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.document)
        .bind(input.certificate_type.map(|t| t.label()))
        .bind(&input.phone)
        .bind(&input.email)
        .bind(input.origin.as_deref().unwrap_or(DEFAULT_ORIGIN))
        .bind(input.status.unwrap_or(PipelineStage::New).label())
        .bind(input.expiration_date)
        .fetch_one(&self.pool)
        .await
        .context("creating lead")?;

        tracing::info!("Lead {} created ({})", record.id, record.status);
        Ok(record)
    }

    /// Full-record edit. An omitted status keeps the current one.
    pub async fn update(&self, id: &str, input: LeadInput) -> Result<LeadRecord, AppError> {
        let id = parse_lead_id(id)?;
        let input = normalize_lead_input(input)?;

        sqlx::query_as::<_, LeadRecord>(
            r#"
            UPDATE leads
            SET name = $1, document = $2, certificate_type = $3, phone = $4, email = $5,
                origin = $6, status = COALESCE($7, status), expiration_date = $8,
                updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.document)
        .bind(input.certificate_type.map(|t| t.label()))
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.origin)
        .bind(input.status.map(PipelineStage::label))
        .bind(input.expiration_date)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("updating lead")?
        .ok_or_else(lead_not_found)
    }

    /// Status-only transition used by the Kanban board.
    pub async fn update_status(
        &self,
        id: &str,
        status: PipelineStage,
    ) -> Result<LeadRecord, AppError> {
        let id = parse_lead_id(id)?;

        let record = sqlx::query_as::<_, LeadRecord>(
            "UPDATE leads SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status.label())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("updating lead status")?
        .ok_or_else(lead_not_found)?;

        tracing::info!("Lead {} moved to {}", record.id, status);
        Ok(record)
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        leads_from_records(self.list(&LeadFilter::default()).await?)
    }

    async fn create_lead(&self, input: &LeadInput) -> Result<Lead, AppError> {
        Lead::try_from(self.create(input.clone()).await?)
    }

    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: PipelineStage,
    ) -> Result<Lead, AppError> {
        Lead::try_from(self.update_status(lead_id, status).await?)
    }
}

/// Access to the `users` table.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role, created_at FROM users WHERE username = $1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await
        .context("looking up user")
    }
}

/// Access to the singleton `system_settings` row.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<SiteSettings>, AppError> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            SELECT logo_url, icon_url, meta_title, meta_description, schema_markup,
                   pixel_code, google_tag, google_analytics, client_email,
                   client_phone, client_address, updated_at
            FROM system_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .context("loading settings")
    }

    /// Writes all fields, creating the row if it does not exist yet.
    pub async fn save(&self, settings: &SiteSettings) -> Result<SiteSettings, AppError> {
        sqlx::query_as::<_, SiteSettings>(
            r#"
            INSERT INTO system_settings (
                id, logo_url, icon_url, meta_title, meta_description, schema_markup,
                pixel_code, google_tag, google_analytics, client_email, client_phone,
                client_address, updated_at
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            ON CONFLICT (id) DO UPDATE SET
                logo_url = EXCLUDED.logo_url,
                icon_url = EXCLUDED.icon_url,
                meta_title = EXCLUDED.meta_title,
                meta_description = EXCLUDED.meta_description,
                schema_markup = EXCLUDED.schema_markup,
                pixel_code = EXCLUDED.pixel_code,
                google_tag = EXCLUDED.google_tag,
                google_analytics = EXCLUDED.google_analytics,
                client_email = EXCLUDED.client_email,
                client_phone = EXCLUDED.client_phone,
                client_address = EXCLUDED.client_address,
                updated_at = NOW()
            RETURNING logo_url, icon_url, meta_title, meta_description, schema_markup,
                      pixel_code, google_tag, google_analytics, client_email,
                      client_phone, client_address, updated_at
            "#,
        )
        .bind(&settings.logo_url)
        .bind(&settings.icon_url)
        .bind(&settings.meta_title)
        .bind(&settings.meta_description)
        .bind(&settings.schema_markup)
        .bind(&settings.pixel_code)
        .bind(&settings.google_tag)
        .bind(&settings.google_analytics)
        .bind(&settings.client_email)
        .bind(&settings.client_phone)
        .bind(&settings.client_address)
        .fetch_one(&self.pool)
        .await
        .context("saving settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("maria"), "%maria%");
        assert_eq!(like_pattern(" 100%_off "), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_invalid_lead_id_is_not_found() {
        let err = parse_lead_id("not-a-uuid").unwrap_err();
        assert!(err.is_not_found());
        assert!(parse_lead_id("6f1c2f5e-9b7a-4c1e-9f51-2d2c8f1e0a11").is_ok());
    }
}
