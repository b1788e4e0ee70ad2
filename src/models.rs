use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::{CertificateType, PipelineStage};

// ============ Database Models ============

/// A row of the `leads` table, exchanged verbatim (snake_case) over the REST API.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct LeadRecord {
    /// Unique identifier of the lead.
    pub id: Uuid,
    /// Person or company name.
    pub name: String,
    /// CPF or CNPJ, formatted.
    pub document: Option<String>,
    /// "A1", "A3" or "Nuvem". Legacy rows may hold other values.
    pub certificate_type: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Where the lead came from (e.g. "Landing Page", "Google Ads").
    pub origin: Option<String>,
    /// Pipeline stage display label.
    pub status: String,
    /// Certificate expiration date.
    pub expiration_date: Option<NaiveDate>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Represents a CRM user allowed into the back office.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Site-wide settings used by the landing page (singleton row, id = 1).
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct SiteSettings {
    pub logo_url: Option<String>,
    pub icon_url: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    /// JSON-LD markup injected into the landing page head.
    pub schema_markup: Option<String>,
    /// Meta pixel snippet.
    pub pixel_code: Option<String>,
    pub google_tag: Option<String>,
    pub google_analytics: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_address: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ============ Domain Models ============

/// A lead as the CRM works with it: typed stage and certificate type.
///
/// Converted from [`LeadRecord`] at the API boundary; serialized in camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub document: Option<String>,
    pub certificate_type: Option<CertificateType>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub origin: Option<String>,
    pub status: PipelineStage,
    pub expiration_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Copy of this lead placed in another stage.
    pub fn with_status(&self, status: PipelineStage) -> Lead {
        Lead {
            status,
            ..self.clone()
        }
    }
}

impl TryFrom<LeadRecord> for Lead {
    type Error = AppError;

    fn try_from(record: LeadRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse::<PipelineStage>().map_err(|e| {
            AppError::InternalError(format!("lead {} has invalid status: {}", record.id, e))
        })?;

        let certificate_type = match record.certificate_type.as_deref() {
            None => None,
            Some(raw) => match raw.parse::<CertificateType>() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::debug!("Ignoring certificate type of lead {}: {}", record.id, e);
                    None
                }
            },
        };

        Ok(Lead {
            id: record.id.to_string(),
            name: record.name,
            document: record.document,
            certificate_type,
            phone: record.phone,
            email: record.email,
            origin: record.origin,
            status,
            expiration_date: record.expiration_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Converts a batch of records, failing on the first record with an invalid status.
pub fn leads_from_records(records: Vec<LeadRecord>) -> Result<Vec<Lead>, AppError> {
    records.into_iter().map(Lead::try_from).collect()
}

// ============ API Request/Response Models ============

/// Body of `POST /api/leads` and `PUT /api/leads/:id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LeadInput {
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub certificate_type: Option<CertificateType>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    /// Defaults to "Novo Lead" when omitted (landing page submissions).
    #[serde(default)]
    pub status: Option<PipelineStage>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

/// Body of `PATCH /api/leads/:id/status`.
///
/// The status stays a plain string here so an unknown label becomes a 400
/// with a readable message instead of a JSON rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Query parameters for `GET /api/leads`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadQueryParams {
    /// Stage label to filter by, or "all".
    pub status: Option<String>,
    /// Search text matched against name, document and email.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of a logged-in user (never includes the password).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            role: user.role,
        }
    }
}

/// Funnel counters shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_leads: usize,
    pub pending_docs: usize,
    pub scheduled: usize,
    pub issued: usize,
    /// Issued certificates expiring inside the renewal window.
    pub renewals_soon: usize,
}

/// Response of `GET /api/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub recent_leads: Vec<LeadRecord>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn lead(id: &str, status: PipelineStage) -> Lead {
        Lead {
            id: id.to_string(),
            name: format!("Lead {}", id),
            document: None,
            certificate_type: Some(CertificateType::A1),
            phone: None,
            email: None,
            origin: Some("Google Ads".to_string()),
            status,
            expiration_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(status: &str, certificate_type: Option<&str>) -> LeadRecord {
        serde_json::from_value(json!({
            "id": "6f1c2f5e-9b7a-4c1e-9f51-2d2c8f1e0a11",
            "name": "João Silva Tech ME",
            "document": "12.345.678/0001-90",
            "certificate_type": certificate_type,
            "phone": "(11) 98888-7777",
            "email": "contato@joaosilva.com.br",
            "origin": "Google Ads",
            "status": status,
            "expiration_date": "2025-05-20",
            "created_at": "2024-03-01T10:00:00Z",
            "updated_at": null
        }))
        .unwrap()
    }

    #[test]
    fn test_record_maps_to_typed_lead() {
        let lead = Lead::try_from(record("Aguardando Documentação", Some("A1"))).unwrap();

        assert_eq!(lead.id, "6f1c2f5e-9b7a-4c1e-9f51-2d2c8f1e0a11");
        assert_eq!(lead.status, PipelineStage::WaitingDocs);
        assert_eq!(lead.certificate_type, Some(CertificateType::A1));
        assert_eq!(
            lead.expiration_date,
            NaiveDate::from_ymd_opt(2025, 5, 20)
        );
    }

    #[test]
    fn test_legacy_certificate_type_reads_as_absent() {
        let lead = Lead::try_from(record("Novo Lead", Some("OUTRO"))).unwrap();
        assert_eq!(lead.certificate_type, None);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = Lead::try_from(record("Arquivado", None));
        assert!(matches!(result, Err(AppError::InternalError(_))));
    }

    #[test]
    fn test_lead_serializes_camel_case() {
        let lead = Lead::try_from(record("Agendado", Some("Nuvem"))).unwrap();
        let value = serde_json::to_value(&lead).unwrap();

        assert_eq!(value["certificateType"], "Nuvem");
        assert_eq!(value["expirationDate"], "2025-05-20");
        assert_eq!(value["status"], "Agendado");
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_lead_input_defaults_optional_fields() {
        let input: LeadInput = serde_json::from_value(json!({
            "name": "Maria",
            "email": "maria@example.com",
            "phone": "11987654321",
            "origin": "Landing Page"
        }))
        .unwrap();

        assert_eq!(input.status, None);
        assert_eq!(input.certificate_type, None);
        assert_eq!(input.origin.as_deref(), Some("Landing Page"));
    }
}
