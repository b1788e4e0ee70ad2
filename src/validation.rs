//! Input validation for lead capture and edit forms.

use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::sync::OnceLock;

use crate::errors::AppError;
use crate::models::LeadInput;

/// Brazilian taxpayer document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Individual, 11 digits.
    Cpf,
    /// Company, 14 digits.
    Cnpj,
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("email regex is valid")
    })
}

fn document_regex() -> &'static Regex {
    static DOCUMENT: OnceLock<Regex> = OnceLock::new();
    DOCUMENT.get_or_init(|| {
        // Digits with the usual CPF/CNPJ punctuation, nothing else.
        Regex::new(r"^[0-9./\- ]+$").expect("document regex is valid")
    })
}

/// Validate email address format (local@domain.tld).
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() < 5 {
        return false;
    }
    email_regex().is_match(email)
}

/// Validate and normalize Brazilian phone number
///
/// Returns: (is_valid, normalized_phone_or_error_msg). The normalized form is E.164.
pub fn validate_br_phone(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::BR), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid BR phone: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::debug!("Invalid BR phone number: {}", raw);
                (false, "Invalid Brazilian phone number".to_string())
            }
        }
        Err(e) => {
            tracing::debug!("Failed to parse BR phone '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

/// Detects whether `raw` is a CPF or CNPJ, formatted or digits-only.
///
/// Only the shape is checked; verification digits are not.
pub fn document_kind(raw: &str) -> Option<DocumentKind> {
    if !document_regex().is_match(raw.trim()) {
        return None;
    }
    match raw.chars().filter(char::is_ascii_digit).count() {
        11 => Some(DocumentKind::Cpf),
        14 => Some(DocumentKind::Cnpj),
        _ => None,
    }
}

/// Formats a document as `###.###.###-##` (CPF) or `##.###.###/####-##` (CNPJ).
pub fn format_document(raw: &str) -> Option<String> {
    let kind = document_kind(raw)?;
    let d: String = raw.chars().filter(char::is_ascii_digit).collect();
    let formatted = match kind {
        DocumentKind::Cpf => format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11]),
        DocumentKind::Cnpj => format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        ),
    };
    Some(formatted)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Cleans and validates a lead form submission.
///
/// Blank optional fields become `None`, the email is lowercased and the
/// document is stored in its formatted form. The phone is kept as typed.
pub fn normalize_lead_input(input: LeadInput) -> Result<LeadInput, AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Nome é obrigatório".to_string()));
    }

    let document = match non_blank(input.document) {
        None => None,
        Some(raw) => Some(format_document(&raw).ok_or_else(|| {
            AppError::BadRequest(format!("Documento inválido (CPF ou CNPJ): {}", raw))
        })?),
    };

    let email = match non_blank(input.email) {
        None => None,
        Some(raw) if is_valid_email(&raw) => Some(raw.to_lowercase()),
        Some(raw) => return Err(AppError::BadRequest(format!("E-mail inválido: {}", raw))),
    };

    let phone = match non_blank(input.phone) {
        None => None,
        Some(raw) => {
            let (valid, _) = validate_br_phone(&raw);
            if !valid {
                return Err(AppError::BadRequest(format!("Telefone inválido: {}", raw)));
            }
            Some(raw)
        }
    };

    Ok(LeadInput {
        name,
        document,
        certificate_type: input.certificate_type,
        phone,
        email,
        origin: non_blank(input.origin),
        status: input.status,
        expiration_date: input.expiration_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineStage;

    #[test]
    fn test_document_kind_detection() {
        assert_eq!(document_kind("123.456.789-00"), Some(DocumentKind::Cpf));
        assert_eq!(document_kind("12345678900"), Some(DocumentKind::Cpf));
        assert_eq!(document_kind("12.345.678/0001-90"), Some(DocumentKind::Cnpj));
        assert_eq!(document_kind("12345678000190"), Some(DocumentKind::Cnpj));
        assert_eq!(document_kind("1234"), None);
        assert_eq!(document_kind("123.456.789-0a"), None);
        assert_eq!(document_kind(""), None);
    }

    #[test]
    fn test_format_document() {
        assert_eq!(
            format_document("12345678900").as_deref(),
            Some("123.456.789-00")
        );
        assert_eq!(
            format_document("12345678000190").as_deref(),
            Some("12.345.678/0001-90")
        );
        assert_eq!(
            format_document("12.345.678/0001-90").as_deref(),
            Some("12.345.678/0001-90")
        );
        assert_eq!(format_document("999"), None);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("contato@joaosilva.com.br"));
        assert!(is_valid_email("maria.oliveira@gmail.com"));
        assert!(!is_valid_email("maria.oliveira@gmail"));
        assert!(!is_valid_email("user @example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone_validation() {
        let (valid, normalized) = validate_br_phone("11987654321");
        assert!(valid);
        assert_eq!(normalized, "+5511987654321");

        let (valid, normalized) = validate_br_phone("(11) 98765-4321");
        assert!(valid);
        assert_eq!(normalized, "+5511987654321");

        let (valid, _) = validate_br_phone("123");
        assert!(!valid);
    }

    #[test]
    fn test_normalize_lead_input_cleans_fields() {
        let input = LeadInput {
            name: "  Advocacia Santos S/A ".to_string(),
            document: Some("98765432000121".to_string()),
            email: Some("Juridico@Santos.adv.br".to_string()),
            phone: Some("   ".to_string()),
            origin: Some("".to_string()),
            status: Some(PipelineStage::Issued),
            ..Default::default()
        };

        let cleaned = normalize_lead_input(input).unwrap();

        assert_eq!(cleaned.name, "Advocacia Santos S/A");
        assert_eq!(cleaned.document.as_deref(), Some("98.765.432/0001-21"));
        assert_eq!(cleaned.email.as_deref(), Some("juridico@santos.adv.br"));
        assert_eq!(cleaned.phone, None);
        assert_eq!(cleaned.origin, None);
        assert_eq!(cleaned.status, Some(PipelineStage::Issued));
    }

    #[test]
    fn test_normalize_lead_input_rejects_bad_fields() {
        let blank_name = LeadInput {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            normalize_lead_input(blank_name),
            Err(AppError::BadRequest(_))
        ));

        let bad_document = LeadInput {
            name: "Maria".to_string(),
            document: Some("123".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            normalize_lead_input(bad_document),
            Err(AppError::BadRequest(_))
        ));

        let bad_email = LeadInput {
            name: "Maria".to_string(),
            email: Some("maria.gmail.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            normalize_lead_input(bad_email),
            Err(AppError::BadRequest(_))
        ));
    }
}
