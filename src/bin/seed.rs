//! Creates the schema and seeds a development admin user, sample leads and
//! landing page settings.
//!
//! Pass `--reset` to drop the existing tables first.

use certsync_crm::db::Database;
use certsync_crm::db_storage::{LeadRepository, SettingsRepository};
use certsync_crm::models::{LeadInput, SiteSettings};
use certsync_crm::pipeline::{CertificateType, PipelineStage};
use chrono::NaiveDate;
use dotenvy::dotenv;
use std::env;

fn sample_leads() -> Vec<LeadInput> {
    vec![
        LeadInput {
            name: "João Silva Tech ME".to_string(),
            document: Some("12.345.678/0001-90".to_string()),
            certificate_type: Some(CertificateType::A1),
            phone: Some("(11) 98888-7777".to_string()),
            email: Some("contato@joaosilva.com.br".to_string()),
            origin: Some("Google Ads".to_string()),
            status: Some(PipelineStage::WaitingDocs),
            expiration_date: NaiveDate::from_ymd_opt(2025, 5, 20),
        },
        LeadInput {
            name: "Maria Oliveira CPF".to_string(),
            document: Some("123.456.789-00".to_string()),
            certificate_type: Some(CertificateType::A3),
            phone: Some("(21) 97777-6666".to_string()),
            email: Some("maria.oliveira@gmail.com".to_string()),
            origin: Some("Indicação".to_string()),
            status: Some(PipelineStage::Scheduled),
            expiration_date: NaiveDate::from_ymd_opt(2025, 10, 15),
        },
        LeadInput {
            name: "Advocacia Santos S/A".to_string(),
            document: Some("98.765.432/0001-21".to_string()),
            certificate_type: Some(CertificateType::Cloud),
            phone: Some("(31) 99999-1234".to_string()),
            email: Some("juridico@santos.adv.br".to_string()),
            origin: Some("Site Direto".to_string()),
            status: Some(PipelineStage::Issued),
            expiration_date: NaiveDate::from_ymd_opt(2024, 11, 12),
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("DB_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let reset = env::args().any(|arg| arg == "--reset");

    let db = Database::new(&database_url).await?;

    if reset {
        tracing::warn!("Dropping leads, users and system_settings tables");
        sqlx::raw_sql(
            "DROP TABLE IF EXISTS leads CASCADE; \
             DROP TABLE IF EXISTS users CASCADE; \
             DROP TABLE IF EXISTS system_settings CASCADE;",
        )
        .execute(&db.pool)
        .await?;
    }
    db.ensure_schema().await?;

    sqlx::query(
        r#"
        INSERT INTO users (username, password, name, role)
        VALUES ('admin', 'devpassword123', 'Dev Admin', 'admin')
        ON CONFLICT (username) DO UPDATE
        SET password = EXCLUDED.password, name = EXCLUDED.name, role = EXCLUDED.role
        "#,
    )
    .execute(&db.pool)
    .await?;
    tracing::info!("Admin user seeded (Username: admin / Password: devpassword123)");

    let leads = LeadRepository::new(db.pool.clone());
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leads")
        .fetch_one(&db.pool)
        .await?;
    if existing == 0 {
        for input in sample_leads() {
            leads.create(input).await?;
        }
        tracing::info!("Sample leads seeded");
    } else {
        tracing::info!("Leads table has {} row(s); skipping sample leads", existing);
    }

    let settings = SettingsRepository::new(db.pool.clone());
    let current = settings.get().await?;
    if current.is_none() {
        settings
            .save(&SiteSettings {
                meta_title: Some("CertSync | Certificados Digitais".to_string()),
                meta_description: Some(
                    "Emissão e renovação de certificados digitais A1, A3 e em nuvem.".to_string(),
                ),
                client_email: Some("contato@certsync.com.br".to_string()),
                client_phone: Some("+55 11 99999-9999".to_string()),
                client_address: Some("Av. Paulista, 1000 - SP".to_string()),
                ..Default::default()
            })
            .await?;
        tracing::info!("System settings seeded");
    }

    Ok(())
}
