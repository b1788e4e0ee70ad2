use serde::Deserialize;

use crate::reports::{DEFAULT_RENEWAL_WINDOW_DAYS, MAX_RENEWAL_WINDOW_DAYS};

/// Server configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Days ahead an issued certificate counts as due for renewal.
    pub renewal_window_days: u64,
    /// How long site settings stay cached between database reads.
    pub settings_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            renewal_window_days: parse_renewal_window(
                std::env::var("RENEWAL_WINDOW_DAYS").ok().as_deref(),
            )?,
            settings_cache_ttl_secs: std::env::var("SETTINGS_CACHE_TTL_SECS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("SETTINGS_CACHE_TTL_SECS must be a number"))?
                .unwrap_or(60),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database URL: {}...", url_preview(&config.database_url));
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!("Renewal window: {} days", config.renewal_window_days);

        Ok(config)
    }
}

/// `RENEWAL_WINDOW_DAYS`: unset or blank means the default window.
fn parse_renewal_window(raw: Option<&str>) -> anyhow::Result<u64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_RENEWAL_WINDOW_DAYS);
    };
    let days: u64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("RENEWAL_WINDOW_DAYS must be a whole number of days"))?;
    if days > MAX_RENEWAL_WINDOW_DAYS {
        anyhow::bail!(
            "RENEWAL_WINDOW_DAYS must be at most {} days",
            MAX_RENEWAL_WINDOW_DAYS
        );
    }
    Ok(days)
}

/// First 20 characters of a connection string, for logs.
fn url_preview(url: &str) -> String {
    url.chars().take(20).collect()
}

/// Configuration of the board client (the `kanban` binary).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the CRM REST API, e.g. `http://localhost:3001`.
    pub api_url: String,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_url = std::env::var("CRM_API_URL")
            .unwrap_or_else(|_| "http://localhost:3001".to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("CRM_API_URL must start with http:// or https://");
        }

        tracing::debug!("CRM API URL: {}", api_url);
        Ok(Self { api_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_window_defaults_when_unset() {
        assert_eq!(parse_renewal_window(None).unwrap(), DEFAULT_RENEWAL_WINDOW_DAYS);
        assert_eq!(parse_renewal_window(Some("  ")).unwrap(), DEFAULT_RENEWAL_WINDOW_DAYS);
        assert_eq!(parse_renewal_window(Some(" 90 ")).unwrap(), 90);
    }

    #[test]
    fn test_renewal_window_is_capped() {
        assert_eq!(
            parse_renewal_window(Some("36500")).unwrap(),
            MAX_RENEWAL_WINDOW_DAYS
        );
        assert!(parse_renewal_window(Some("36501")).is_err());
        assert!(parse_renewal_window(Some("3000000000")).is_err());
        assert!(parse_renewal_window(Some("-1")).is_err());
    }

    #[test]
    fn test_url_preview_does_not_split_characters() {
        let url = "postgres://aaaaaaaaé@db.example.com/crm";
        assert_eq!(url_preview(url), "postgres://aaaaaaaaé");
        assert_eq!(url_preview("postgres://x"), "postgres://x");
    }
}
