use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Base URL of the templated-mail gateway. Optional: without it the
    /// service still assigns leads, it just cannot notify anyone.
    pub mail_gateway_url: Option<String>,
    pub mail_gateway_token: Option<String>,
    pub email_from: String,
    /// Manager address copied on every assignment mail. Falls back to
    /// `email_from` when unset.
    pub email_gerente_cc: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let email_from = std::env::var("EMAIL_FROM")
            .map_err(|_| anyhow::anyhow!("EMAIL_FROM environment variable required"))
            .and_then(|addr| {
                if addr.trim().is_empty() {
                    anyhow::bail!("EMAIL_FROM cannot be empty");
                }
                Ok(addr)
            })?;

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
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            mail_gateway_url: match std::env::var("MAIL_GATEWAY_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
            {
                Some(raw) => {
                    let parsed = url::Url::parse(&raw)
                        .map_err(|e| anyhow::anyhow!("MAIL_GATEWAY_URL is not a valid URL: {}", e))?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("MAIL_GATEWAY_URL must start with http:// or https://");
                    }
                    Some(raw)
                }
                None => None,
            },
            mail_gateway_token: std::env::var("MAIL_GATEWAY_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            email_gerente_cc: std::env::var("EMAIL_GERENTE_CC")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| email_from.clone()),
            email_from,
        };

        if config.mail_gateway_url.is_some() && config.mail_gateway_token.is_none() {
            anyhow::bail!("MAIL_GATEWAY_TOKEN required when MAIL_GATEWAY_URL is set");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        if let Some(ref gateway) = config.mail_gateway_url {
            tracing::debug!("Mail gateway URL: {}", gateway);
        } else {
            tracing::warn!("MAIL_GATEWAY_URL not set; assignment e-mails disabled");
        }
        tracing::debug!("CC address: {}", config.email_gerente_cc);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
