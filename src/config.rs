use std::time::Duration;

use serde::Deserialize;

/// Which backend holds users and articles.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Tokens older than this are rejected; 0 disables the check.
    pub max_age_secs: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };

        let database_url = var("DATABASE_URL").or_else(|| {
            let user = var("DB_USER")?;
            let name = var("DB_NAME")?;
            let host = var("DB_HOST").unwrap_or_else(|| "localhost".into());
            Some(match var("DB_PASSWORD") {
                Some(password) => format!("postgres://{user}:{password}@{host}/{name}"),
                None => format!("postgres://{user}@{host}/{name}"),
            })
        });

        let session = SessionConfig {
            max_age_secs: var("SESSION_MAX_AGE_SECS")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 60 * 24 * 30),
            secure_cookie: var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        let port = match var("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("invalid APP_PORT {raw:?}: {e}"))?,
            None => 8080,
        };

        Ok(Self {
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            store_backend,
            database_url,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            store_timeout: Duration::from_millis(
                var("STORE_TIMEOUT_MS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(5_000),
            ),
            session,
        })
    }
}
