/// Configuration management for the API server
///
/// Configuration is read from environment variables. A `.env` file is loaded
/// first when present, for development.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `API_PRODUCTION`: enables HSTS and `Secure` cookies (default `false`)
/// - `CORS_ORIGINS`: comma separated allowed origins (default `*`). The `*`
///   wildcard never allows credentials, so a dashboard served from another
///   origin needs its origin listed explicitly to send the session cookie.
/// - `STORE_BACKEND`: `postgres` (default) or `memory`
/// - `DATABASE_URL`: required for the postgres backend
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `SESSION_SECRET`: session signing key, at least 32 characters (required)
/// - `SESSION_COOKIE`: cookie name (default `outreach_session`)
/// - `SESSION_TTL_HOURS`: session lifetime (default 168)
/// - `RESEND_API_KEY`: delivery provider key; the mock provider is used without it
/// - `RESEND_BASE_URL`: default `https://api.resend.com`
/// - `RESEND_WEBHOOK_SECRET`: webhook signing secret
/// - `SENDING_DOMAIN`: domain outgoing addresses are rewritten onto (required)
/// - `AI_API_KEY`, `AI_BASE_URL`, `AI_MODEL`: completion provider
///
/// # Example
///
/// ```no_run
/// use outreach_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Listening on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use outreach_shared::auth::session::DEFAULT_COOKIE_NAME;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub resend: ResendConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS and `Secure` cookies
    pub production: bool,

    /// Allowed CORS origins, `*` for any
    pub cors_origins: Vec<String>,
}

/// Which [`Store`](outreach_shared::store::Store) backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,

    /// Required for [`StoreBackend::Postgres`]
    pub url: Option<String>,

    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub webhook_secret: Option<String>,
    pub sending_domain: String,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port = var_or("API_PORT", "8080").parse::<u16>()?;
        let production = var_or("API_PRODUCTION", "false").parse::<bool>()?;
        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let backend = match var_or("STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown STORE_BACKEND: {}", other),
        };

        let database_url = var("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }

        let session_secret = var("SESSION_SECRET")
            .ok_or_else(|| anyhow::anyhow!("SESSION_SECRET environment variable is required"))?;
        if session_secret.len() < 32 {
            anyhow::bail!("SESSION_SECRET must be at least 32 characters long");
        }

        let sending_domain = var("SENDING_DOMAIN")
            .ok_or_else(|| anyhow::anyhow!("SENDING_DOMAIN environment variable is required"))?;

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", "10").parse()?,
            },
            session: SessionConfig {
                secret: session_secret,
                cookie_name: var_or("SESSION_COOKIE", DEFAULT_COOKIE_NAME),
                ttl_hours: var_or("SESSION_TTL_HOURS", "168").parse()?,
            },
            resend: ResendConfig {
                api_key: var("RESEND_API_KEY"),
                base_url: var_or("RESEND_BASE_URL", "https://api.resend.com"),
                webhook_secret: var("RESEND_WEBHOOK_SECRET"),
                sending_domain,
            },
            ai: AiConfig {
                api_key: var("AI_API_KEY"),
                base_url: var_or("AI_BASE_URL", "https://api.openai.com/v1"),
                model: var_or("AI_MODEL", "gpt-4o-mini"),
            },
        })
    }

    /// Whether cross-origin requests may carry the session cookie
    pub fn cors_allows_credentials(&self) -> bool {
        !self.api.cors_origins.iter().any(|o| o == "*")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/outreach"),
            ("SESSION_SECRET", SECRET),
            ("SENDING_DOMAIN", "mail.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(!config.api.production);
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert!(!config.cors_allows_credentials());
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert_eq!(config.session.cookie_name, "outreach_session");
        assert_eq!(config.session.ttl_hours, 168);
        assert!(config.resend.api_key.is_none());
        assert_eq!(config.ai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("SESSION_SECRET", SECRET),
            ("SENDING_DOMAIN", "mail.example.com"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert!(config.database.url.is_none());
        assert_eq!(config.api.cors_origins.len(), 2);
        assert!(config.cors_allows_credentials());
    }

    #[test]
    fn test_postgres_requires_url() {
        let result = Config::from_lookup(lookup(&[
            ("SESSION_SECRET", SECRET),
            ("SENDING_DOMAIN", "mail.example.com"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("SESSION_SECRET", "short"),
            ("SENDING_DOMAIN", "mail.example.com"),
        ]));
        assert!(result.is_err());
    }
}
