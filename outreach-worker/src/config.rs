/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 5)
/// - `RESEND_API_KEY`: delivery provider key (required)
/// - `RESEND_BASE_URL`: default `https://api.resend.com`
/// - `SENDING_DOMAIN`: domain outgoing addresses are rewritten onto (required)
/// - `WORKER_POLL_INTERVAL_SECS`: pause between polls when idle (default 30)
/// - `WORKER_BATCH_SIZE`: rows claimed per poll (default 25)
///
/// Claimed rows are marked sent before delivery, so the worker refuses to
/// start without a real delivery provider.

use crate::dispatcher::DispatcherConfig;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub resend_api_key: String,
    pub resend_base_url: String,
    pub dispatcher: DispatcherConfig,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let sending_domain = var("SENDING_DOMAIN")
            .ok_or_else(|| anyhow::anyhow!("SENDING_DOMAIN environment variable is required"))?;
        let resend_api_key = var("RESEND_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("RESEND_API_KEY environment variable is required"))?;

        let batch_size: i64 = var_or("WORKER_BATCH_SIZE", "25").parse()?;
        if batch_size < 1 {
            anyhow::bail!("WORKER_BATCH_SIZE must be at least 1");
        }

        Ok(Self {
            database_url,
            max_connections: var_or("DATABASE_MAX_CONNECTIONS", "5").parse()?,
            resend_api_key,
            resend_base_url: var_or("RESEND_BASE_URL", "https://api.resend.com"),
            dispatcher: DispatcherConfig {
                poll_interval: Duration::from_secs(
                    var_or("WORKER_POLL_INTERVAL_SECS", "30").parse()?,
                ),
                batch_size,
                sending_domain,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgresql://localhost/outreach"),
        ("SENDING_DOMAIN", "mail.example.com"),
        ("RESEND_API_KEY", "re_test_key"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.dispatcher.poll_interval, Duration::from_secs(30));
        assert_eq!(config.dispatcher.batch_size, 25);
        assert_eq!(config.resend_api_key, "re_test_key");
    }

    #[test]
    fn test_worker_variables() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_POLL_INTERVAL_SECS", "5"));
        vars.push(("WORKER_BATCH_SIZE", "100"));
        let config = load(&vars).unwrap();

        assert_eq!(config.dispatcher.poll_interval, Duration::from_secs(5));
        assert_eq!(config.dispatcher.batch_size, 100);
    }

    #[test]
    fn test_required_variables() {
        for missing in REQUIRED.iter().map(|(key, _)| *key) {
            let vars: Vec<(&str, &str)> =
                REQUIRED.iter().copied().filter(|(key, _)| *key != missing).collect();
            assert!(load(&vars).is_err(), "{} should be required", missing);
        }
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("WORKER_BATCH_SIZE", "0"));
        assert!(load(&vars).is_err());
    }
}
