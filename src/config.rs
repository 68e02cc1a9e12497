use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Normalized images longer than this are not copied into `image_url`.
    pub image_inline_limit: usize,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub ai: AiConfig,
    pub scan: ScanConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = get("DATABASE_URL").context("DATABASE_URL is not set")?;
        let ai = AiConfig {
            api_key: get("AI_INTEGRATIONS_OPENAI_API_KEY")
                .context("AI_INTEGRATIONS_OPENAI_API_KEY is not set")?,
            base_url: get("AI_INTEGRATIONS_OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            model: get("AI_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            max_tokens: parse_or(&get, "AI_MAX_TOKENS", 300),
            timeout_secs: parse_or(&get, "AI_TIMEOUT_SECS", 60),
        };
        let scan = ScanConfig {
            image_inline_limit: parse_or(&get, "SCAN_IMAGE_INLINE_LIMIT", 100_000),
            body_limit_bytes: parse_or(&get, "SCAN_BODY_LIMIT_BYTES", 20 * 1024 * 1024),
        };
        Ok(Self {
            database_url,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10),
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 8080),
            ai,
            scan,
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
