use anyhow::Context;
use serde::Deserialize;

use crate::quota::tiers::TierConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Connection settings for the OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o".into(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub tiers: TierConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutriplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutriplan-users".into()),
        };

        let defaults = LlmConfig::default();
        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("LLM_MODEL").unwrap_or(defaults.model),
            temperature: env_parse("LLM_TEMPERATURE").unwrap_or(defaults.temperature),
            max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(defaults.max_tokens),
            timeout_secs: env_parse("LLM_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
        };

        let tiers = match std::env::var("PLAN_TIERS_FILE") {
            Ok(path) => TierConfig::from_file(&path)?,
            Err(_) => TierConfig::default(),
        };

        Ok(Self {
            database_url,
            jwt,
            llm,
            tiers,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
