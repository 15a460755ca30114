use anyhow::{Result, anyhow};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key}={raw}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Remote reasoning API settings.
#[derive(Debug, Clone)]
pub struct RemoteEnvConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Total attempts per analysis call (>= 1).
    pub max_retries: u32,
    /// Per-attempt request timeout in seconds.
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl RemoteEnvConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
            base_url: env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com".to_string()),
            model: env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
            max_retries: parse_env("REMOTE_MAX_RETRIES", 3u32)?.max(1),
            timeout_secs: parse_env("REMOTE_TIMEOUT_SECS", 30u64)?,
            temperature: parse_env("REMOTE_TEMPERATURE", 0.3f32)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = RemoteEnvConfig::from_env().expect("defaults should parse");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.model, "deepseek-chat");
    }
}
