use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_AGENT_STEPS: usize = 8;
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub credentials_path: String,
    pub token_path: String,
    pub calendar_id: String,
    pub google_api_base_url: String,
    pub timezone: Option<String>,
    pub max_agent_steps: usize,
    pub agent_timeout: Duration,
}

/// Read a numeric env var, falling back to `default` when it's unset
/// or can't be parsed.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, val);
            default
        }),
        Err(_) => default,
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let openai_api_hostname = env::var("BOOKER_LLM_HOST")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let openai_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let openai_model =
            env::var("BOOKER_LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string());
        let credentials_path = env::var("BOOKER_CREDENTIALS_PATH")
            .unwrap_or_else(|_| "./credentials.json".to_string());
        let token_path =
            env::var("BOOKER_TOKEN_PATH").unwrap_or_else(|_| "./token.json".to_string());
        let calendar_id = env::var("BOOKER_CALENDAR_ID").unwrap_or_else(|_| "primary".to_string());
        let google_api_base_url = env::var("BOOKER_GOOGLE_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com".to_string());
        let timezone = env::var("BOOKER_TIMEZONE")
            .ok()
            .filter(|tz| !tz.trim().is_empty());
        let max_agent_steps = env_or("BOOKER_MAX_AGENT_STEPS", DEFAULT_MAX_AGENT_STEPS).max(1);
        let agent_timeout = Duration::from_secs(env_or(
            "BOOKER_AGENT_TIMEOUT_SECS",
            DEFAULT_AGENT_TIMEOUT_SECS,
        ));

        Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            credentials_path,
            token_path,
            calendar_id,
            google_api_base_url,
            timezone,
            max_agent_steps,
            agent_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let val: usize = env_or("BOOKER_TEST_SURELY_UNSET_VAR", 42);
        assert_eq!(val, 42);
    }
}
