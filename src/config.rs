use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStrategy {
    Llm,
    Heuristic,
}

impl FromStr for QuizStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llm" | "ai" => Ok(Self::Llm),
            "heuristic" | "local" => Ok(Self::Heuristic),
            other => Err(format!("unknown quiz generator '{}'", other)),
        }
    }
}

/// How many graded attempts a student may record per exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPolicy {
    Unlimited,
    Single,
}

impl FromStr for AttemptPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unlimited" => Ok(Self::Unlimited),
            "single" | "once" => Ok(Self::Single),
            other => Err(format!("unknown attempt policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub payment_webhook_secret: String,
    pub token_ttl_hours: i64,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub quiz_generator: QuizStrategy,
    pub quiz_text_budget: usize,
    pub quiz_num_questions: usize,
    pub attempt_policy: AttemptPolicy,
    pub uploads_dir: String,
    pub ai_rps: u32,
    pub cors_origins: Vec<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            payment_webhook_secret: get_env("PAYMENT_WEBHOOK_SECRET")?,
            token_ttl_hours: get_env_parse_or("TOKEN_TTL_HOURS", 24)?,
            // A missing key is not fatal: AI calls fail when made and fall back.
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_base_url: http_base_url(&get_env_or("LLM_BASE_URL", "https://api.groq.com/openai/v1"))?,
            llm_model: get_env_or("LLM_MODEL", "llama-3.3-70b-versatile"),
            llm_timeout_secs: get_env_parse_or("LLM_TIMEOUT_SECS", 60)?,
            quiz_generator: get_env_parse_or("QUIZ_GENERATOR", QuizStrategy::Llm)?,
            quiz_text_budget: get_env_parse_or("QUIZ_TEXT_BUDGET", 15_000)?,
            quiz_num_questions: get_env_parse_or("QUIZ_NUM_QUESTIONS", 15)?,
            attempt_policy: get_env_parse_or("QUIZ_ATTEMPT_POLICY", AttemptPolicy::Unlimited)?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            ai_rps: get_env_parse_or("AI_RPS", 5)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Base URL for an HTTP API; only http and https are accepted.
fn http_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("Invalid value for LLM_BASE_URL: {}", e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::Config(format!(
            "LLM_BASE_URL must use http or https, got {}",
            url.scheme()
        )));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strategy_and_policy_names() {
        assert_eq!("LLM".parse::<QuizStrategy>().unwrap(), QuizStrategy::Llm);
        assert_eq!(" heuristic ".parse::<QuizStrategy>().unwrap(), QuizStrategy::Heuristic);
        assert!("markov".parse::<QuizStrategy>().is_err());

        assert_eq!("single".parse::<AttemptPolicy>().unwrap(), AttemptPolicy::Single);
        assert_eq!("Unlimited".parse::<AttemptPolicy>().unwrap(), AttemptPolicy::Unlimited);
        assert!("twice".parse::<AttemptPolicy>().is_err());
    }

    #[test]
    fn base_url_must_be_http() {
        assert_eq!(
            http_base_url("https://api.groq.com/openai/v1/").unwrap(),
            "https://api.groq.com/openai/v1"
        );
        assert!(http_base_url("ftp://models.local").is_err());
        assert!(http_base_url("not a url").is_err());
    }
}
