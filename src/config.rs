//! Environment-driven configuration
//!
//! Read once at startup (after `.env` is loaded). A missing Gemini key
//! disables the chat feature only.

use crate::error::InsightError;
use crate::prompt::DEFAULT_MAX_CONTEXT_CHARS;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-flash"];
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Tried in order until one answers
    pub models: Vec<String>,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `None` disables the chat endpoint
    pub gemini: Option<GeminiConfig>,
    pub max_upload_bytes: usize,
    pub prompt_context_max_chars: usize,
    pub currency_symbol: String,
    pub sample_data_path: PathBuf,
    pub advisor_fallback: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            gemini: None,
            max_upload_bytes: 16 * 1024 * 1024,
            prompt_context_max_chars: DEFAULT_MAX_CONTEXT_CHARS,
            currency_symbol: "₹".to_string(),
            sample_data_path: PathBuf::from("data/financial_data.csv"),
            advisor_fallback: true,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, honoring a `.env` file
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let gemini = match get("GEMINI_API_KEY") {
            Some(key) if key != PLACEHOLDER_API_KEY => {
                let models = get("GEMINI_MODELS")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|m| !m.is_empty())
                            .map(String::from)
                            .collect::<Vec<_>>()
                    })
                    .filter(|models| !models.is_empty())
                    .unwrap_or_else(|| DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect());

                Some(GeminiConfig {
                    api_key: key,
                    models,
                    base_url: get("GEMINI_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                    timeout: Duration::from_secs(parse_or("GEMINI_TIMEOUT_SECS", get("GEMINI_TIMEOUT_SECS"), 30)?),
                })
            }
            _ => None,
        };

        Ok(Self {
            port: parse_or("PORT", get("PORT").or_else(|| get("API_PORT")), defaults.port)?,
            gemini,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), defaults.max_upload_bytes)?,
            prompt_context_max_chars: parse_or(
                "PROMPT_CONTEXT_MAX_CHARS",
                get("PROMPT_CONTEXT_MAX_CHARS"),
                defaults.prompt_context_max_chars,
            )?,
            currency_symbol: get("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            sample_data_path: get("SAMPLE_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sample_data_path),
            advisor_fallback: parse_bool("ADVISOR_FALLBACK", get("ADVISOR_FALLBACK"), defaults.advisor_fallback)?,
        })
    }

    pub fn chat_enabled(&self) -> bool {
        self.gemini.is_some()
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .parse()
            .map_err(|_| InsightError::Config(format!("{} has invalid value {:?}", key, value))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(InsightError::Config(format!(
            "{} has invalid value {:?}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 8080);
        assert!(!config.chat_enabled());
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.currency_symbol, "₹");
        assert!(config.advisor_fallback);
    }

    #[test]
    fn test_api_key_enables_chat() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_MODELS", "m1, m2 ,"),
            ("GEMINI_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "abc");
        assert_eq!(gemini.models, vec!["m1", "m2"]);
        assert_eq!(gemini.timeout, Duration::from_secs(5));
        assert_eq!(gemini.base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn test_placeholder_or_blank_key_disables_chat() {
        assert!(!config_from(&[("GEMINI_API_KEY", "your_gemini_api_key_here")])
            .unwrap()
            .chat_enabled());
        assert!(!config_from(&[("GEMINI_API_KEY", "  ")]).unwrap().chat_enabled());
    }

    #[test]
    fn test_port_fallback_and_errors() {
        assert_eq!(config_from(&[("API_PORT", "9000")]).unwrap().port, 9000);
        assert_eq!(
            config_from(&[("PORT", "7000"), ("API_PORT", "9000")]).unwrap().port,
            7000
        );

        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, InsightError::Config(_)));
    }

    #[test]
    fn test_fallback_flag() {
        assert!(!config_from(&[("ADVISOR_FALLBACK", "off")]).unwrap().advisor_fallback);
        assert!(config_from(&[("ADVISOR_FALLBACK", "maybe")]).is_err());
    }
}
