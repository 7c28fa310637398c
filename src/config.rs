use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, StylistError};

/// Main configuration structure for the styling backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub groq: GroqConfig,
    pub gemini: GeminiConfig,
    pub providers: ProviderConfig,
    pub pipeline: PipelineConfig,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Limits applied to every outbound model call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub request_timeout_secs: u64,
    /// 1 means a single attempt, no retry.
    pub max_attempts: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pass the extracted intent to the merge step as a tertiary source.
    pub intent_as_merge_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Strategy names tried in order: "api", "page".
    pub strategies: Vec<String>,
    pub api_url: String,
    pub page_url: String,
    pub default_limit: usize,
    pub user_agent: String,
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Never fails; call [`Config::validate`] to enforce credentials.
    pub fn load() -> Self {
        let env_paths = [".env", "../.env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("SEVEN_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::from_yaml(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| StylistError::Config(format!("invalid YAML: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bind) = env::var("SEVEN_HTTP_BIND") {
            self.server.bind = bind;
        }

        // Credentials
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            self.openai.api_key = api_key;
        }
        if let Ok(api_key) = env::var("GROQ_API_KEY") {
            self.groq.api_key = api_key;
        }
        if let Ok(api_key) = env::var("GEMINI_API_KEY") {
            self.gemini.api_key = api_key;
        }

        // Models
        if let Ok(model) = env::var("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Ok(model) = env::var("GROQ_MODEL") {
            self.groq.model = model;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            self.gemini.model = model;
        }

        if let Ok(timeout) = env::var("SEVEN_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.providers.request_timeout_secs = secs;
            }
        }
        if let Ok(attempts) = env::var("SEVEN_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.providers.max_attempts = n;
            }
        }
        if let Ok(flag) = env::var("SEVEN_INTENT_AS_MERGE_FALLBACK") {
            if let Ok(b) = flag.parse() {
                self.pipeline.intent_as_merge_fallback = b;
            }
        }
        if let Ok(strategies) = env::var("SEVEN_SCRAPER_STRATEGIES") {
            self.scraper.strategies = parse_strategy_list(&strategies);
        }
    }

    /// Fail fast on settings the service cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() {
            return Err(StylistError::Config("OPENAI_API_KEY missing".into()));
        }
        if self.groq.api_key.trim().is_empty() {
            return Err(StylistError::Config("GROQ_API_KEY missing".into()));
        }
        if self.gemini.api_key.trim().is_empty() {
            tracing::warn!("GEMINI_API_KEY not set, intent extraction will always fall back");
        }
        if self.providers.request_timeout_secs == 0 {
            return Err(StylistError::Config(
                "providers.request_timeout_secs cannot be 0".into(),
            ));
        }
        if self.providers.max_attempts == 0 {
            return Err(StylistError::Config(
                "providers.max_attempts cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.request_timeout_secs)
    }
}

fn parse_strategy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            openai: OpenAIConfig::default(),
            groq: GroqConfig::default(),
            gemini: GeminiConfig::default(),
            providers: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            base_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_attempts: 1,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intent_as_merge_fallback: false,
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            strategies: vec!["api".to_string(), "page".to_string()],
            api_url: "https://api.hm.com/search-services/v1/en_us/search/articles".to_string(),
            page_url: "https://www2.hm.com/en_us/search-results.html".to_string(),
            default_limit: 5,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_keys() -> Config {
        let mut cfg = Config::default();
        cfg.openai.api_key = "sk-test".to_string();
        cfg.groq.api_key = "gsk-test".to_string();
        cfg
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.openai.model, "gpt-4o-mini");
        assert_eq!(cfg.groq.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.gemini.model, "gemini-2.5-flash");
        assert_eq!(cfg.providers.max_attempts, 1);
        assert!(!cfg.pipeline.intent_as_merge_fallback);
        assert_eq!(cfg.scraper.strategies, vec!["api", "page"]);
    }

    #[test]
    fn test_missing_proposer_keys_fail_fast() {
        let cfg = Config::default();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("OPENAI_API_KEY"));

        let mut cfg = Config::default();
        cfg.openai.api_key = "sk-test".to_string();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_missing_gemini_key_is_not_fatal() {
        let cfg = with_keys();
        assert!(cfg.gemini.api_key.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut cfg = with_keys();
        cfg.providers.request_timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml(
            r#"
server:
  bind: "0.0.0.0:9000"
pipeline:
  intent_as_merge_fallback: true
scraper:
  strategies: ["page"]
  api_url: "http://localhost/api"
  page_url: "http://localhost/page"
  default_limit: 3
  user_agent: "test"
"#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert!(cfg.pipeline.intent_as_merge_fallback);
        assert_eq!(cfg.scraper.strategies, vec!["page"]);
        assert_eq!(cfg.groq.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_partial_section_keeps_other_settings() {
        let cfg = Config::from_yaml(
            "groq:\n  model: \"llama-x\"\npipeline:\n  intent_as_merge_fallback: true\nscraper:\n  default_limit: 8\n",
        )
        .unwrap();
        assert_eq!(cfg.groq.model, "llama-x");
        assert_eq!(
            cfg.groq.base_url,
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert!(cfg.pipeline.intent_as_merge_fallback);
        assert_eq!(cfg.scraper.default_limit, 8);
        assert_eq!(cfg.scraper.strategies, vec!["api", "page"]);
        assert_eq!(cfg.providers.request_timeout_secs, 30);
    }

    #[test]
    fn test_strategy_list_parsing() {
        assert_eq!(parse_strategy_list(" Page, api ,,"), vec!["page", "api"]);
        assert!(parse_strategy_list("").is_empty());
    }
}
