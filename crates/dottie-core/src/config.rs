use std::path::Path;

use config as cfg;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use crate::{Result, TriageError};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Connection settings for the SurrealDB-backed graph store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Connection string (e.g., "ws://localhost:8000" or "mem://")
    pub connection: String,
    #[serde(default = "GraphConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "GraphConfig::default_database")]
    pub database: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl GraphConfig {
    fn default_namespace() -> String {
        "dottie".to_string()
    }

    fn default_database() -> String {
        "triage".to_string()
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            connection: "ws://localhost:8000".into(),
            namespace: Self::default_namespace(),
            database: Self::default_database(),
            username: None,
            password: None,
        }
    }
}

/// Generative model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    /// When false the pipeline runs without augmentation.
    #[serde(default = "LLMConfig::default_enabled")]
    pub enabled: bool,
    /// "gemini", "openai", "ollama", "lmstudio" or "openai-compatible"
    #[serde(default = "LLMConfig::default_provider")]
    pub provider: String,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "LLMConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "LLMConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "LLMConfig::default_max_tokens")]
    pub max_tokens: usize,
    /// Retries performed by the model client itself. The pipeline never retries.
    #[serde(default)]
    pub max_retries: u32,
}

impl LLMConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_provider() -> String {
        "gemini".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    fn default_temperature() -> f32 {
        1.0
    }

    fn default_max_tokens() -> usize {
        8192
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            provider: Self::default_provider(),
            base_url: None,
            model: None,
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound for one diagnostic request, model call included.
    #[serde(default = "PipelineConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Issue the condition lookup alongside the range lookup.
    #[serde(default)]
    pub speculative_condition_lookup: bool,
    /// 0 disables the normal-range cache.
    #[serde(default)]
    pub ranges_cache_ttl_secs: u64,
}

impl PipelineConfig {
    fn default_request_timeout_secs() -> u64 {
        45
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: Self::default_request_timeout_secs(),
            speculative_condition_lookup: false,
            ranges_cache_ttl_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Settings {
    /// Layered load, lowest precedence first:
    /// 1. Built-in defaults
    /// 2. `<config_dir>/default.toml`
    /// 3. `<config_dir>/<DOTTIE_ENV>.toml`
    /// 4. Environment variables (DOTTIE__* prefix, `__` separator)
    pub fn load(config_dir: &Path) -> Result<Settings> {
        let _ = dotenvy::dotenv();
        let env_name = std::env::var("DOTTIE_ENV").unwrap_or_else(|_| "development".to_string());
        Self::load_from_sources(config_dir, &env_name)
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        debug!(?config_dir, env_name, "loading configuration");
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(cfg::Environment::with_prefix("DOTTIE").separator("__"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(TriageError::Config("server.port must be non-zero".into()));
        }
        if self.graph.connection.trim().is_empty() {
            return Err(TriageError::Config("graph.connection must be set".into()));
        }
        if self.pipeline.request_timeout_secs == 0 {
            return Err(TriageError::Config(
                "pipeline.request_timeout_secs must be non-zero".into(),
            ));
        }
        if self.llm.enabled && self.llm.timeout_secs == 0 {
            return Err(TriageError::Config("llm.timeout_secs must be non-zero".into()));
        }
        Ok(())
    }
}
