use crate::llm_provider::LLMProvider;
use crate::openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
use anyhow::{anyhow, Result};
use dottie_core::LLMConfig;
use std::sync::Arc;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-8b";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LOCAL_MODEL: &str = "llama3";

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration.
    ///
    /// Returns `Ok(None)` when the model is disabled.
    pub fn create_from_config(config: &LLMConfig) -> Result<Option<Arc<dyn LLMProvider>>> {
        if !config.enabled {
            tracing::info!("LLM augmentation disabled");
            return Ok(None);
        }

        let provider_config = Self::provider_config(config)?;
        tracing::info!(
            provider = %provider_config.provider_name,
            model = %provider_config.model,
            base_url = %provider_config.base_url,
            "Creating LLM provider"
        );
        let provider: Arc<dyn LLMProvider> =
            Arc::new(OpenAICompatibleProvider::new(provider_config)?);
        Ok(Some(provider))
    }

    fn provider_config(config: &LLMConfig) -> Result<OpenAICompatibleConfig> {
        let model = |default: &str| config.model.clone().unwrap_or_else(|| default.to_string());

        let mut provider_config = match config.provider.to_lowercase().as_str() {
            "gemini" | "google" => {
                if config.api_key.is_none() {
                    return Err(anyhow!("Gemini provider requires llm.api_key"));
                }
                OpenAICompatibleConfig::gemini(model(DEFAULT_GEMINI_MODEL), config.api_key.clone())
            }
            "openai" => {
                if config.api_key.is_none() {
                    return Err(anyhow!("OpenAI provider requires llm.api_key"));
                }
                OpenAICompatibleConfig::openai(model(DEFAULT_OPENAI_MODEL), config.api_key.clone())
            }
            "ollama" => OpenAICompatibleConfig::ollama(model(DEFAULT_LOCAL_MODEL)),
            "lmstudio" => OpenAICompatibleConfig::lm_studio(model(DEFAULT_LOCAL_MODEL)),
            "openai-compatible" => {
                let base_url = config
                    .base_url
                    .clone()
                    .ok_or_else(|| anyhow!("openai-compatible provider requires llm.base_url"))?;
                OpenAICompatibleConfig {
                    base_url,
                    model: model(DEFAULT_LOCAL_MODEL),
                    api_key: config.api_key.clone(),
                    ..Default::default()
                }
            }
            other => {
                return Err(anyhow!(
                    "Unsupported LLM provider: {}. Available: gemini, openai, ollama, lmstudio, openai-compatible",
                    other
                ))
            }
        };

        if let Some(base_url) = &config.base_url {
            provider_config.base_url = base_url.clone();
        }
        provider_config.timeout_secs = config.timeout_secs;
        provider_config.max_retries = config.max_retries;
        Ok(provider_config)
    }
}
