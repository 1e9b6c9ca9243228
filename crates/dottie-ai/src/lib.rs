pub mod augmenter;
pub mod llm_factory;
pub mod llm_provider;
pub mod openai_compatible_provider;

pub use augmenter::DiagnosticAugmenter;
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
