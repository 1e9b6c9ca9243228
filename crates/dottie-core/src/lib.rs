pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use config::{GraphConfig, LLMConfig, PipelineConfig, ServerConfig, Settings};
pub use error::*;
pub use record::*;
pub use traits::*;
pub use types::*;
