//! The diagnostic resolution pipeline and its pure stages.

pub mod abnormality;
pub mod assembler;
pub mod pipeline;
pub mod recommendation;
pub mod validator;

pub use pipeline::DiagnosticPipeline;
