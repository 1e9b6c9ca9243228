use dottie_diagnosis::DiagnosticPipeline;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DiagnosticPipeline>,
}

impl AppState {
    pub fn new(pipeline: DiagnosticPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}
