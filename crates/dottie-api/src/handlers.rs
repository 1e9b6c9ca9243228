use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use dottie_core::{Condition, DiagnosticResult, EducationalContent, SymptomInput};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Outward view of a [`DiagnosticResult`]. The model insight, when present, is the last
/// entry of `recommendations` and appears nowhere else.
#[derive(Debug, Serialize)]
pub struct AnalyzeSymptomsResponse {
    pub is_normal: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub abnormalities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub educational_resources: Vec<EducationalContent>,
}

impl From<DiagnosticResult> for AnalyzeSymptomsResponse {
    fn from(result: DiagnosticResult) -> Self {
        Self {
            is_normal: result.is_normal,
            abnormalities: result.abnormality_labels(),
            recommendations: result.merged_recommendations(),
            causes: result.causes.into_iter().map(|c| c.name).collect(),
            conditions: result.conditions,
            educational_resources: result.educational_resources,
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[instrument(skip(state, payload))]
pub async fn analyze_symptoms(
    State(state): State<AppState>,
    payload: Result<Json<SymptomInput>, JsonRejection>,
) -> ApiResult<Json<AnalyzeSymptomsResponse>> {
    let Json(input) = payload?;
    let result = state.pipeline.run(&input).await?;
    info!(
        is_normal = result.is_normal,
        conditions = result.conditions.len(),
        "symptoms analyzed"
    );
    Ok(Json(result.into()))
}

#[derive(Debug, Deserialize)]
pub struct ConditionQuery {
    pub condition: String,
}

#[instrument(skip(state, payload))]
pub async fn educational_content(
    State(state): State<AppState>,
    payload: Result<Json<ConditionQuery>, JsonRejection>,
) -> ApiResult<Json<Vec<EducationalContent>>> {
    let Json(query) = payload?;
    let condition = query.condition.trim();
    if condition.is_empty() {
        return Err(ApiError::BadRequest("condition must not be empty".to_string()));
    }

    let content = state
        .pipeline
        .resolver()
        .educational_content_by_names(&[condition.to_string()])
        .await?;
    if content.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no educational content found for condition {condition}"
        )));
    }
    info!(condition, resources = content.len(), "educational content served");
    Ok(Json(content))
}
