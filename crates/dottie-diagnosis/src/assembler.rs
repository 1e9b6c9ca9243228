use crate::recommendation::NO_ACTION_NEEDED;
use dottie_core::{Abnormality, Cause, Condition, DiagnosticResult, EducationalContent};

pub fn normal() -> DiagnosticResult {
    DiagnosticResult {
        is_normal: true,
        abnormalities: Vec::new(),
        conditions: Vec::new(),
        causes: Vec::new(),
        recommendations: vec![NO_ACTION_NEEDED.to_string()],
        educational_resources: Vec::new(),
        augmented_insight: None,
    }
}

/// Everything the abnormal path gathered. Rule-based recommendations are kept apart
/// from the model insight.
pub struct AbnormalFindings {
    pub abnormalities: Vec<Abnormality>,
    pub conditions: Vec<Condition>,
    pub causes: Vec<Cause>,
    pub recommendations: Vec<String>,
    pub educational_resources: Vec<EducationalContent>,
    pub insight: Option<String>,
}

pub fn abnormal(findings: AbnormalFindings) -> DiagnosticResult {
    debug_assert!(!findings.abnormalities.is_empty());
    DiagnosticResult {
        is_normal: false,
        abnormalities: findings.abnormalities,
        conditions: findings.conditions,
        causes: findings.causes,
        recommendations: findings.recommendations,
        educational_resources: findings.educational_resources,
        augmented_insight: findings.insight,
    }
}
