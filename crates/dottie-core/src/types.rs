use serde::{Deserialize, Serialize};

/// Name of the normal range that bounds the number of days between periods.
pub const CYCLE_LENGTH: &str = "CycleLength";
/// Name of the normal range that bounds the number of bleeding days.
pub const CYCLE_DURATION: &str = "CycleDuration";

pub const HIGH_SEVERITY: &str = "high";

/// One diagnostic request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomInput {
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub cycle_length: i64,
    pub cycle_duration: i64,
    pub age: i64,
    #[serde(default)]
    pub flow: String,
}

impl SymptomInput {
    /// Value the input carries for a named physiological parameter, if any.
    pub fn parameter(&self, name: &str) -> Option<i64> {
        match name {
            CYCLE_LENGTH => Some(self.cycle_length),
            CYCLE_DURATION => Some(self.cycle_duration),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalRange {
    pub name: String,
    pub min: i64,
    pub max: i64,
    pub unit: String,
}

impl NormalRange {
    /// Inclusive on both ends.
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abnormality {
    pub description: String,
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub definition: String,
    pub severity: String,
    pub requires_attention: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Condition {
    pub fn is_high_severity(&self) -> bool {
        self.severity == HIGH_SEVERITY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cause {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationalContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    pub title: String,
    pub source: String,
}

/// Final pipeline output for one request.
///
/// `recommendations` only ever holds rule-based (or the generic normal) recommendations.
/// Model output lives in `augmented_insight`; [`DiagnosticResult::merged_recommendations`]
/// is the only place the two are combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    pub is_normal: bool,
    pub abnormalities: Vec<Abnormality>,
    pub conditions: Vec<Condition>,
    pub causes: Vec<Cause>,
    pub recommendations: Vec<String>,
    pub educational_resources: Vec<EducationalContent>,
    pub augmented_insight: Option<String>,
}

impl DiagnosticResult {
    pub fn abnormality_labels(&self) -> Vec<String> {
        self.abnormalities
            .iter()
            .map(|a| a.description.clone())
            .collect()
    }

    /// Rule-based recommendations followed by the model insight, if one was obtained.
    pub fn merged_recommendations(&self) -> Vec<String> {
        let mut merged = self.recommendations.clone();
        if let Some(insight) = &self.augmented_insight {
            merged.push(insight.clone());
        }
        merged
    }
}
