//! One-shot population of the graph store from a JSON reference document.

use crate::queries;
use dottie_core::{GraphStore, QueryParams, Result, TriageError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedDocument {
    #[serde(default)]
    pub normal_ranges: Vec<SeedNormalRange>,
    #[serde(default)]
    pub conditions: Vec<SeedCondition>,
    #[serde(default)]
    pub symptoms: Vec<SeedSymptom>,
    #[serde(default)]
    pub causes: Vec<SeedCause>,
    #[serde(default)]
    pub educational_content: Vec<SeedEducationalContent>,
    #[serde(default)]
    pub relationships: Vec<SeedRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedNormalRange {
    pub name: String,
    pub min: i64,
    pub max: i64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCondition {
    pub name: String,
    #[serde(default)]
    pub definition: String,
    pub severity: String,
    #[serde(default)]
    pub requires_attention: bool,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSymptom {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCause {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedEducationalContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
}

/// Directed edge between two named nodes, e.g. `Symptom "Heavy bleeding" -CAUSES-> Condition "Menorrhagia"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRelationship {
    pub start_label: String,
    pub start_node: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub end_label: String,
    pub end_node: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Causes,
    LinkedTo,
}

impl SeedRelationship {
    /// Table names and edge statement, checked against the edges the triage queries traverse.
    fn plan(&self) -> Result<(&'static str, &'static str, EdgeKind)> {
        let from = node_table(&self.start_label)?;
        let to = node_table(&self.end_label)?;
        let kind = match self.rel_type.to_ascii_uppercase().as_str() {
            "CAUSES" => EdgeKind::Causes,
            "LINKED_TO" => EdgeKind::LinkedTo,
            other => {
                return Err(TriageError::InvalidData(format!(
                    "unknown relationship type '{}'",
                    other
                )))
            }
        };
        let allowed = matches!(
            (from, kind, to),
            ("symptom", EdgeKind::Causes, "condition")
                | ("condition", EdgeKind::Causes, "cause")
                | ("condition", EdgeKind::LinkedTo, "educational_content")
        );
        if !allowed {
            return Err(TriageError::InvalidData(format!(
                "relationship {} -{}-> {} is not supported",
                self.start_label, self.rel_type, self.end_label
            )));
        }
        Ok((from, to, kind))
    }
}

fn node_table(label: &str) -> Result<&'static str> {
    match label {
        "NormalRange" => Ok("normal_range"),
        "Symptom" => Ok("symptom"),
        "Condition" => Ok("condition"),
        "Cause" => Ok("cause"),
        "EducationalContent" => Ok("educational_content"),
        other => Err(TriageError::InvalidData(format!(
            "unknown node label '{}'",
            other
        ))),
    }
}

/// Number of entities written per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub normal_ranges: usize,
    pub conditions: usize,
    pub symptoms: usize,
    pub causes: usize,
    pub educational_content: usize,
    pub relationships: usize,
}

impl SeedDocument {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let document: SeedDocument = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            normal_ranges = document.normal_ranges.len(),
            conditions = document.conditions.len(),
            symptoms = document.symptoms.len(),
            causes = document.causes.len(),
            educational_content = document.educational_content.len(),
            relationships = document.relationships.len(),
            "Loaded seed document"
        );
        Ok(document)
    }

    pub fn validate(&self) -> Result<()> {
        for range in &self.normal_ranges {
            if range.min > range.max {
                return Err(TriageError::InvalidData(format!(
                    "normal range '{}' has min {} above max {}",
                    range.name, range.min, range.max
                )));
            }
        }
        for relationship in &self.relationships {
            relationship.plan()?;
        }
        Ok(())
    }

    /// Write every entity, then every relationship. Nothing is written when validation fails.
    pub async fn apply(&self, store: &dyn GraphStore) -> Result<SeedReport> {
        self.validate()?;
        let mut report = SeedReport::default();

        for range in &self.normal_ranges {
            upsert(store, "normal_range", &range.name, json!({
                "name": range.name,
                "min": range.min,
                "max": range.max,
                "unit": range.unit,
            }))
            .await?;
            report.normal_ranges += 1;
        }

        for condition in &self.conditions {
            upsert(store, "condition", &condition.name, json!({
                "name": condition.name,
                "definition": condition.definition,
                "severity": condition.severity,
                "requiresAttention": condition.requires_attention,
                "action": condition.action,
            }))
            .await?;
            report.conditions += 1;
        }

        for symptom in &self.symptoms {
            upsert(store, "symptom", &symptom.name, json!({
                "name": symptom.name,
                "description": symptom.description,
                "severity": symptom.severity,
            }))
            .await?;
            report.symptoms += 1;
        }

        for cause in &self.causes {
            upsert(store, "cause", &cause.name, json!({
                "name": cause.name,
                "description": cause.description,
            }))
            .await?;
            report.causes += 1;
        }

        for content in &self.educational_content {
            upsert(store, "educational_content", &content.url, json!({
                "content_type": content.content_type,
                "url": content.url,
                "title": content.title,
                "source": content.source,
            }))
            .await?;
            report.educational_content += 1;
        }

        for relationship in &self.relationships {
            let (from, to, kind) = relationship.plan()?;
            let statement = match kind {
                EdgeKind::Causes => queries::RELATE_CAUSES,
                EdgeKind::LinkedTo => queries::RELATE_LINKED_TO,
            };
            let mut params = QueryParams::new();
            params.insert("from_table".into(), from.into());
            params.insert("from_key".into(), relationship.start_node.clone().into());
            params.insert("to_table".into(), to.into());
            params.insert("to_key".into(), relationship.end_node.clone().into());
            store.execute_query(statement, params).await?;
            report.relationships += 1;
        }

        info!(?report, "Graph store seeded");
        Ok(report)
    }
}

async fn upsert(store: &dyn GraphStore, table: &str, key: &str, data: JsonValue) -> Result<()> {
    debug!(table, key, "upserting node");
    let mut params = QueryParams::new();
    params.insert("table".into(), table.into());
    params.insert("key".into(), key.into());
    params.insert("data".into(), data);
    store.execute_query(queries::UPSERT_NODE, params).await?;
    Ok(())
}
