//! Table and index definitions for the triage graph.

use dottie_core::{GraphStore, QueryParams, Result};
use tracing::info;

/// Node tables with their unique lookup field.
const NODE_TABLES: &[(&str, &str)] = &[
    ("normal_range", "name"),
    ("symptom", "name"),
    ("condition", "name"),
    ("cause", "name"),
    ("educational_content", "url"),
];

const EDGE_TABLES: &[&str] = &["causes", "linked_to"];

/// SurrealQL that defines every table and index. Safe to run repeatedly.
pub fn definitions() -> String {
    let mut sql = String::new();
    for (table, key) in NODE_TABLES {
        sql.push_str(&format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;\n"));
        sql.push_str(&format!(
            "DEFINE INDEX IF NOT EXISTS idx_{table}_{key} ON TABLE {table} FIELDS {key} UNIQUE;\n"
        ));
    }
    for edge in EDGE_TABLES {
        sql.push_str(&format!(
            "DEFINE TABLE IF NOT EXISTS {edge} TYPE RELATION SCHEMALESS;\n"
        ));
    }
    sql
}

pub async fn ensure(store: &dyn GraphStore) -> Result<()> {
    store.execute_query(&definitions(), QueryParams::new()).await?;
    info!(
        node_tables = NODE_TABLES.len(),
        edge_tables = EDGE_TABLES.len(),
        "Graph schema ensured"
    );
    Ok(())
}
