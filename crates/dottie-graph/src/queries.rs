//! SurrealQL statements issued against the graph store.
//!
//! Node tables: `normal_range`, `symptom`, `condition`, `cause`, `educational_content`.
//! Edge tables: `causes` (symptom -> condition, condition -> cause) and
//! `linked_to` (condition -> educational_content). Node record keys are the entity name
//! (the URL for educational content).

/// Every known physiological reference interval, in store order.
pub const NORMAL_RANGES: &str = "SELECT name, min, max, unit FROM normal_range;";

/// Conditions reachable from any of `$symptoms` over one `causes` hop.
pub const CONDITIONS_FOR_SYMPTOMS: &str = r#"
SELECT name, definition, severity, requiresAttention, action
FROM condition
WHERE count(<-causes<-symptom[WHERE name INSIDE $symptoms]) > 0;
"#;

/// Causes reachable from any of `$conditions` over one `causes` hop. One round trip
/// covers the whole condition set.
pub const CAUSES_FOR_CONDITIONS: &str = r#"
SELECT name
FROM cause
WHERE count(<-causes<-condition[WHERE name INSIDE $conditions]) > 0;
"#;

/// Educational resources linked to any of `$conditions`.
pub const EDUCATIONAL_CONTENT_FOR_CONDITIONS: &str = r#"
SELECT content_type, url, title, source
FROM educational_content
WHERE count(<-linked_to<-condition[WHERE name INSIDE $conditions]) > 0;
"#;

/// Create or replace one node. Binds `$table`, `$key` and `$data`.
pub const UPSERT_NODE: &str = "UPSERT type::thing($table, $key) CONTENT $data RETURN NONE;";

/// Binds `$from_table`, `$from_key`, `$to_table` and `$to_key`.
pub const RELATE_CAUSES: &str = r#"
LET $from = type::thing($from_table, $from_key);
LET $to = type::thing($to_table, $to_key);
RELATE $from->causes->$to RETURN NONE;
"#;

/// Binds `$from_table`, `$from_key`, `$to_table` and `$to_key`.
pub const RELATE_LINKED_TO: &str = r#"
LET $from = type::thing($from_table, $from_key);
LET $to = type::thing($to_table, $to_key);
RELATE $from->linked_to->$to RETURN NONE;
"#;
