use crate::cache::SnapshotCache;
use crate::decode::{decode_all, FromRecord};
use crate::queries;
use dottie_core::{
    Cause, Condition, EducationalContent, GraphStore, NormalRange, QueryParams, Result,
    TriageError, CYCLE_DURATION, CYCLE_LENGTH,
};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Parameters that need a reference range before any input can be classified.
const REQUIRED_RANGES: [&str; 2] = [CYCLE_LENGTH, CYCLE_DURATION];

/// Read-only access to the triage reference data held in the graph store.
#[derive(Clone)]
pub struct ReferenceResolver {
    store: Arc<dyn GraphStore>,
    ranges_cache: Option<Arc<SnapshotCache<Vec<NormalRange>>>>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            ranges_cache: None,
        }
    }

    /// Serve normal ranges from a time-bounded snapshot. A zero TTL leaves caching off.
    pub fn with_ranges_cache(mut self, ttl: Duration) -> Self {
        self.ranges_cache = (!ttl.is_zero()).then(|| Arc::new(SnapshotCache::new(ttl)));
        self
    }

    /// All normal ranges, unfiltered, in store order.
    ///
    /// Fails with [`TriageError::Query`] when the store holds no range for one of the
    /// cycle parameters.
    #[instrument(skip(self))]
    pub async fn normal_ranges(&self) -> Result<Arc<Vec<NormalRange>>> {
        if let Some(cached) = self.ranges_cache.as_ref().and_then(|c| c.get()) {
            debug!(count = cached.len(), "normal ranges served from cache");
            return Ok(cached);
        }

        let ranges: Vec<NormalRange> = self.fetch(queries::NORMAL_RANGES, QueryParams::new()).await?;
        debug!(count = ranges.len(), "normal ranges fetched");

        let missing: Vec<&str> = REQUIRED_RANGES
            .iter()
            .copied()
            .filter(|name| !ranges.iter().any(|r| r.name == *name))
            .collect();
        if !missing.is_empty() {
            return Err(TriageError::Query(format!(
                "reference data has no normal range for {}",
                missing.join(", ")
            )));
        }

        Ok(match &self.ranges_cache {
            Some(cache) => cache.put(ranges),
            None => Arc::new(ranges),
        })
    }

    /// Conditions reachable from the reported symptoms, deduplicated by name.
    #[instrument(skip(self), fields(symptoms = symptoms.len()))]
    pub async fn conditions_for_symptoms(&self, symptoms: &[String]) -> Result<Vec<Condition>> {
        if symptoms.is_empty() {
            return Ok(Vec::new());
        }

        let params = names_param("symptoms", symptoms.iter().cloned());
        let conditions: Vec<Condition> =
            self.fetch(queries::CONDITIONS_FOR_SYMPTOMS, params).await?;
        let conditions = dedup_by_key(conditions, |c| c.name.clone());
        debug!(count = conditions.len(), "conditions resolved");
        Ok(conditions)
    }

    /// Causes of any of the given conditions, in a single traversal.
    #[instrument(skip(self, conditions), fields(conditions = conditions.len()))]
    pub async fn causes_for_conditions(&self, conditions: &[Condition]) -> Result<Vec<Cause>> {
        if conditions.is_empty() {
            return Ok(Vec::new());
        }

        let params = names_param("conditions", conditions.iter().map(|c| c.name.clone()));
        let causes: Vec<Cause> = self.fetch(queries::CAUSES_FOR_CONDITIONS, params).await?;
        let causes = dedup_by_key(causes, |c| c.name.clone());
        debug!(count = causes.len(), "causes resolved");
        Ok(causes)
    }

    #[instrument(skip(self, conditions), fields(conditions = conditions.len()))]
    pub async fn educational_content_for(
        &self,
        conditions: &[Condition],
    ) -> Result<Vec<EducationalContent>> {
        let names: Vec<String> = conditions.iter().map(|c| c.name.clone()).collect();
        self.educational_content_by_names(&names).await
    }

    /// Educational content linked to the named conditions, deduplicated by URL.
    pub async fn educational_content_by_names(
        &self,
        conditions: &[String],
    ) -> Result<Vec<EducationalContent>> {
        if conditions.is_empty() {
            return Ok(Vec::new());
        }

        let params = names_param("conditions", conditions.iter().cloned());
        let content: Vec<EducationalContent> = self
            .fetch(queries::EDUCATIONAL_CONTENT_FOR_CONDITIONS, params)
            .await?;
        Ok(dedup_by_key(content, |c| c.url.clone()))
    }

    async fn fetch<T: FromRecord>(&self, query: &str, params: QueryParams) -> Result<Vec<T>> {
        let records = self.store.execute_query(query, params).await?;
        decode_all(&records)
    }
}

fn names_param(key: &str, names: impl Iterator<Item = String>) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert(
        key.to_string(),
        JsonValue::Array(names.map(JsonValue::String).collect()),
    );
    params
}

/// Keeps the first occurrence of every key, preserving order.
fn dedup_by_key<T, K: Eq + Hash>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dottie_core::{Record, TriageError};
    use parking_lot::Mutex;

    /// Answers each known query with canned rows and records what it was asked.
    #[derive(Default)]
    struct ScriptedStore {
        ranges: Vec<Record>,
        conditions: Vec<Record>,
        causes: Vec<Record>,
        calls: Mutex<Vec<(String, QueryParams)>>,
    }

    #[async_trait]
    impl GraphStore for ScriptedStore {
        async fn execute_query(&self, query: &str, params: QueryParams) -> Result<Vec<Record>> {
            self.calls.lock().push((query.to_string(), params));
            match query {
                queries::NORMAL_RANGES => Ok(self.ranges.clone()),
                queries::CONDITIONS_FOR_SYMPTOMS => Ok(self.conditions.clone()),
                queries::CAUSES_FOR_CONDITIONS => Ok(self.causes.clone()),
                other => Err(TriageError::Query(format!("unexpected query: {other}"))),
            }
        }
    }

    fn condition_row(name: &str, severity: &str) -> Record {
        Record::new()
            .with("name", name)
            .with("definition", "")
            .with("severity", severity)
            .with("requiresAttention", "true")
    }

    fn condition(name: &str) -> Condition {
        Condition {
            name: name.to_string(),
            definition: String::new(),
            severity: "low".to_string(),
            requires_attention: false,
            action: None,
        }
    }

    #[tokio::test]
    async fn ranges_keep_store_order() {
        let store = Arc::new(ScriptedStore {
            ranges: vec![
                Record::new().with("name", "CycleDuration").with("min", 3).with("max", 7),
                Record::new().with("name", "CycleLength").with("min", "21").with("max", "45"),
            ],
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store);
        let ranges = resolver.normal_ranges().await.unwrap();
        let names: Vec<_> = ranges.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["CycleDuration", "CycleLength"]);
    }

    fn acog_ranges() -> Vec<Record> {
        vec![
            Record::new().with("name", "CycleLength").with("min", 21).with("max", 45),
            Record::new().with("name", "CycleDuration").with("min", 3).with("max", 7),
        ]
    }

    #[tokio::test]
    async fn cached_ranges_skip_the_store() {
        let store = Arc::new(ScriptedStore {
            ranges: acog_ranges(),
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone()).with_ranges_cache(Duration::from_secs(60));
        resolver.normal_ranges().await.unwrap();
        resolver.normal_ranges().await.unwrap();
        assert_eq!(store.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn empty_range_set_is_a_query_error() {
        let store = Arc::new(ScriptedStore::default());
        let resolver = ReferenceResolver::new(store);
        let err = resolver.normal_ranges().await.unwrap_err();
        assert!(
            matches!(&err, TriageError::Query(msg) if msg.contains("CycleLength") && msg.contains("CycleDuration")),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn missing_duration_range_is_rejected_and_not_cached() {
        let store = Arc::new(ScriptedStore {
            ranges: vec![Record::new().with("name", "CycleLength").with("min", 21).with("max", 45)],
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone()).with_ranges_cache(Duration::from_secs(60));
        for _ in 0..2 {
            let err = resolver.normal_ranges().await.unwrap_err();
            assert!(matches!(err, TriageError::Query(msg) if msg.ends_with("CycleDuration")));
        }
        assert_eq!(store.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn conditions_are_deduplicated_by_name() {
        let store = Arc::new(ScriptedStore {
            conditions: vec![
                condition_row("Menorrhagia", "high"),
                condition_row("Oligomenorrhea", "moderate"),
                condition_row("Menorrhagia", "high"),
            ],
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone());
        let symptoms = vec!["Heavy bleeding".to_string(), "Fatigue".to_string()];
        let conditions = resolver.conditions_for_symptoms(&symptoms).await.unwrap();
        let names: Vec<_> = conditions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Menorrhagia", "Oligomenorrhea"]);

        let calls = store.calls.lock();
        assert_eq!(
            calls[0].1.get("symptoms"),
            Some(&serde_json::json!(["Heavy bleeding", "Fatigue"]))
        );
    }

    #[tokio::test]
    async fn empty_inputs_issue_no_queries() {
        let store = Arc::new(ScriptedStore::default());
        let resolver = ReferenceResolver::new(store.clone());
        assert!(resolver.conditions_for_symptoms(&[]).await.unwrap().is_empty());
        assert!(resolver.causes_for_conditions(&[]).await.unwrap().is_empty());
        assert!(resolver.educational_content_for(&[]).await.unwrap().is_empty());
        assert!(store.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn causes_use_one_round_trip_for_all_conditions() {
        let store = Arc::new(ScriptedStore {
            causes: vec![
                Record::new().with("name", "Hormonal imbalance"),
                Record::new().with("name", "Thyroid disorder"),
                Record::new().with("name", "Hormonal imbalance"),
            ],
            ..Default::default()
        });
        let resolver = ReferenceResolver::new(store.clone());
        let causes = resolver
            .causes_for_conditions(&[condition("Amenorrhea"), condition("Oligomenorrhea")])
            .await
            .unwrap();
        assert_eq!(causes.len(), 2);
        let calls = store.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].1.get("conditions"),
            Some(&serde_json::json!(["Amenorrhea", "Oligomenorrhea"]))
        );
    }

    #[tokio::test]
    async fn content_lookup_by_name_binds_the_condition_list() {
        let store = Arc::new(ScriptedStore::default());
        let resolver = ReferenceResolver::new(store.clone());
        let _ = resolver
            .educational_content_by_names(&["Menorrhagia".to_string()])
            .await;
        let calls = store.calls.lock();
        assert_eq!(calls[0].0, queries::EDUCATIONAL_CONTENT_FOR_CONDITIONS);
        assert_eq!(
            calls[0].1.get("conditions"),
            Some(&serde_json::json!(["Menorrhagia"]))
        );
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let store = Arc::new(ScriptedStore::default());
        let resolver = ReferenceResolver::new(store);
        let err = resolver
            .educational_content_for(&[condition("Amenorrhea")])
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Query(_)));
    }
}
