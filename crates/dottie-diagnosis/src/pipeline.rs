use crate::assembler::{self, AbnormalFindings};
use crate::{abnormality, recommendation, validator};
use dottie_ai::DiagnosticAugmenter;
use dottie_core::{DiagnosticResult, GraphStore, PipelineConfig, Result, SymptomInput, TriageError};
use dottie_graph::ReferenceResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Time kept back from the model call for assembling the result.
const ASSEMBLY_HEADROOM: Duration = Duration::from_millis(10);

/// End-to-end triage of one request: validate, check ranges, and on the abnormal path
/// resolve conditions, causes, recommendations, resources and model insight.
///
/// Requests share nothing but the collaborators, so one pipeline serves any number of
/// concurrent callers.
pub struct DiagnosticPipeline {
    resolver: ReferenceResolver,
    augmenter: Option<DiagnosticAugmenter>,
    request_timeout: Duration,
    speculative_condition_lookup: bool,
}

impl DiagnosticPipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        augmenter: Option<DiagnosticAugmenter>,
        config: &PipelineConfig,
    ) -> Self {
        let resolver = ReferenceResolver::new(store)
            .with_ranges_cache(Duration::from_secs(config.ranges_cache_ttl_secs));
        Self {
            resolver,
            augmenter,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            speculative_condition_lookup: config.speculative_condition_lookup,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reference data lookups outside a triage run.
    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    pub fn augmentation_enabled(&self) -> bool {
        self.augmenter.is_some()
    }

    pub async fn run(&self, input: &SymptomInput) -> Result<DiagnosticResult> {
        self.run_with_cancel(input, CancellationToken::new()).await
    }

    /// Runs under the request deadline. Expiry or cancellation drops all in-flight work
    /// and no partial result is returned.
    pub async fn run_with_cancel(
        &self,
        input: &SymptomInput,
        cancel: CancellationToken,
    ) -> Result<DiagnosticResult> {
        let timeout_ms = self.request_timeout.as_millis() as u64;
        let deadline = Instant::now() + self.request_timeout;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("diagnostic request cancelled");
                Err(TriageError::Cancelled)
            }
            outcome = tokio::time::timeout_at(deadline, self.resolve(input, deadline)) => {
                outcome.unwrap_or_else(|_| {
                    warn!(timeout_ms, "diagnostic request timed out");
                    Err(TriageError::Timeout(timeout_ms))
                })
            }
        }
    }

    #[instrument(
        skip(self, input, deadline),
        fields(
            symptoms = input.symptoms.len(),
            cycle_length = input.cycle_length,
            cycle_duration = input.cycle_duration
        )
    )]
    async fn resolve(&self, input: &SymptomInput, deadline: Instant) -> Result<DiagnosticResult> {
        validator::validate(input)?;

        let (ranges, early_conditions) = if self.speculative_condition_lookup {
            let (ranges, conditions) = tokio::join!(
                self.resolver.normal_ranges(),
                self.resolver.conditions_for_symptoms(&input.symptoms)
            );
            (ranges?, Some(conditions))
        } else {
            (self.resolver.normal_ranges().await?, None)
        };

        let abnormalities = abnormality::detect(input, &ranges);
        if abnormalities.is_empty() {
            info!("cycle within normal ranges");
            return Ok(assembler::normal());
        }
        debug!(count = abnormalities.len(), "abnormalities detected");

        let conditions = match early_conditions {
            Some(conditions) => conditions?,
            None => self.resolver.conditions_for_symptoms(&input.symptoms).await?,
        };
        let causes = self.resolver.causes_for_conditions(&conditions).await?;
        let recommendations = recommendation::recommend(&conditions);

        let educational_resources = self
            .resolver
            .educational_content_for(&conditions)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "educational content lookup failed; omitting resources");
                Vec::new()
            });

        let insight = self.augment(input, deadline).await;

        info!(
            abnormalities = abnormalities.len(),
            conditions = conditions.len(),
            causes = causes.len(),
            insight = insight.is_some(),
            "abnormal cycle triaged"
        );

        Ok(assembler::abnormal(AbnormalFindings {
            abnormalities,
            conditions,
            causes,
            recommendations,
            educational_resources,
            insight,
        }))
    }

    /// The model call is bounded by whatever is left of the request deadline.
    async fn augment(&self, input: &SymptomInput, deadline: Instant) -> Option<String> {
        let augmenter = self.augmenter.as_ref()?;
        let budget = deadline
            .saturating_duration_since(Instant::now())
            .saturating_sub(ASSEMBLY_HEADROOM);
        match augmenter.augment_within(input, budget).await {
            Ok(insight) => Some(insight),
            Err(e) => {
                warn!(error = %e, "augmentation failed; returning result without insight");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abnormality::{ABNORMAL_CYCLE_DURATION, ABNORMAL_CYCLE_LENGTH};
    use crate::recommendation::{MONITOR, NO_ACTION_NEEDED, SEEK_ATTENTION};
    use async_trait::async_trait;
    use dottie_ai::{GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message};
    use dottie_core::{QueryParams, Record};
    use dottie_graph::queries;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeStore {
        ranges: Vec<Record>,
        conditions: Vec<Record>,
        causes: Vec<Record>,
        content: Vec<Record>,
        fail_on: Option<&'static str>,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeStore {
        fn standard() -> Self {
            Self {
                ranges: vec![
                    Record::new()
                        .with("name", "CycleLength")
                        .with("min", 21)
                        .with("max", 45)
                        .with("unit", "days"),
                    Record::new()
                        .with("name", "CycleDuration")
                        .with("min", "3")
                        .with("max", "7")
                        .with("unit", "days"),
                ],
                ..Default::default()
            }
        }

        fn with_clinical_data(mut self) -> Self {
            self.conditions = vec![
                Record::new()
                    .with("name", "Menorrhagia")
                    .with("definition", "Heavy menstrual bleeding")
                    .with("severity", "high")
                    .with("requiresAttention", true),
                Record::new()
                    .with("name", "Polymenorrhea")
                    .with("definition", "Cycles shorter than 21 days")
                    .with("severity", "moderate")
                    .with("requiresAttention", "False"),
            ];
            self.causes = vec![
                Record::new().with("name", "Hormonal imbalance"),
                Record::new().with("name", "Uterine fibroids"),
            ];
            self.content = vec![Record::new()
                .with("content_type", "Article")
                .with("url", "https://www.acog.org/womens-health/faqs/heavy-menstrual-bleeding")
                .with("title", "Heavy Menstrual Bleeding")
                .with("source", "ACOG")];
            self
        }

        fn queries_issued(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl GraphStore for FakeStore {
        async fn execute_query(&self, query: &str, _params: QueryParams) -> Result<Vec<Record>> {
            self.calls.lock().push(query.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on == Some(query) {
                return Err(TriageError::Query("connection refused".into()));
            }
            match query {
                queries::NORMAL_RANGES => Ok(self.ranges.clone()),
                queries::CONDITIONS_FOR_SYMPTOMS => Ok(self.conditions.clone()),
                queries::CAUSES_FOR_CONDITIONS => Ok(self.causes.clone()),
                queries::EDUCATIONAL_CONTENT_FOR_CONDITIONS => Ok(self.content.clone()),
                other => Err(TriageError::Query(format!("unexpected query: {other}"))),
            }
        }
    }

    #[derive(Default)]
    struct FakeModel {
        fail: bool,
        hang: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMProvider for FakeModel {
        async fn generate_chat(
            &self,
            _messages: &[Message],
            _config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail {
                return Err(anyhow::anyhow!("503 Service Unavailable"));
            }
            Ok(LLMResponse {
                content: "```json\n[\"Possible thyroid dysfunction: moderate\"]\n```".into(),
                total_tokens: None,
                finish_reason: Some("stop".into()),
                model: "fake".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "fake"
        }

        fn model_name(&self) -> &str {
            "fake"
        }
    }

    fn request(cycle_length: i64, cycle_duration: i64, symptoms: &[&str]) -> SymptomInput {
        SymptomInput {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            cycle_length,
            cycle_duration,
            age: 25,
            flow: "heavy".into(),
        }
    }

    fn pipeline(store: Arc<FakeStore>, model: Option<Arc<FakeModel>>) -> DiagnosticPipeline {
        pipeline_with(store, model, PipelineConfig::default())
    }

    fn pipeline_with(
        store: Arc<FakeStore>,
        model: Option<Arc<FakeModel>>,
        config: PipelineConfig,
    ) -> DiagnosticPipeline {
        let augmenter = model.map(|m| {
            let provider: Arc<dyn LLMProvider> = m;
            DiagnosticAugmenter::new(provider, Duration::from_secs(5))
        });
        DiagnosticPipeline::new(store, augmenter, &config)
    }

    #[tokio::test]
    async fn normal_cycle_needs_no_action() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let model = Arc::new(FakeModel::default());
        let result = pipeline(store.clone(), Some(model.clone()))
            .run(&request(28, 5, &["Dysmenorrhea"]))
            .await
            .unwrap();

        assert!(result.is_normal);
        assert!(result.abnormalities.is_empty());
        assert!(result.conditions.is_empty());
        assert_eq!(result.recommendations, vec![NO_ACTION_NEEDED]);
        assert!(result.augmented_insight.is_none());
        assert_eq!(store.queries_issued(), vec![queries::NORMAL_RANGES]);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_cycle_without_symptoms() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let result = pipeline(store.clone(), None)
            .run(&request(10, 5, &[]))
            .await
            .unwrap();

        assert!(!result.is_normal);
        assert_eq!(result.abnormality_labels(), vec![ABNORMAL_CYCLE_LENGTH]);
        assert!(result.conditions.is_empty());
        assert!(result.causes.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(store.queries_issued(), vec![queries::NORMAL_RANGES]);
    }

    #[tokio::test]
    async fn abnormal_cycle_with_symptoms_is_fully_resolved() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let model = Arc::new(FakeModel::default());
        let result = pipeline(store.clone(), Some(model.clone()))
            .run(&request(18, 9, &["Heavy bleeding"]))
            .await
            .unwrap();

        assert_eq!(
            result.abnormality_labels(),
            vec![ABNORMAL_CYCLE_LENGTH, ABNORMAL_CYCLE_DURATION]
        );
        assert_eq!(result.conditions.len(), 2);
        assert!(result.conditions[0].requires_attention);
        assert!(!result.conditions[1].requires_attention);
        assert_eq!(result.recommendations, vec![SEEK_ATTENTION, MONITOR]);
        assert_eq!(result.causes.len(), 2);
        assert_eq!(result.educational_resources.len(), 1);
        assert_eq!(
            result.augmented_insight.as_deref(),
            Some("[\"Possible thyroid dysfunction: moderate\"]")
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let issued = store.queries_issued();
        assert_eq!(
            issued
                .iter()
                .filter(|q| q.as_str() == queries::CAUSES_FOR_CONDITIONS)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_query() {
        let store = Arc::new(FakeStore::standard());
        let err = pipeline(store.clone(), None)
            .run(&request(0, 5, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
        assert!(store.queries_issued().is_empty());
    }

    #[tokio::test]
    async fn range_store_failure_is_fatal() {
        let store = Arc::new(FakeStore {
            fail_on: Some(queries::NORMAL_RANGES),
            ..FakeStore::standard()
        });
        let err = pipeline(store, None)
            .run(&request(28, 5, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Query(_)));
    }

    #[tokio::test]
    async fn missing_reference_ranges_are_an_error_not_a_normal_result() {
        let store = Arc::new(FakeStore::default());
        let err = pipeline(store.clone(), None)
            .run(&request(2, 90, &["Heavy bleeding"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Query(_)));
        assert_eq!(store.queries_issued(), vec![queries::NORMAL_RANGES]);
    }

    #[tokio::test]
    async fn cause_store_failure_is_fatal() {
        let store = Arc::new(FakeStore {
            fail_on: Some(queries::CAUSES_FOR_CONDITIONS),
            ..FakeStore::standard().with_clinical_data()
        });
        let err = pipeline(store, None)
            .run(&request(10, 5, &["Heavy bleeding"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Query(_)));
    }

    #[tokio::test]
    async fn undecodable_condition_is_a_parse_error() {
        let mut store = FakeStore::standard();
        store.conditions = vec![Record::new()
            .with("name", "Amenorrhea")
            .with("severity", "high")
            .with("requiresAttention", "maybe")];
        let err = pipeline(Arc::new(store), None)
            .run(&request(60, 5, &["Missed periods"]))
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Parse(_)));
    }

    #[tokio::test]
    async fn model_failure_keeps_graph_result() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let model = Arc::new(FakeModel {
            fail: true,
            ..Default::default()
        });
        let result = pipeline(store, Some(model))
            .run(&request(18, 5, &["Heavy bleeding"]))
            .await
            .unwrap();
        assert!(!result.is_normal);
        assert_eq!(result.conditions.len(), 2);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.augmented_insight.is_none());
    }

    #[tokio::test]
    async fn educational_content_failure_is_not_fatal() {
        let store = Arc::new(FakeStore {
            fail_on: Some(queries::EDUCATIONAL_CONTENT_FOR_CONDITIONS),
            ..FakeStore::standard().with_clinical_data()
        });
        let result = pipeline(store, None)
            .run(&request(18, 5, &["Heavy bleeding"]))
            .await
            .unwrap();
        assert_eq!(result.conditions.len(), 2);
        assert!(result.educational_resources.is_empty());
    }

    #[tokio::test]
    async fn identical_requests_give_identical_results() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let pipeline = pipeline(store, None);
        let input = request(50, 5, &["Heavy bleeding"]);
        let first = pipeline.run(&input).await.unwrap();
        let second = pipeline.run(&input).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn slow_store_hits_the_deadline() {
        let store = Arc::new(FakeStore {
            delay: Some(Duration::from_millis(500)),
            ..FakeStore::standard()
        });
        let pipeline = pipeline(store, None).with_request_timeout(Duration::from_millis(20));
        let err = pipeline.run(&request(28, 5, &[])).await.unwrap_err();
        assert!(matches!(err, TriageError::Timeout(20)));
    }

    #[tokio::test]
    async fn cancelled_request_returns_nothing() {
        let store = Arc::new(FakeStore::standard());
        let token = CancellationToken::new();
        token.cancel();
        let err = pipeline(store, None)
            .run_with_cancel(&request(28, 5, &[]), token)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_abandons_the_in_flight_query() {
        let store = Arc::new(FakeStore {
            delay: Some(Duration::from_millis(300)),
            ..FakeStore::standard().with_clinical_data()
        });
        let pipeline = pipeline(store.clone(), None);
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let started = std::time::Instant::now();
        let err = pipeline
            .run_with_cancel(&request(10, 5, &["Heavy bleeding"]), token)
            .await
            .unwrap_err();
        assert!(matches!(err, TriageError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(300));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.queries_issued(), vec![queries::NORMAL_RANGES]);
    }

    #[tokio::test]
    async fn slow_model_is_cut_to_the_remaining_deadline() {
        let store = Arc::new(FakeStore {
            delay: Some(Duration::from_millis(50)),
            ..FakeStore::standard().with_clinical_data()
        });
        let model = Arc::new(FakeModel {
            hang: true,
            ..Default::default()
        });
        let pipeline = pipeline(store, Some(model.clone()))
            .with_request_timeout(Duration::from_millis(500));

        let result = pipeline
            .run(&request(18, 5, &["Heavy bleeding"]))
            .await
            .unwrap();
        assert!(!result.is_normal);
        assert_eq!(result.conditions.len(), 2);
        assert!(result.augmented_insight.is_none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn speculative_lookup_ignores_condition_failure_on_normal_path() {
        let store = Arc::new(FakeStore {
            fail_on: Some(queries::CONDITIONS_FOR_SYMPTOMS),
            ..FakeStore::standard()
        });
        let config = PipelineConfig {
            speculative_condition_lookup: true,
            ..Default::default()
        };
        let pipeline = pipeline_with(store.clone(), None, config);

        let result = pipeline.run(&request(28, 5, &["Cramps"])).await.unwrap();
        assert!(result.is_normal);
        assert!(store
            .queries_issued()
            .contains(&queries::CONDITIONS_FOR_SYMPTOMS.to_string()));

        let err = pipeline.run(&request(10, 5, &["Cramps"])).await.unwrap_err();
        assert!(matches!(err, TriageError::Query(_)));
    }

    #[tokio::test]
    async fn speculative_lookup_reuses_early_conditions() {
        let store = Arc::new(FakeStore::standard().with_clinical_data());
        let config = PipelineConfig {
            speculative_condition_lookup: true,
            ..Default::default()
        };
        let result = pipeline_with(store.clone(), None, config)
            .run(&request(18, 5, &["Heavy bleeding"]))
            .await
            .unwrap();
        assert_eq!(result.conditions.len(), 2);
        let condition_queries = store
            .queries_issued()
            .iter()
            .filter(|q| q.as_str() == queries::CONDITIONS_FOR_SYMPTOMS)
            .count();
        assert_eq!(condition_queries, 1);
    }
}
