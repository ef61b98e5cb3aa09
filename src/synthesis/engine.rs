//! The synthesis attempt loop.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::types::{
    RetryReason, Step, SynthesisConfig, SynthesisContext, SynthesisOutcome, SynthesisRequest,
    SynthesisState,
};
use crate::audit::{CandidateSelectionAudit, RunId, SharedAuditLog, ValidationAudit};
use crate::cache::{CacheEntry, CacheLookup, CacheStore};
use crate::constraint::{
    compile_heuristic, derive_from_component, merge, validate_value, CandidateDefinition,
    Constraint,
};
use crate::error::{Error, Result};
use crate::oracle::{parse_response, Oracle, OracleReply, PromptBuilder};
use crate::predicate::{PredicateRegistry, PredicateRegistryEntry, SharedPredicateRegistry};
use crate::scoring::{is_confident, CandidateScore, CandidateScorer};

/// Mutable state carried across the attempts of one run.
struct RunState {
    run_id: RunId,
    constraints: Vec<Constraint>,
    heuristics: Vec<CandidateDefinition>,
    feedback: Option<String>,
}

/// What a successful attempt produced.
struct Accepted {
    value: Value,
    ranked: Vec<CandidateScore>,
    selection: Option<CandidateSelectionAudit>,
}

/// Drives the oracle until a proposed value validates or the budget runs out.
///
/// Collaborators are injected: one registry, audit log and cache store per
/// build, shared by every bundle synthesized in it.
pub struct Synthesizer {
    oracle: Arc<dyn Oracle>,
    registry: SharedPredicateRegistry,
    audit: SharedAuditLog,
    cache: Option<CacheStore>,
    scorer: CandidateScorer,
    config: SynthesisConfig,
}

impl Synthesizer {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        registry: SharedPredicateRegistry,
        audit: SharedAuditLog,
        config: SynthesisConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            oracle,
            registry,
            audit,
            cache: config.cache_dir.as_ref().map(CacheStore::new),
            scorer: CandidateScorer::new(config.weights),
            config,
        })
    }

    /// Build with a registry opened from `config.registry_path` (or in-memory).
    pub fn from_config(
        oracle: Arc<dyn Oracle>,
        audit: SharedAuditLog,
        config: SynthesisConfig,
    ) -> Result<Self> {
        let registry = match &config.registry_path {
            Some(path) => PredicateRegistry::open(path)?,
            None => PredicateRegistry::new(),
        };
        Self::new(oracle, registry.into_shared(), audit, config)
    }

    pub fn with_cache(mut self, store: CacheStore) -> Self {
        self.cache = Some(store);
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    pub fn registry(&self) -> &SharedPredicateRegistry {
        &self.registry
    }

    pub fn audit_log(&self) -> &SharedAuditLog {
        &self.audit
    }

    /// Synthesize a value for one bundle.
    ///
    /// A cached value is returned without calling the oracle when its
    /// fingerprint matches and it still satisfies the current constraints.
    #[instrument(skip(self, request, ctx), fields(type_text = %request.type_text, oracle = %self.oracle.name()))]
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        ctx: &SynthesisContext,
    ) -> Result<SynthesisOutcome> {
        let mut state = RunState {
            run_id: RunId::new(),
            constraints: derive_from_component(&request.spec),
            heuristics: Vec::new(),
            feedback: None,
        };
        adopt_heuristics(&mut state, &ctx.previous_heuristics);

        if let Some(outcome) = self.try_cache(request, &state).await {
            return Ok(outcome);
        }

        for attempt in 1..=self.config.max_attempts {
            match self.attempt(request, ctx, &mut state, attempt).await {
                Step::Continue(accepted) => {
                    self.record_validation(ValidationAudit::passed(
                        state.run_id,
                        &request.type_text,
                        attempt,
                    ))
                    .await;
                    debug!(attempt, state = %SynthesisState::Succeeded);

                    let outcome = SynthesisOutcome {
                        run_id: state.run_id,
                        value: accepted.value,
                        heuristics: state.heuristics,
                        constraints: state.constraints,
                        ranked_candidates: accepted.ranked,
                        candidate_selection_audit: accepted.selection,
                        attempts: attempt,
                        from_cache: false,
                    };
                    self.persist(request, &outcome).await;
                    info!(
                        "Synthesized value for '{}' in {} attempt(s)",
                        request.type_text, attempt
                    );
                    return Ok(outcome);
                }
                Step::Retry(reason) => {
                    let feedback = reason.feedback();
                    self.record_validation(ValidationAudit::failed(
                        state.run_id,
                        &request.type_text,
                        attempt,
                        reason.errors(),
                        feedback.clone(),
                    ))
                    .await;
                    info!(attempt, state = %reason.state(), "Attempt rejected: {:?}", reason);
                    state.feedback = Some(feedback);
                }
            }
        }

        warn!(
            state = %SynthesisState::Exhausted,
            "No valid value for '{}' after {} attempts",
            request.type_text, self.config.max_attempts
        );
        Err(Error::exhausted(&request.type_text, self.config.max_attempts))
    }

    async fn try_cache(&self, request: &SynthesisRequest, state: &RunState) -> Option<SynthesisOutcome> {
        let store = self.cache.as_ref()?;
        let entry = match store.lookup(&request.type_text, &request.fingerprint).await {
            CacheLookup::Hit(entry) => entry,
            CacheLookup::Stale(entry) => {
                info!(
                    "Cache entry for '{}' is stale (fingerprint {} != {})",
                    request.type_text, entry.fingerprint, request.fingerprint
                );
                return None;
            }
            CacheLookup::Miss => {
                debug!("Cache miss for '{}'", request.type_text);
                return None;
            }
        };

        let mut cached = RunState {
            run_id: state.run_id,
            constraints: state.constraints.clone(),
            heuristics: state.heuristics.clone(),
            feedback: None,
        };
        adopt_heuristics(&mut cached, entry.heuristics.as_deref().unwrap_or_default());

        if let Err(errors) = validate_value(&cached.constraints, &entry.value) {
            info!(
                "Cached value for '{}' no longer validates: {}",
                request.type_text,
                errors.join("; ")
            );
            return None;
        }

        debug!("Cache hit for '{}'", request.type_text);
        Some(SynthesisOutcome {
            run_id: cached.run_id,
            value: entry.value,
            heuristics: cached.heuristics,
            constraints: cached.constraints,
            ranked_candidates: Vec::new(),
            candidate_selection_audit: self
                .audit
                .read()
                .await
                .latest_candidate_selection(&request.type_text)
                .cloned(),
            attempts: 0,
            from_cache: true,
        })
    }

    async fn attempt(
        &self,
        request: &SynthesisRequest,
        ctx: &SynthesisContext,
        state: &mut RunState,
        attempt: u32,
    ) -> Step<Accepted> {
        debug!(attempt, state = %SynthesisState::Requesting);
        let registered: Vec<PredicateRegistryEntry> =
            self.registry.read().await.entries().cloned().collect();
        let oracle_request = PromptBuilder::new(&request.type_text, &request.spec)
            .constraints(&state.constraints)
            .heuristics(&state.heuristics)
            .registered(&registered)
            .feedback(state.feedback.as_deref())
            .context(ctx.context.as_deref())
            .build();

        let text = match self.oracle.generate(&oracle_request).await {
            Ok(text) if text.trim().is_empty() => {
                return Step::Retry(RetryReason::Transport("empty response".to_string()))
            }
            Ok(text) => text,
            Err(e) => return Step::Retry(RetryReason::Transport(e.to_string())),
        };

        debug!(attempt, state = %SynthesisState::Parsing);
        let proposal = match parse_response(&text) {
            Ok(OracleReply::Proposal(proposal)) => proposal,
            Ok(OracleReply::Infeasible { explanation }) => {
                return Step::Retry(RetryReason::Infeasible(explanation))
            }
            Err(e) => return Step::Retry(RetryReason::Parse(e.to_string())),
        };

        debug!(attempt, state = %SynthesisState::Scoring);
        let mut ranking_set = proposal.candidate_validators.clone();
        ranking_set.extend(proposal.heuristics.iter().cloned());
        let mut samples = request.spec.examples.clone();
        samples.push(proposal.value.clone());

        let ranked = self.scorer.rank(&ranking_set, &state.constraints, &samples);
        let selection = match ranked.first() {
            None => None,
            Some(best) => {
                let reason = if is_confident(best.total_score, self.config.confidence_threshold) {
                    format!("'{}' ranked highest ({:.2})", best.candidate.name, best.total_score)
                } else {
                    format!(
                        "'{}' ranked highest ({:.2}) but below confidence threshold {:.2}",
                        best.candidate.name, best.total_score, self.config.confidence_threshold
                    )
                };
                let audit = CandidateSelectionAudit::from_ranking(
                    state.run_id,
                    &request.type_text,
                    attempt,
                    ranked.clone(),
                    reason,
                );
                self.audit
                    .write()
                    .await
                    .record_candidate_selection(audit.clone());
                Some(audit)
            }
        };

        let accepted = adopt_heuristics(state, &proposal.heuristics);
        self.register_heuristics(&request.type_text, ctx, &accepted, &ranked)
            .await;

        debug!(attempt, state = %SynthesisState::Validating);
        match validate_value(&state.constraints, &proposal.value) {
            Ok(()) => Step::Continue(Accepted {
                value: proposal.value,
                ranked,
                selection,
            }),
            Err(errors) => Step::Retry(RetryReason::Validation {
                value: proposal.value,
                errors,
            }),
        }
    }

    /// Register compiled heuristics and record their discovery.
    async fn register_heuristics(
        &self,
        type_text: &str,
        ctx: &SynthesisContext,
        accepted: &[CandidateDefinition],
        ranked: &[CandidateScore],
    ) {
        if accepted.is_empty() {
            return;
        }
        let ids: Vec<String> = {
            let mut registry = self.registry.write().await;
            accepted
                .iter()
                .map(|def| {
                    registry.register(PredicateRegistryEntry::new(
                        def.name.clone(),
                        def.description.clone(),
                        def.predicate_source.clone(),
                    ))
                })
                .collect()
        };

        let mut audit = self.audit.write().await;
        for (def, id) in accepted.iter().zip(ids) {
            let confidence = ranked
                .iter()
                .find(|s| s.candidate == *def)
                .map(|s| s.total_score)
                .unwrap_or(0.5);
            audit.record_predicate_discovery(&id, &def.name, type_text, confidence, ctx.context.clone());
        }
    }

    async fn record_validation(&self, audit: ValidationAudit) {
        self.audit.write().await.record_validation(audit);
    }

    async fn persist(&self, request: &SynthesisRequest, outcome: &SynthesisOutcome) {
        if let Some(store) = &self.cache {
            let entry = CacheEntry {
                type_text: request.type_text.clone(),
                fingerprint: request.fingerprint.clone(),
                dependencies: request.dependencies.clone(),
                value: outcome.value.clone(),
                attempts: outcome.attempts,
                heuristics: (!outcome.heuristics.is_empty()).then(|| outcome.heuristics.clone()),
                constraints: Some(outcome.constraints.iter().map(Constraint::to_record).collect()),
                created_at: Some(chrono::Utc::now()),
            };
            if let Err(e) = store.write(&entry).await {
                warn!("Failed to cache value for '{}': {}", request.type_text, e);
            }
        }

        let snapshot = self.registry.write().await.take_snapshot();
        let written = match snapshot {
            Ok(Some(snapshot)) => snapshot.write().await,
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to persist predicate registry: {}", e);
            self.registry.write().await.mark_dirty();
        }
    }
}

/// Compile `definitions` into the run's constraint set and heuristic list.
///
/// Returns the definitions that compiled; the rest are dropped.
fn adopt_heuristics(state: &mut RunState, definitions: &[CandidateDefinition]) -> Vec<CandidateDefinition> {
    let mut accepted = Vec::new();
    let mut compiled = Vec::new();
    for def in definitions {
        if let Some(constraint) = compile_heuristic(def) {
            accepted.push(def.clone());
            compiled.push(constraint);
        }
    }

    state.constraints = merge(std::mem::take(&mut state.constraints), compiled);
    for def in &accepted {
        match state.heuristics.iter().position(|h| h.name == def.name) {
            Some(idx) => state.heuristics[idx] = def.clone(),
            None => state.heuristics.push(def.clone()),
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::constraint::{ComponentSpec, ConstraintSource, ConstraintSpec, Requirement};
    use crate::oracle::scripted::ScriptedOracle;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    const EVEN_HEURISTIC: &str =
        r#"{"name": "even", "description": "must be even", "predicate": "x => x % 2 === 0"}"#;

    fn reply(value: i64) -> String {
        format!(r#"{{"value": {}, "heuristics": [{}]}}"#, value, EVEN_HEURISTIC)
    }

    fn even_request() -> SynthesisRequest {
        SynthesisRequest::new(
            "{Even}",
            vec!["type Even = number".to_string()],
            ConstraintSpec::new()
                .with_component(ComponentSpec::new("Even"))
                .with_examples([2, 4, 6, 8, 10].map(|n| json!(n))),
        )
    }

    fn mystery_request() -> SynthesisRequest {
        SynthesisRequest::new(
            "{MysteryType, GreaterThanX<100>, Even}",
            vec![],
            ConstraintSpec::new()
                .with_component(ComponentSpec::new("MysteryType"))
                .with_component(ComponentSpec::new("GreaterThanX").with_argument(100))
                .with_component(ComponentSpec::new("Even"))
                .with_examples([1, 2, 3, 5, 8, 13].map(|n| json!(n)))
                .with_minimum(100.0),
        )
    }

    fn synthesizer(oracle: Arc<ScriptedOracle>, config: SynthesisConfig) -> Synthesizer {
        Synthesizer::new(
            oracle,
            PredicateRegistry::new().into_shared(),
            AuditLog::new().into_shared(),
            config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_even_bundle_first_attempt() {
        let oracle = Arc::new(ScriptedOracle::new().reply(reply(8)));
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        let outcome = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();

        let v = outcome.value.as_i64().unwrap();
        assert_eq!(v % 2, 0);
        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.from_cache);
        assert_eq!(oracle.calls(), 1);
        assert!(outcome
            .constraints
            .iter()
            .any(|c| c.description() == "must be even" && c.source() == ConstraintSource::Inferred));
        assert_eq!(outcome.heuristics.len(), 1);
        assert_eq!(outcome.ranked_candidates.len(), 1);

        let selection = outcome.candidate_selection_audit.unwrap();
        assert_eq!(selection.selected_name.as_deref(), Some("even"));

        let log = synth.audit_log().read().await;
        assert_eq!(log.validations("{Even}").len(), 1);
        assert!(log.validations("{Even}")[0].valid);
        assert_eq!(log.predicate_audits().len(), 1);
        assert_eq!(synth.registry().read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_heuristic_cannot_weaken_derived_constraint() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply(
                    r#"{"value": 7, "heuristics": [{"name": "even", "description": "must be even", "predicate": "x => x % 2 === 1"}]}"#,
                )
                .reply(reply(8)),
        );
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        let outcome = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.value, json!(8));
        assert_eq!(outcome.attempts, 2);
        let even: Vec<_> = outcome
            .constraints
            .iter()
            .filter(|c| c.description() == "must be even")
            .collect();
        assert_eq!(even.len(), 1);
        assert_eq!(even[0].source(), ConstraintSource::Inferred);
        assert_eq!(even[0].predicate_source(), None);

        let log = synth.audit_log().read().await;
        let first = &log.validations("{Even}")[0];
        assert!(!first.valid);
        assert_eq!(first.errors.clone().unwrap(), vec!["must be even".to_string()]);
    }

    #[tokio::test]
    async fn test_heuristic_cannot_weaken_must_requirement() {
        let request = SynthesisRequest::new(
            "{Small}",
            vec![],
            ConstraintSpec::new().with_must(Requirement::new("must be below 10", |v| {
                v.as_f64().is_some_and(|n| n < 10.0)
            })),
        );
        let oracle = Arc::new(ScriptedOracle::new().reply(
            r#"{"value": 50, "heuristics": [{"name": "must_0", "predicate": "x => true"}]}"#,
        ));
        let synth = synthesizer(oracle, SynthesisConfig::default().with_max_attempts(1));
        let err = synth
            .synthesize(&request, &SynthesisContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SynthesisExhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_validation_failure_feeds_back_every_error() {
        let oracle = Arc::new(ScriptedOracle::new().reply(reply(7)).reply(reply(102)));
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        let request = mystery_request();
        let outcome = synth
            .synthesize(&request, &SynthesisContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.value, json!(102));
        assert_eq!(outcome.attempts, 2);

        let log = synth.audit_log().read().await;
        let validations = log.validations(&request.type_text);
        assert_eq!(validations.len(), 2);
        assert!(!validations[0].valid);
        let errors = validations[0].errors.clone().unwrap();
        assert!(errors.contains(&"must be even".to_string()));
        assert!(errors.contains(&"must be greater than 100".to_string()));
        assert!(validations[1].valid);

        let second_prompt = &oracle.requests()[1].user_prompt;
        assert!(second_prompt.contains("- must be even"));
        assert!(second_prompt.contains("- must be greater than 100"));
    }

    #[tokio::test]
    async fn test_mystery_bundle_result_is_even_integer_above_100() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply(r#"{"value": 101}"#)
                .reply(r#"{"value": 100}"#)
                .reply(r#"{"value": 102.5}"#)
                .reply(r#"{"value": 104}"#),
        );
        let synth = synthesizer(oracle, SynthesisConfig::default());
        let outcome = synth
            .synthesize(&mystery_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(104));
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_exhaustion_is_terminal_and_fully_audited() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply(reply(1))
                .reply(reply(3))
                .reply(reply(5)),
        );
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default().with_max_attempts(3));
        let err = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap_err();

        match &err {
            Error::SynthesisExhausted { type_text, attempts } => {
                assert_eq!(type_text, "{Even}");
                assert_eq!(*attempts, 3);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert!(err.is_terminal());
        assert_eq!(oracle.calls(), 3);

        let log = synth.audit_log().read().await;
        assert_eq!(log.validations("{Even}").len(), 3);
        assert!(log.candidate_selections("{Even}").len() <= 3);
        assert_eq!(log.predicate_audit(&crate::predicate::predicate_id("x => x % 2 === 0")).unwrap().usage_count, 3);
    }

    #[tokio::test]
    async fn test_recoverable_failures_consume_attempts() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .fail("connection reset")
                .reply("")
                .reply("this is not json")
                .reply(r#"{"value": null, "explanation": "NO_VALUE_EXISTS: the examples are all small"}"#)
                .reply(reply(6)),
        );
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        let outcome = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 5);

        let log = synth.audit_log().read().await;
        let validations = log.validations("{Even}");
        assert_eq!(validations.len(), 5);
        assert!(validations[..4].iter().all(|v| !v.valid && v.errors.is_none()));
        assert_eq!(log.candidate_selections("{Even}").len(), 1);

        let requests = oracle.requests();
        assert!(requests[1].user_prompt.contains("oracle call failed"));
        assert!(requests[4].user_prompt.contains("generalize"));
    }

    #[tokio::test]
    async fn test_uncompilable_heuristic_is_dropped() {
        let oracle = Arc::new(ScriptedOracle::new().reply(
            r#"{"value": 4, "heuristics": [{"name": "broken", "predicate": "x => {"}]}"#,
        ));
        let synth = synthesizer(oracle, SynthesisConfig::default());
        let outcome = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(4));
        assert!(outcome.heuristics.is_empty());
        assert!(synth.registry().read().await.is_empty());
        // The broken heuristic is still ranked, with the compile-failure coverage floor.
        assert_eq!(outcome.ranked_candidates.len(), 1);
        assert_eq!(outcome.ranked_candidates[0].coverage_score, 0.1);
    }

    #[tokio::test]
    async fn test_any_oracle_error_consumes_one_attempt() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .fail_with(Error::Config("missing API key".into()))
                .reply(reply(2)),
        );
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        let outcome = synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(2));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(oracle.calls(), 2);
        assert!(oracle.requests()[1].user_prompt.contains("missing API key"));

        let log = synth.audit_log().read().await;
        let validations = log.validations("{Even}");
        assert_eq!(validations.len(), 2);
        assert!(!validations[0].valid);
        assert_eq!(validations[0].errors, None);
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_oracle_calls() {
        let dir = TempDir::new().unwrap();
        let config = SynthesisConfig::default().with_cache_dir(dir.path().join("cache"));

        let first = Arc::new(ScriptedOracle::new().reply(reply(12)));
        let synth = synthesizer(first, config.clone());
        synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();

        let second = Arc::new(ScriptedOracle::new());
        let cached = synthesizer(second.clone(), config)
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.value, json!(12));
        assert_eq!(cached.attempts, 0);
        assert_eq!(cached.heuristics.len(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_changed_dependency_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let config = SynthesisConfig::default().with_cache_dir(dir.path());

        synthesizer(Arc::new(ScriptedOracle::new().reply(reply(12))), config.clone())
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();

        let changed = SynthesisRequest::new(
            "{Even}",
            vec!["type Even = bigint".to_string()],
            even_request().spec,
        );
        let oracle = Arc::new(ScriptedOracle::new().reply(reply(14)));
        let outcome = synthesizer(oracle.clone(), config)
            .synthesize(&changed, &SynthesisContext::default())
            .await
            .unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.value, json!(14));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_value_failing_constraints_is_resynthesized() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let request = even_request();
        store
            .write(&CacheEntry {
                type_text: request.type_text.clone(),
                fingerprint: request.fingerprint.clone(),
                dependencies: request.dependencies.clone(),
                value: json!(7),
                attempts: 1,
                heuristics: None,
                constraints: None,
                created_at: None,
            })
            .await
            .unwrap();

        let oracle = Arc::new(ScriptedOracle::new().reply(reply(10)));
        let outcome = synthesizer(oracle.clone(), SynthesisConfig::default())
            .with_cache(store.clone())
            .synthesize(&request, &SynthesisContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.value, json!(10));
        assert_eq!(oracle.calls(), 1);
        assert_eq!(store.read("{Even}").await.unwrap().value, json!(10));
    }

    #[tokio::test]
    async fn test_prompt_reuses_registered_and_previous_heuristics() {
        let oracle = Arc::new(ScriptedOracle::new().reply(reply(2)).reply(reply(4)));
        let synth = synthesizer(oracle.clone(), SynthesisConfig::default());
        synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();

        let ctx = SynthesisContext::default()
            .with_context("used as a buffer size")
            .with_heuristics(vec![CandidateDefinition::new("big", "must be big", "x => x > 1")]);
        synth.synthesize(&even_request(), &ctx).await.unwrap();

        let second = &oracle.requests()[1].user_prompt;
        assert!(second.contains("Registered predicates"));
        assert!(second.contains("x => x % 2 === 0"));
        assert!(second.contains("- big: must be big [x => x > 1]"));
        assert!(second.contains("used as a buffer size"));

        let log = synth.audit_log().read().await;
        let audit = log
            .predicate_audit(&crate::predicate::predicate_id("x => x % 2 === 0"))
            .unwrap();
        assert_eq!(audit.usage_count, 2);
    }

    #[tokio::test]
    async fn test_registry_is_persisted_on_success() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predicates.json");
        let config = SynthesisConfig::default().with_registry_path(&path);
        let synth = Synthesizer::from_config(
            Arc::new(ScriptedOracle::new().reply(reply(2))),
            AuditLog::new().into_shared(),
            config.clone(),
        )
        .unwrap();
        synth
            .synthesize(&even_request(), &SynthesisContext::default())
            .await
            .unwrap();
        assert!(path.exists());

        let reopened = Synthesizer::from_config(
            Arc::new(ScriptedOracle::new()),
            AuditLog::new().into_shared(),
            config,
        )
        .unwrap();
        assert_eq!(reopened.registry().read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = Synthesizer::new(
            Arc::new(ScriptedOracle::new()),
            PredicateRegistry::new().into_shared(),
            AuditLog::new().into_shared(),
            SynthesisConfig::default().with_max_attempts(0),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
