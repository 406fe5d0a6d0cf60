// Analysis orchestration.
//
// Sequence per request: normalize → cache lookup → prefilter → classifier
// gateway (or the rule-only path when no credentials are configured) →
// fusion → cache store → stamp timing/version metadata. Classifier-level
// failures never surface here; the only errors a caller sees are invalid
// input and unexpected internal faults.

use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::VerdictCache;
use crate::classifier::gateway::ClassifierGateway;
use crate::classifier::groq::GroqClient;
use crate::classifier::guard::GuardClassifier;
use crate::classifier::scorer::ScoreClassifier;
use crate::classifier::traits::ScoreResult;
use crate::config::Config;
use crate::fusion::{self, Category, FusedVerdict};
use crate::normalize::{cache_key, normalize_whitespace, resolve_language, Language};
use crate::prefilter;

/// Inclusive upper bound on request text length, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Version tag stamped on every report.
pub const MODEL_VERSION: &str = "groq-dual-llama-guard3-llama3.1";

/// Server-side cap on batch size.
pub const BATCH_LIMIT: usize = 10;

/// One analysis request. Immutable once created.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_dual_mode")]
    pub dual_mode: bool,
}

fn default_dual_mode() -> bool {
    true
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>, language: Language, dual_mode: bool) -> Self {
        Self {
            text: text.into(),
            language,
            dual_mode,
        }
    }
}

/// Errors surfaced to callers. Classifier failures are absorbed into
/// fallbacks and never appear here.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Malformed caller input, rejected before any processing.
    #[error("text must be between 1 and {MAX_TEXT_CHARS} characters (got {0})")]
    TextLength(usize),
    /// Unexpected fault inside the pipeline. The message is generic;
    /// detail goes to the log.
    #[error("analysis failed")]
    Internal(#[source] anyhow::Error),
}

/// Summary of the guard verdict included in the caller-facing report.
#[derive(Debug, Clone, Serialize)]
pub struct GuardSummary {
    pub is_safe: bool,
    pub violated_categories: Vec<String>,
}

/// The caller-facing analysis result: the fused verdict plus per-response
/// metadata (field names match the service's public schema).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub is_malicious: bool,
    pub toxicity_score: f64,
    pub hate_speech_score: f64,
    pub profanity_score: f64,
    pub threat_score: f64,
    pub violence_score: f64,
    pub sexual_score: f64,
    pub confidence_score: f64,
    pub category: Category,
    pub detected_keywords: Vec<String>,
    pub guard_result: Option<GuardSummary>,
    pub guard_categories: Vec<String>,
    pub reasoning: String,
    pub ai_model_version: String,
    pub processing_time_ms: f64,
    pub analyzed_at: String,
}

/// The orchestrator: owns the gateway (when credentials exist) and the
/// result cache, and drives the full pipeline per request.
pub struct Analyzer {
    gateway: Option<ClassifierGateway>,
    cache: VerdictCache,
}

impl Analyzer {
    /// Build from configuration. Without credentials the gateway is
    /// omitted and every request takes the rule-only fallback path.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = if config.has_credentials() {
            let groq = GroqClient::new(config.api_key.clone(), config.api_url.clone())?;
            info!(
                guard_model = %config.guard_model,
                scoring_model = %config.scoring_model,
                "Classifier gateway configured"
            );
            Some(ClassifierGateway::new(
                Box::new(GuardClassifier::new(
                    groq.clone(),
                    config.guard_model.clone(),
                )),
                Box::new(ScoreClassifier::new(groq, config.scoring_model.clone())),
            ))
        } else {
            warn!("GROQ_API_KEY not set — running in rule-only fallback mode");
            None
        };

        Ok(Self {
            gateway,
            cache: VerdictCache::new(config.cache_capacity),
        })
    }

    /// Build from parts. Lets tests substitute mock classifiers behind
    /// the gateway, or omit it to force the rule-only path.
    pub fn with_gateway(gateway: Option<ClassifierGateway>, cache: VerdictCache) -> Self {
        Self { gateway, cache }
    }

    /// Whether the external classifiers are available.
    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// Number of cached verdicts.
    pub fn cached_verdicts(&self) -> usize {
        self.cache.len()
    }

    /// Analyze one request end to end.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalyzeError> {
        let char_count = request.text.chars().count();
        if char_count == 0 || char_count > MAX_TEXT_CHARS {
            return Err(AnalyzeError::TextLength(char_count));
        }

        self.run(request).await.map_err(|e| {
            error!(error = ?e, "Analysis pipeline failed");
            AnalyzeError::Internal(e)
        })
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let started = Instant::now();

        let normalized = normalize_whitespace(&request.text);
        let language = resolve_language(request.language, &normalized);
        let key = cache_key(&normalized, language, request.dual_mode);

        if let Some(verdict) = self.cache.get(&key) {
            debug!(language = %language, "Cache hit");
            return Ok(stamp(verdict, started));
        }

        let prefilter_result = prefilter::scan(&normalized, language);
        debug!(
            matched = prefilter_result.matched_terms.len(),
            rule_score = prefilter_result.rule_score,
            "Prefilter complete"
        );

        let verdict = match &self.gateway {
            None => {
                // Rule-only path: fuse against the conservative fallback
                // so the category still comes from the decision table.
                let fallback = ScoreResult::fallback(prefilter_result.rule_score);
                fusion::fuse_single(&prefilter_result, &fallback)
            }
            Some(gateway) => {
                let masked = prefilter::mask_blocked_terms(&normalized, language);
                if request.dual_mode {
                    let (safety, scores) = gateway
                        .analyze(&masked, language, prefilter_result.rule_score)
                        .await;
                    fusion::fuse_dual(&prefilter_result, &safety, &scores)
                } else {
                    let scores = gateway
                        .score_only(&masked, language, prefilter_result.rule_score)
                        .await;
                    fusion::fuse_single(&prefilter_result, &scores)
                }
            }
        };

        self.cache.insert(key, verdict.clone());

        info!(
            category = %verdict.category,
            is_malicious = verdict.is_malicious,
            language = %language,
            "Analysis complete"
        );

        Ok(stamp(verdict, started))
    }

    /// Analyze up to [`BATCH_LIMIT`] texts sequentially. Per-text failures
    /// are reported in place and never abort the rest of the batch.
    pub async fn analyze_batch(
        &self,
        texts: &[String],
        language: Language,
        dual_mode: bool,
    ) -> Vec<Result<AnalysisReport, AnalyzeError>> {
        if texts.len() > BATCH_LIMIT {
            warn!(
                submitted = texts.len(),
                limit = BATCH_LIMIT,
                "Batch truncated"
            );
        }

        let mut results = Vec::with_capacity(texts.len().min(BATCH_LIMIT));
        for text in texts.iter().take(BATCH_LIMIT) {
            let request = AnalysisRequest::new(text.clone(), language, dual_mode);
            results.push(self.analyze(&request).await);
        }
        results
    }
}

/// Attach the time-varying metadata the cache deliberately does not hold.
fn stamp(verdict: FusedVerdict, started: Instant) -> AnalysisReport {
    let processing_time_ms =
        (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

    AnalysisReport {
        is_malicious: verdict.is_malicious,
        toxicity_score: verdict.scores.toxicity,
        hate_speech_score: verdict.scores.hate_speech,
        profanity_score: verdict.scores.profanity,
        threat_score: verdict.scores.threat,
        violence_score: verdict.scores.violence,
        sexual_score: verdict.scores.sexual,
        confidence_score: verdict.confidence,
        category: verdict.category,
        detected_keywords: verdict.matched_terms,
        guard_result: verdict.safety_verdict.as_ref().map(|v| GuardSummary {
            is_safe: v.is_safe,
            violated_categories: v.violated_categories.clone(),
        }),
        guard_categories: verdict.violated_categories,
        reasoning: verdict.reasoning,
        ai_model_version: MODEL_VERSION.to_string(),
        processing_time_ms,
        analyzed_at: Utc::now().to_rfc3339(),
    }
}
