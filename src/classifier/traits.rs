// Classifier traits — the swap-ready abstractions.
//
// Two independent external models feed the pipeline: a binary safety
// classifier (safe/unsafe plus violated category tags) and a scoring
// classifier (six 0-100 category scores plus reasoning). Both are async
// because the default implementations are HTTP calls. The gateway only
// ever sees these traits, so tests can substitute mocks and providers can
// be swapped without touching fusion.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::normalize::ResolvedLanguage;

/// Verdict from the binary safety classifier, or its fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    /// Violated category names (mapped from S-tags). Empty when safe.
    pub violated_categories: Vec<String>,
    /// The classifier's raw response text, kept for the report.
    pub raw_text: String,
    /// False when this verdict is the fallback for a failed call.
    pub succeeded: bool,
}

impl SafetyVerdict {
    /// Fallback for a failed, timed-out, or unparseable safety call.
    /// Defaults to safe so an unreachable classifier never convicts.
    pub fn fallback() -> Self {
        Self {
            is_safe: true,
            violated_categories: Vec::new(),
            raw_text: "guard unavailable".to_string(),
            succeeded: false,
        }
    }
}

/// Six-category scores from the scoring classifier, or its fallback.
/// All scores are clamped to [0, 100] at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub toxicity: f64,
    pub hate_speech: f64,
    pub profanity: f64,
    pub threat: f64,
    pub violence: f64,
    pub sexual: f64,
    /// Whether the text targets an identity/protected class. Gates the
    /// hate-speech category in fusion.
    pub protected_group: bool,
    /// Free-text explanation in the resolved language.
    pub reasoning: String,
    /// False when this result is the fallback for a failed call.
    pub succeeded: bool,
}

impl ScoreResult {
    /// Conservative fallback derived from the rule score: toxicity mirrors
    /// the prefilter signal, every other category stays at zero. Biased
    /// toward "safe" so unreachable classifiers don't produce false
    /// positives.
    pub fn fallback(rule_score: f64) -> Self {
        Self {
            toxicity: rule_score.clamp(0.0, 100.0),
            hate_speech: 0.0,
            profanity: 0.0,
            threat: 0.0,
            violence: 0.0,
            sexual: 0.0,
            protected_group: false,
            reasoning: "Fallback: rule-based scoring only".to_string(),
            succeeded: false,
        }
    }
}

/// The binary safety classifier.
#[async_trait]
pub trait SafetyClassifier: Send + Sync {
    /// Check the (already masked) text, returning a verdict.
    async fn check(&self, text: &str, language: ResolvedLanguage) -> Result<SafetyVerdict>;
}

/// The multi-category scoring classifier.
#[async_trait]
pub trait ScoringClassifier: Send + Sync {
    /// Score the (already masked) text across the six harm categories.
    async fn score(&self, text: &str, language: ResolvedLanguage) -> Result<ScoreResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_fallback_is_safe_and_degraded() {
        let verdict = SafetyVerdict::fallback();
        assert!(verdict.is_safe);
        assert!(verdict.violated_categories.is_empty());
        assert!(!verdict.succeeded);
    }

    #[test]
    fn score_fallback_only_carries_the_rule_signal() {
        let scores = ScoreResult::fallback(45.0);
        assert_eq!(scores.toxicity, 45.0);
        assert_eq!(scores.hate_speech, 0.0);
        assert_eq!(scores.threat, 0.0);
        assert!(!scores.protected_group);
        assert!(!scores.succeeded);
    }

    #[test]
    fn score_fallback_clamps_the_rule_score() {
        assert_eq!(ScoreResult::fallback(150.0).toxicity, 100.0);
        assert_eq!(ScoreResult::fallback(-5.0).toxicity, 0.0);
    }
}
