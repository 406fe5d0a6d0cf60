// Classifier gateway — concurrent dual-model invocation with independent
// fallback.
//
// Both classifier calls launch together and are awaited jointly, so a
// request costs the slower of the two calls rather than their sum. Each
// call's failure (error, timeout, unparseable body) is absorbed on its own
// side: the other call is never cancelled or delayed, and fusion only ever
// sees typed results carrying a `succeeded` flag. There are no retries —
// a failed call converts straight to its fallback, favoring latency over
// classifier accuracy.

use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use super::traits::{SafetyClassifier, SafetyVerdict, ScoreResult, ScoringClassifier};
use crate::normalize::ResolvedLanguage;

/// Outer bound on each classifier call. Matches the HTTP client timeout,
/// and also covers non-HTTP implementations of the traits.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates the two external classifiers behind their trait seams.
pub struct ClassifierGateway {
    safety: Box<dyn SafetyClassifier>,
    scoring: Box<dyn ScoringClassifier>,
}

impl ClassifierGateway {
    pub fn new(safety: Box<dyn SafetyClassifier>, scoring: Box<dyn ScoringClassifier>) -> Self {
        Self { safety, scoring }
    }

    /// Invoke both classifiers concurrently. Never fails: each call that
    /// errors or times out is replaced by its fallback value, with the
    /// conservative score fallback seeded from the rule score.
    pub async fn analyze(
        &self,
        masked_text: &str,
        language: ResolvedLanguage,
        rule_score: f64,
    ) -> (SafetyVerdict, ScoreResult) {
        let safety_call = timeout(CALL_TIMEOUT, self.safety.check(masked_text, language));
        let scoring_call = timeout(CALL_TIMEOUT, self.scoring.score(masked_text, language));

        let (safety_outcome, scoring_outcome) = tokio::join!(safety_call, scoring_call);

        let verdict = match safety_outcome {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!(error = %e, "Safety classifier failed, using fallback");
                SafetyVerdict::fallback()
            }
            Err(_) => {
                warn!("Safety classifier timed out, using fallback");
                SafetyVerdict::fallback()
            }
        };

        let scores = match scoring_outcome {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!(error = %e, "Scoring classifier failed, using fallback");
                ScoreResult::fallback(rule_score)
            }
            Err(_) => {
                warn!("Scoring classifier timed out, using fallback");
                ScoreResult::fallback(rule_score)
            }
        };

        (verdict, scores)
    }

    /// Invoke only the scoring classifier (single-model mode). Same
    /// fallback contract as [`analyze`](Self::analyze).
    pub async fn score_only(
        &self,
        masked_text: &str,
        language: ResolvedLanguage,
        rule_score: f64,
    ) -> ScoreResult {
        match timeout(CALL_TIMEOUT, self.scoring.score(masked_text, language)).await {
            Ok(Ok(scores)) => scores,
            Ok(Err(e)) => {
                warn!(error = %e, "Scoring classifier failed, using fallback");
                ScoreResult::fallback(rule_score)
            }
            Err(_) => {
                warn!("Scoring classifier timed out, using fallback");
                ScoreResult::fallback(rule_score)
            }
        }
    }
}
