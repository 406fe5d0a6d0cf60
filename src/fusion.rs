// Score fusion and category decision.
//
// Combines the prefilter signal, the safety verdict, and the scoring
// classifier's category scores into one verdict. Pure arithmetic over its
// inputs — no I/O, no clock — so the whole engine is table-testable.
//
// Two fusion paths:
//   single: rule and scoring model only (dual mode off, or guard unused)
//   dual:   adds the guard verdict as a boost plus per-category floors
//
// The category decision is an ordered table of (predicate, category)
// pairs evaluated top to bottom; the order is the priority order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::traits::{SafetyVerdict, ScoreResult};
use crate::prefilter::PrefilterResult;

// Malicious-predicate thresholds, shared by both paths.
pub const TOXICITY_THRESHOLD: f64 = 55.0;
pub const HATE_SPEECH_THRESHOLD: f64 = 65.0;
pub const PROFANITY_THRESHOLD: f64 = 75.0;
pub const THREAT_THRESHOLD: f64 = 45.0;
pub const VIOLENCE_THRESHOLD: f64 = 65.0;
pub const SEXUAL_THRESHOLD: f64 = 75.0;

// Single-path toxicity weights.
const SINGLE_RULE_WEIGHT: f64 = 0.3;
const SINGLE_SCORING_WEIGHT: f64 = 0.7;

// Dual-path toxicity weights.
const DUAL_RULE_WEIGHT: f64 = 0.08;
const DUAL_GUARD_WEIGHT: f64 = 0.32;
const DUAL_SCORING_WEIGHT: f64 = 0.60;

/// Score boost applied when the guard verdict is unsafe.
pub const GUARD_BOOST: f64 = 30.0;

// Floors applied when the guard names a category.
const HATE_TAG_FLOOR: f64 = 80.0;
const VIOLENCE_TAG_FLOOR: f64 = 85.0;
const SEXUAL_TAG_FLOOR: f64 = 85.0;

/// The closed set of final category labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Safe,
    Toxic,
    HateSpeech,
    Threat,
    Violence,
    SexualContent,
    Defamation,
    Privacy,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safe => "safe",
            Category::Toxic => "toxic",
            Category::HateSpeech => "hate_speech",
            Category::Threat => "threat",
            Category::Violence => "violence",
            Category::SexualContent => "sexual_content",
            Category::Defamation => "defamation",
            Category::Privacy => "privacy",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six fused category scores, each in [0, 100], rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub toxicity: f64,
    pub hate_speech: f64,
    pub profanity: f64,
    pub threat: f64,
    pub violence: f64,
    pub sexual: f64,
}

impl CategoryScores {
    /// The highest of the six scores.
    pub fn max(&self) -> f64 {
        [
            self.toxicity,
            self.hate_speech,
            self.profanity,
            self.threat,
            self.violence,
            self.sexual,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    fn rounded(self) -> Self {
        Self {
            toxicity: round2(self.toxicity),
            hate_speech: round2(self.hate_speech),
            profanity: round2(self.profanity),
            threat: round2(self.threat),
            violence: round2(self.violence),
            sexual: round2(self.sexual),
        }
    }
}

/// The fused verdict — the unit stored in the cache and returned to the
/// orchestrator. Carries no time-varying fields; the analyzer stamps
/// timing and version metadata per response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedVerdict {
    pub is_malicious: bool,
    pub scores: CategoryScores,
    /// Max of the six scores. Not a calibrated probability.
    pub confidence: f64,
    pub category: Category,
    pub matched_terms: Vec<String>,
    /// The guard verdict that fed fusion; `None` on the single path.
    pub safety_verdict: Option<SafetyVerdict>,
    pub violated_categories: Vec<String>,
    /// The scoring classifier's explanation, or the fallback note.
    pub reasoning: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Inputs to the category decision, after floors have been applied.
struct DecisionInputs<'a> {
    scores: &'a CategoryScores,
    protected_group: bool,
    violated_categories: &'a [String],
}

impl DecisionInputs<'_> {
    fn has_tag(&self, tag: &str) -> bool {
        self.violated_categories.iter().any(|t| t == tag)
    }
}

type Predicate = for<'a> fn(&DecisionInputs<'a>) -> bool;

/// Category decision table. Evaluated top to bottom, first match wins;
/// the row order is the audited priority order.
static DECISION_TABLE: &[(Predicate, Category)] = &[
    (|i| i.has_tag("defamation"), Category::Defamation),
    (|i| i.has_tag("privacy"), Category::Privacy),
    (|i| i.scores.threat > THREAT_THRESHOLD, Category::Threat),
    (|i| i.scores.violence > VIOLENCE_THRESHOLD, Category::Violence),
    (|i| i.scores.sexual > SEXUAL_THRESHOLD, Category::SexualContent),
    (
        |i| i.scores.hate_speech > HATE_SPEECH_THRESHOLD && i.protected_group,
        Category::HateSpeech,
    ),
    (|i| i.scores.toxicity > TOXICITY_THRESHOLD, Category::Toxic),
];

fn decide_category(inputs: &DecisionInputs<'_>) -> Category {
    for (predicate, category) in DECISION_TABLE {
        if predicate(inputs) {
            return *category;
        }
    }
    Category::Safe
}

fn malicious_predicate(scores: &CategoryScores, protected_group: bool) -> bool {
    scores.toxicity > TOXICITY_THRESHOLD
        || (scores.hate_speech > HATE_SPEECH_THRESHOLD && protected_group)
        || scores.profanity > PROFANITY_THRESHOLD
        || scores.threat > THREAT_THRESHOLD
        || scores.violence > VIOLENCE_THRESHOLD
        || scores.sexual > SEXUAL_THRESHOLD
}

/// Fuse the single-model path: prefilter + scoring classifier only.
pub fn fuse_single(prefilter: &PrefilterResult, scoring: &ScoreResult) -> FusedVerdict {
    let toxicity = prefilter.rule_score * SINGLE_RULE_WEIGHT
        + scoring.toxicity.clamp(0.0, 100.0) * SINGLE_SCORING_WEIGHT;

    let scores = CategoryScores {
        toxicity: toxicity.clamp(0.0, 100.0),
        hate_speech: scoring.hate_speech.clamp(0.0, 100.0),
        profanity: scoring.profanity.clamp(0.0, 100.0),
        threat: scoring.threat.clamp(0.0, 100.0),
        violence: scoring.violence.clamp(0.0, 100.0),
        sexual: scoring.sexual.clamp(0.0, 100.0),
    };

    let is_malicious =
        malicious_predicate(&scores, scoring.protected_group) || prefilter.flags_malicious();

    let category = decide_category(&DecisionInputs {
        scores: &scores,
        protected_group: scoring.protected_group,
        violated_categories: &[],
    });

    let scores = scores.rounded();
    let confidence = round2(scores.max().clamp(0.0, 100.0));

    FusedVerdict {
        is_malicious,
        scores,
        confidence,
        category,
        matched_terms: prefilter.matched_terms.clone(),
        safety_verdict: None,
        violated_categories: Vec::new(),
        reasoning: scoring.reasoning.clone(),
    }
}

/// Fuse the dual-model path: prefilter + guard verdict + scoring classifier.
pub fn fuse_dual(
    prefilter: &PrefilterResult,
    safety: &SafetyVerdict,
    scoring: &ScoreResult,
) -> FusedVerdict {
    let guard_boost = if safety.is_safe { 0.0 } else { GUARD_BOOST };

    let toxicity = prefilter.rule_score * DUAL_RULE_WEIGHT
        + guard_boost * DUAL_GUARD_WEIGHT
        + scoring.toxicity.clamp(0.0, 100.0) * DUAL_SCORING_WEIGHT;

    let mut hate_speech = scoring.hate_speech.clamp(0.0, 100.0);
    let mut violence = scoring.violence.clamp(0.0, 100.0);
    let mut sexual = scoring.sexual.clamp(0.0, 100.0);
    let mut protected_group = scoring.protected_group;

    // Guard category tags floor the corresponding scores.
    for tag in &safety.violated_categories {
        match tag.as_str() {
            "hate" => {
                hate_speech = hate_speech.max(HATE_TAG_FLOOR);
                protected_group = true;
            }
            "violent_crimes" => violence = violence.max(VIOLENCE_TAG_FLOOR),
            "sexual_content" => sexual = sexual.max(SEXUAL_TAG_FLOOR),
            _ => {}
        }
    }

    let scores = CategoryScores {
        toxicity: toxicity.clamp(0.0, 100.0),
        hate_speech,
        profanity: scoring.profanity.clamp(0.0, 100.0),
        threat: scoring.threat.clamp(0.0, 100.0),
        violence,
        sexual,
    };

    let is_malicious = malicious_predicate(&scores, protected_group)
        || !safety.is_safe
        || prefilter.flags_malicious();

    let category = decide_category(&DecisionInputs {
        scores: &scores,
        protected_group,
        violated_categories: &safety.violated_categories,
    });

    let scores = scores.rounded();
    let confidence = round2(scores.max().clamp(0.0, 100.0));

    FusedVerdict {
        is_malicious,
        scores,
        confidence,
        category,
        matched_terms: prefilter.matched_terms.clone(),
        safety_verdict: Some(safety.clone()),
        violated_categories: safety.violated_categories.clone(),
        reasoning: scoring.reasoning.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_prefilter() -> PrefilterResult {
        PrefilterResult {
            matched_terms: Vec::new(),
            rule_score: 0.0,
        }
    }

    fn zero_scores() -> ScoreResult {
        ScoreResult {
            toxicity: 0.0,
            hate_speech: 0.0,
            profanity: 0.0,
            threat: 0.0,
            violence: 0.0,
            sexual: 0.0,
            protected_group: false,
            reasoning: String::new(),
            succeeded: true,
        }
    }

    fn safe_guard() -> SafetyVerdict {
        SafetyVerdict {
            is_safe: true,
            violated_categories: Vec::new(),
            raw_text: "safe".to_string(),
            succeeded: true,
        }
    }

    #[test]
    fn single_path_weights() {
        let prefilter = PrefilterResult {
            matched_terms: vec!["stupid".to_string()],
            rule_score: 30.0,
        };
        let scoring = ScoreResult {
            toxicity: 50.0,
            ..zero_scores()
        };
        let verdict = fuse_single(&prefilter, &scoring);
        // 30 * 0.3 + 50 * 0.7 = 44
        assert_eq!(verdict.scores.toxicity, 44.0);
        assert!(!verdict.is_malicious);
        assert_eq!(verdict.category, Category::Safe);
        assert!(verdict.safety_verdict.is_none());
    }

    #[test]
    fn dual_path_weights_with_unsafe_guard() {
        let guard = SafetyVerdict {
            is_safe: false,
            ..safe_guard()
        };
        let scoring = ScoreResult {
            toxicity: 50.0,
            ..zero_scores()
        };
        let prefilter = PrefilterResult {
            matched_terms: Vec::new(),
            rule_score: 25.0,
        };
        let verdict = fuse_dual(&prefilter, &guard, &scoring);
        // 25 * 0.08 + 30 * 0.32 + 50 * 0.60 = 2 + 9.6 + 30 = 41.6
        assert_eq!(verdict.scores.toxicity, 41.6);
        // Unsafe guard alone makes it malicious.
        assert!(verdict.is_malicious);
    }

    #[test]
    fn hate_tag_floors_score_and_forces_protected_group() {
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["hate".to_string()],
            ..safe_guard()
        };
        let verdict = fuse_dual(&no_prefilter(), &guard, &zero_scores());
        assert_eq!(verdict.scores.hate_speech, 80.0);
        assert_eq!(verdict.category, Category::HateSpeech);
        assert!(verdict.is_malicious);
    }

    #[test]
    fn violent_crimes_tag_floors_violence() {
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["violent_crimes".to_string()],
            ..safe_guard()
        };
        let verdict = fuse_dual(&no_prefilter(), &guard, &zero_scores());
        assert_eq!(verdict.scores.violence, 85.0);
        assert_eq!(verdict.category, Category::Violence);
    }

    #[test]
    fn floors_never_lower_an_existing_score() {
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["sexual_content".to_string()],
            ..safe_guard()
        };
        let scoring = ScoreResult {
            sexual: 95.0,
            ..zero_scores()
        };
        let verdict = fuse_dual(&no_prefilter(), &guard, &scoring);
        assert_eq!(verdict.scores.sexual, 95.0);
    }

    #[test]
    fn defamation_tag_outranks_every_score() {
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["defamation".to_string()],
            ..safe_guard()
        };
        let scoring = ScoreResult {
            threat: 90.0,
            violence: 90.0,
            ..zero_scores()
        };
        let verdict = fuse_dual(&no_prefilter(), &guard, &scoring);
        assert_eq!(verdict.category, Category::Defamation);
    }

    #[test]
    fn privacy_tag_outranks_scores_but_not_defamation() {
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["privacy".to_string(), "defamation".to_string()],
            ..safe_guard()
        };
        let verdict = fuse_dual(&no_prefilter(), &guard, &zero_scores());
        assert_eq!(verdict.category, Category::Defamation);
    }

    #[test]
    fn threat_boundary_is_exclusive() {
        let scoring = ScoreResult {
            threat: 45.0,
            ..zero_scores()
        };
        let verdict = fuse_dual(&no_prefilter(), &safe_guard(), &scoring);
        assert_eq!(verdict.category, Category::Safe);
        assert!(!verdict.is_malicious);

        let scoring = ScoreResult {
            threat: 46.0,
            ..zero_scores()
        };
        let verdict = fuse_dual(&no_prefilter(), &safe_guard(), &scoring);
        assert_eq!(verdict.category, Category::Threat);
        assert!(verdict.is_malicious);
    }

    #[test]
    fn hate_speech_requires_protected_group() {
        let scoring = ScoreResult {
            hate_speech: 90.0,
            protected_group: false,
            ..zero_scores()
        };
        let verdict = fuse_single(&no_prefilter(), &scoring);
        assert_eq!(verdict.category, Category::Safe);
        assert!(!verdict.is_malicious);

        let scoring = ScoreResult {
            protected_group: true,
            ..scoring
        };
        let verdict = fuse_single(&no_prefilter(), &scoring);
        assert_eq!(verdict.category, Category::HateSpeech);
        assert!(verdict.is_malicious);
    }

    #[test]
    fn prefilter_flag_alone_makes_malicious() {
        let prefilter = PrefilterResult {
            matched_terms: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            rule_score: 60.0,
        };
        let verdict = fuse_single(&prefilter, &zero_scores());
        // toxicity = 60 * 0.3 = 18: under every threshold, but the rule flag holds.
        assert_eq!(verdict.scores.toxicity, 18.0);
        assert!(verdict.is_malicious);
        assert_eq!(verdict.category, Category::Safe);
    }

    #[test]
    fn confidence_is_the_max_score() {
        let scoring = ScoreResult {
            toxicity: 10.0,
            profanity: 62.5,
            threat: 30.0,
            ..zero_scores()
        };
        let verdict = fuse_single(&no_prefilter(), &scoring);
        assert_eq!(verdict.confidence, 62.5);
    }

    #[test]
    fn scores_are_rounded_to_two_decimals() {
        let prefilter = PrefilterResult {
            matched_terms: Vec::new(),
            rule_score: 33.333,
        };
        let scoring = ScoreResult {
            toxicity: 33.333,
            ..zero_scores()
        };
        let verdict = fuse_single(&prefilter, &scoring);
        // 33.333 * 0.3 + 33.333 * 0.7 = 33.333 → 33.33
        assert_eq!(verdict.scores.toxicity, 33.33);
    }

    #[test]
    fn fusion_is_deterministic() {
        let prefilter = PrefilterResult {
            matched_terms: vec!["hate".to_string()],
            rule_score: 15.0,
        };
        let guard = SafetyVerdict {
            is_safe: false,
            violated_categories: vec!["hate".to_string()],
            ..safe_guard()
        };
        let scoring = ScoreResult {
            toxicity: 77.7,
            hate_speech: 66.6,
            protected_group: true,
            ..zero_scores()
        };
        let a = fuse_dual(&prefilter, &guard, &scoring);
        let b = fuse_dual(&prefilter, &guard, &scoring);
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let scoring = ScoreResult {
            toxicity: 500.0,
            violence: -20.0,
            ..zero_scores()
        };
        let verdict = fuse_single(&no_prefilter(), &scoring);
        assert!(verdict.scores.toxicity <= 100.0);
        assert_eq!(verdict.scores.violence, 0.0);
        assert!(verdict.confidence <= 100.0);
    }
}
