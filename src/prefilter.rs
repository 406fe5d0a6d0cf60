// Rule-based prefilter — blocked-term scan and masking.
//
// The prefilter is a fast, deterministic keyword check that runs before
// any network call. It never decides maliciousness on its own; it only
// contributes a bounded score into fusion. The same term lists drive the
// masking applied to text before it is sent to the external classifiers.

use serde::{Deserialize, Serialize};

use crate::normalize::ResolvedLanguage;

/// Points added per matched blocked term.
pub const SCORE_PER_TERM: f64 = 15.0;

/// Rule score above which the prefilter flags the text for fusion.
pub const RULE_MALICIOUS_THRESHOLD: f64 = 50.0;

/// Placeholder substituted for blocked terms before transmission to the
/// external classifiers. The classifier prompts instruct the models to
/// treat it as a strong profanity/insult indicator.
pub const MASK_TOKEN: &str = "[MASKED]";

// Term lists are lowercase ASCII or Hangul, so ASCII case folding is
// sufficient for matching and keeps byte offsets stable.
const BLOCKED_KO: &[&str] = &[
    "바보", "멍청이", "병신", "개새끼", "씨발", "지랄", "미친", "죽여", "죽일", "때려", "혐오",
    "차별", "꺼져", "닥쳐",
];

const BLOCKED_EN: &[&str] = &[
    "stupid", "idiot", "fuck", "shit", "kill", "hate", "damn",
];

/// The blocked-term list for a language.
pub fn blocked_terms(language: ResolvedLanguage) -> &'static [&'static str] {
    match language {
        ResolvedLanguage::Ko => BLOCKED_KO,
        ResolvedLanguage::En => BLOCKED_EN,
    }
}

/// Outcome of the blocked-term scan. Derived purely from text + language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefilterResult {
    /// Blocked terms found in the text, in list order.
    pub matched_terms: Vec<String>,
    /// 15 points per matched term, capped at 100.
    pub rule_score: f64,
}

impl PrefilterResult {
    /// Whether the rule score alone is high enough to flag the text.
    /// Consumed by fusion as one input among several, never as a verdict.
    pub fn flags_malicious(&self) -> bool {
        self.rule_score > RULE_MALICIOUS_THRESHOLD
    }
}

/// Scan the text for blocked terms (case-insensitive substring match).
pub fn scan(text: &str, language: ResolvedLanguage) -> PrefilterResult {
    let lowered = text.to_ascii_lowercase();
    let mut matched_terms = Vec::new();
    let mut rule_score = 0.0;

    for term in blocked_terms(language) {
        if lowered.contains(term) {
            matched_terms.push((*term).to_string());
            rule_score += SCORE_PER_TERM;
        }
    }

    PrefilterResult {
        matched_terms,
        rule_score: rule_score.min(100.0),
    }
}

/// Replace every blocked-term occurrence with [`MASK_TOKEN`], preserving
/// the surrounding text. Overlapping matches collapse into a single token.
pub fn mask_blocked_terms(text: &str, language: ResolvedLanguage) -> String {
    let lowered = text.to_ascii_lowercase();

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for term in blocked_terms(language) {
        for (start, matched) in lowered.match_indices(term) {
            ranges.push((start, start + matched.len()));
        }
    }
    if ranges.is_empty() {
        return text.to_string();
    }

    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for (start, end) in merged {
        out.push_str(&text[pos..start]);
        out.push_str(MASK_TOKEN);
        pos = end;
    }
    out.push_str(&text[pos..]);
    out
}
