// Input normalization — whitespace collapse, script-based language
// resolution, and deterministic cache keys.
//
// Everything here is pure. Identical input always yields the identical
// normalized text, resolved language, and cache key; the result cache
// depends on that determinism.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Requested analysis language. `Auto` is resolved by script detection
/// before anything else looks at the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    Ko,
    En,
}

#[derive(Debug, Error)]
#[error("unsupported language: {0:?} (expected auto, ko, or en)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Language::Auto),
            "ko" => Ok(Language::Ko),
            "en" => Ok(Language::En),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// A language actually used for prefiltering, prompts, and cache keys —
/// `auto` already resolved against the text's script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedLanguage {
    Ko,
    En,
}

impl ResolvedLanguage {
    pub fn code(&self) -> &'static str {
        match self {
            ResolvedLanguage::Ko => "ko",
            ResolvedLanguage::En => "en",
        }
    }
}

impl fmt::Display for ResolvedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if the text contains any Hangul code point (syllables, Jamo,
/// or compatibility Jamo).
pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}'   // Hangul syllables
            | '\u{1100}'..='\u{11FF}' // Hangul Jamo
            | '\u{3130}'..='\u{318F}' // Hangul compatibility Jamo
        )
    })
}

/// Resolve a requested language against the text. `Auto` picks `ko` when
/// any Hangul is present, `en` otherwise.
pub fn resolve_language(requested: Language, text: &str) -> ResolvedLanguage {
    match requested {
        Language::Ko => ResolvedLanguage::Ko,
        Language::En => ResolvedLanguage::En,
        Language::Auto => {
            if contains_hangul(text) {
                ResolvedLanguage::Ko
            } else {
                ResolvedLanguage::En
            }
        }
    }
}

/// Deterministic cache key: SHA-256 over `{lang}||{dual}||{normalized text}`,
/// hex-encoded. The language must already be resolved so that repeated
/// identical calls hash identically.
pub fn cache_key(normalized_text: &str, language: ResolvedLanguage, dual_mode: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(language.code().as_bytes());
    hasher.update(b"||");
    hasher.update(if dual_mode { b"dual" as &[u8] } else { b"single" });
    hasher.update(b"||");
    hasher.update(normalized_text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
