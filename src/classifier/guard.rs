// Llama Guard safety classifier client.
//
// The guard model answers with a first line of "safe" or "unsafe"; when
// unsafe, the remaining tokens may name violated categories as S-tags
// (S1..S13). Parsing is tolerant: unknown tags are kept verbatim rather
// than dropped, and any response that doesn't start with "safe" is
// treated as unsafe.

use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex_lite::Regex;
use tracing::debug;

use super::groq::{ChatMessage, GroqClient};
use super::traits::{SafetyClassifier, SafetyVerdict};
use crate::normalize::ResolvedLanguage;
use crate::prefilter::MASK_TOKEN;

/// Fixed 13-entry tag → category-name table (Llama Guard taxonomy).
const TAG_TABLE: &[(&str, &str)] = &[
    ("S1", "violent_crimes"),
    ("S2", "non_violent_crimes"),
    ("S3", "sex_related_crimes"),
    ("S4", "child_exploitation"),
    ("S5", "defamation"),
    ("S6", "specialized_advice"),
    ("S7", "privacy"),
    ("S8", "intellectual_property"),
    ("S9", "indiscriminate_weapons"),
    ("S10", "hate"),
    ("S11", "self_harm"),
    ("S12", "sexual_content"),
    ("S13", "elections"),
];

/// Map an S-tag to its category name; unknown tags pass through unchanged.
pub fn category_for_tag(tag: &str) -> &str {
    TAG_TABLE
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, name)| *name)
        .unwrap_or(tag)
}

/// Safety classifier backed by a Llama Guard model on Groq.
pub struct GuardClassifier {
    groq: GroqClient,
    model: String,
}

impl GuardClassifier {
    pub fn new(groq: GroqClient, model: String) -> Self {
        Self { groq, model }
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "[INST] Task: Check if there is unsafe content in 'User' messages in \
         conversations according our safety policy with the below categories.\n\
         \n\
         <BEGIN UNSAFE CONTENT CATEGORIES>\n\
         S1: Violent Crimes\n\
         S2: Non-Violent Crimes\n\
         S3: Sex-Related Crimes\n\
         S4: Child Sexual Exploitation\n\
         S5: Defamation\n\
         S6: Specialized Advice\n\
         S7: Privacy\n\
         S8: Intellectual Property\n\
         S9: Indiscriminate Weapons\n\
         S10: Hate\n\
         S11: Self-Harm\n\
         S12: Sexual Content\n\
         S13: Elections\n\
         <END UNSAFE CONTENT CATEGORIES>\n\
         \n\
         Note: the token {MASK_TOKEN} replaces a known profanity or insult \
         and must be treated as a strong indicator of hate or harassment.\n\
         \n\
         <BEGIN CONVERSATION>\n\
         User: {text}\n\
         <END CONVERSATION>\n\
         \n\
         Provide your safety assessment for User's message:\n\
         - First line must be 'safe' or 'unsafe'\n\
         - If unsafe, list all violated categories (S1, S2, etc.) [/INST]"
    )
}

/// Parse the guard model's response into a verdict.
///
/// `violated_categories` stays empty unless the verdict is unsafe, and
/// duplicate tags collapse to one entry in first-seen order.
pub fn parse_guard_response(content: &str) -> SafetyVerdict {
    let trimmed = content.trim();
    let is_safe = trimmed.to_ascii_lowercase().starts_with("safe");

    static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

    let mut violated_categories: Vec<String> = Vec::new();
    if !is_safe {
        let tag_pattern =
            TAG_PATTERN.get_or_init(|| Regex::new(r"S\d+").expect("valid tag pattern"));
        for found in tag_pattern.find_iter(trimmed) {
            let name = category_for_tag(found.as_str()).to_string();
            if !violated_categories.contains(&name) {
                violated_categories.push(name);
            }
        }
    }

    SafetyVerdict {
        is_safe,
        violated_categories,
        raw_text: trimmed.to_string(),
        succeeded: true,
    }
}

#[async_trait]
impl SafetyClassifier for GuardClassifier {
    async fn check(&self, text: &str, _language: ResolvedLanguage) -> Result<SafetyVerdict> {
        let prompt = build_prompt(text);
        let content = self
            .groq
            .complete(&self.model, vec![ChatMessage::user(prompt)], 0.0, 100)
            .await?;

        let verdict = parse_guard_response(&content);
        debug!(
            is_safe = verdict.is_safe,
            categories = ?verdict.violated_categories,
            "Guard verdict"
        );
        Ok(verdict)
    }
}
