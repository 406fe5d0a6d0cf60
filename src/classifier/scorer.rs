// Scoring classifier client.
//
// Asks an instruct model for strict JSON with six 0-100 category scores,
// a protected-group flag, and free-text reasoning in the resolved
// language. Responses rarely come back strictly formatted, so the body is
// recovered through the extractor; an unrecoverable body is an error here
// and becomes the conservative fallback in the gateway.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::groq::{ChatMessage, GroqClient};
use super::traits::{ScoreResult, ScoringClassifier};
use crate::extract::extract_json;
use crate::normalize::ResolvedLanguage;
use crate::prefilter::MASK_TOKEN;

/// Scoring classifier backed by an instruct model on Groq.
pub struct ScoreClassifier {
    groq: GroqClient,
    model: String,
}

impl ScoreClassifier {
    pub fn new(groq: GroqClient, model: String) -> Self {
        Self { groq, model }
    }
}

fn system_prompt(language: ResolvedLanguage) -> String {
    let reasoning_language = match language {
        ResolvedLanguage::Ko => "Korean",
        ResolvedLanguage::En => "English",
    };
    format!(
        "You are an expert in analyzing toxic and harmful content.\n\
         Analyze the given text and provide detailed scores (0-100) for each category.\n\
         The token {MASK_TOKEN} replaces a known profanity or insult; treat it as a \
         strong profanity and insult signal.\n\
         \n\
         Respond in valid JSON format only, no markdown:\n\
         {{\n\
         \x20 \"toxicity_score\": <0-100>,\n\
         \x20 \"hate_speech_score\": <0-100>,\n\
         \x20 \"profanity_score\": <0-100>,\n\
         \x20 \"threat_score\": <0-100>,\n\
         \x20 \"violence_score\": <0-100>,\n\
         \x20 \"sexual_score\": <0-100>,\n\
         \x20 \"protected_group\": <true|false>,\n\
         \x20 \"reasoning\": \"<brief explanation in {reasoning_language}>\"\n\
         }}"
    )
}

fn score_field(value: &Value, field: &str) -> f64 {
    value
        .get(field)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0)
}

/// Parse a (possibly messy) scoring response. `None` means the body held
/// no recoverable JSON object — the caller treats that as a failed call.
pub fn parse_score_response(content: &str) -> Option<ScoreResult> {
    let value = extract_json(content)?;

    Some(ScoreResult {
        toxicity: score_field(&value, "toxicity_score"),
        hate_speech: score_field(&value, "hate_speech_score"),
        profanity: score_field(&value, "profanity_score"),
        threat: score_field(&value, "threat_score"),
        violence: score_field(&value, "violence_score"),
        sexual: score_field(&value, "sexual_score"),
        protected_group: value
            .get("protected_group")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        reasoning: value
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        succeeded: true,
    })
}

#[async_trait]
impl ScoringClassifier for ScoreClassifier {
    async fn score(&self, text: &str, language: ResolvedLanguage) -> Result<ScoreResult> {
        let messages = vec![
            ChatMessage::system(system_prompt(language)),
            ChatMessage::user(format!(
                "Analyze this text for harmful content: \"{text}\""
            )),
        ];

        let content = self
            .groq
            .complete(&self.model, messages, 0.1, 300)
            .await?;

        let result = parse_score_response(&content)
            .context("Scoring response held no recoverable JSON")?;
        debug!(toxicity = result.toxicity, "Scoring result");
        Ok(result)
    }
}
