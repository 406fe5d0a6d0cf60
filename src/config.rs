// Central configuration loaded from environment variables.
//
// All secrets come from env vars (never hardcoded). The .env file is
// loaded at startup via dotenvy. Presence or absence of the API key is
// the one externally observable mode switch: with a key the full dual
// pipeline runs, without it every request takes the rule-only path.

use std::env;

use anyhow::Result;

use crate::cache::DEFAULT_CAPACITY;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GUARD_MODEL: &str = "llama-guard-3-8b";
pub const DEFAULT_SCORING_MODEL: &str = "llama-3.1-8b-instant";

pub struct Config {
    /// Groq API key. Empty means rule-only fallback mode.
    pub api_key: String,
    /// Chat-completions endpoint (defaults to the Groq OpenAI-compatible URL).
    pub api_url: String,
    /// Safety classifier model name.
    pub guard_model: String,
    /// Scoring classifier model name.
    pub scoring_model: String,
    /// Result cache bound.
    pub cache_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables. Everything has a
    /// default except the API key, whose absence selects fallback mode
    /// rather than being an error.
    pub fn load() -> Result<Self> {
        let cache_capacity = env::var("CONTENTSHIELD_CACHE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CAPACITY);

        Ok(Self {
            api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            api_url: env::var("CONTENTSHIELD_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            guard_model: env::var("CONTENTSHIELD_GUARD_MODEL")
                .unwrap_or_else(|_| DEFAULT_GUARD_MODEL.to_string()),
            scoring_model: env::var("CONTENTSHIELD_SCORING_MODEL")
                .unwrap_or_else(|_| DEFAULT_SCORING_MODEL.to_string()),
            cache_capacity,
        })
    }

    /// Whether external classifier credentials are configured.
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Check that the API key is configured. Call this before any
    /// operation that must not silently degrade to rule-only mode.
    pub fn require_credentials(&self) -> Result<()> {
        if !self.has_credentials() {
            anyhow::bail!(
                "GROQ_API_KEY not set. Add it to your .env file.\n\
                 Without it, analysis runs in rule-only fallback mode."
            );
        }
        Ok(())
    }
}
