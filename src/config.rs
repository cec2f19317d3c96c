use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::gemini::ThinkingLevel;
use crate::util::{env_flag, env_trimmed};

/// Tunables for request translation, loadable from a JSON file or the environment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranslationConfig {
    /// Effort level sent to level-based (Gemini 3) thinking models.
    #[serde(default)]
    pub thinking_level: ThinkingLevel,

    /// Token budget sent to budget-based thinking models.
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,

    /// Output caps below this value are raised when thinking is enabled.
    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens_with_thinking: u32,

    /// Output cap used when thinking is enabled and the request cap is missing or too small.
    #[serde(default = "default_thinking_output_tokens")]
    pub thinking_output_tokens: u32,

    /// Ask the model to return its thought parts.
    #[serde(default = "default_include_thoughts")]
    pub include_thoughts: bool,

    /// Function name used for tool results whose originating call cannot be identified.
    #[serde(default = "default_tool_result_name")]
    pub tool_result_fallback_name: String,
}

fn default_thinking_budget() -> u32 {
    16000
}

fn default_min_output_tokens() -> u32 {
    8192
}

fn default_thinking_output_tokens() -> u32 {
    65535
}

fn default_include_thoughts() -> bool {
    true
}

fn default_tool_result_name() -> String {
    "unknown_function".to_string()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            thinking_level: ThinkingLevel::default(),
            thinking_budget: default_thinking_budget(),
            min_output_tokens_with_thinking: default_min_output_tokens(),
            thinking_output_tokens: default_thinking_output_tokens(),
            include_thoughts: default_include_thoughts(),
            tool_result_fallback_name: default_tool_result_name(),
        }
    }
}

impl TranslationConfig {
    /// Load the configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "Failed to read translation config file: {}",
                path.as_ref().display()
            )
        })?;

        let config: TranslationConfig = serde_json::from_str(&content)
            .with_context(|| "Failed to parse translation config JSON")?;

        Ok(config)
    }

    /// Defaults overlaid with environment variables:
    /// - CHAT2GEMINI_THINKING_LEVEL = low|medium|high
    /// - CHAT2GEMINI_THINKING_BUDGET = <u32>
    /// - CHAT2GEMINI_INCLUDE_THOUGHTS = 1|true|yes|on (anything else disables)
    /// - CHAT2GEMINI_TOOL_RESULT_NAME = <name>
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(level) = env_trimmed("CHAT2GEMINI_THINKING_LEVEL") {
            match ThinkingLevel::parse(&level) {
                Some(l) => config.thinking_level = l,
                None => tracing::warn!(value = %level, "ignoring invalid CHAT2GEMINI_THINKING_LEVEL"),
            }
        }
        if let Some(budget) = env_trimmed("CHAT2GEMINI_THINKING_BUDGET") {
            match budget.parse::<u32>() {
                Ok(n) => config.thinking_budget = n,
                Err(_) => {
                    tracing::warn!(value = %budget, "ignoring invalid CHAT2GEMINI_THINKING_BUDGET")
                }
            }
        }
        if let Some(include) = env_flag("CHAT2GEMINI_INCLUDE_THOUGHTS") {
            config.include_thoughts = include;
        }
        if let Some(name) = env_trimmed("CHAT2GEMINI_TOOL_RESULT_NAME") {
            config.tool_result_fallback_name = name;
        }

        config
    }
}
