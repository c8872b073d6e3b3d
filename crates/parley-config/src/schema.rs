// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};

/// Serde default helper — returns `true`.
///
/// `#[serde(default)]` on a `bool` always falls back to `bool::default()`
/// (i.e. `false`), so fields that should be on unless explicitly disabled
/// need a named function.
fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model_name() -> String {
    "gpt-4o-mini".into()
}

fn default_max_tokens() -> Option<u32> {
    Some(1024)
}

fn default_temperature() -> Option<f32> {
    Some(0.2)
}

fn default_system_prompt() -> String {
    "You are a helpful coding assistant embedded in a code editor. \
     Answer concisely and put code in fenced blocks with a language tag."
        .into()
}

fn default_max_messages() -> usize {
    40
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub panel: PanelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backend identifier: "openai" | "openrouter" | "ollama" | "custom" | "mock"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name forwarded to the provider API
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Environment variable that holds the API key (read at runtime)
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Explicit API key; prefer api_key_env in config files to avoid secrets
    /// in version-controlled files
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override.  Required for provider = "custom"; useful for local
    /// proxies with the hosted providers.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0)
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
    /// Stream the response over SSE instead of waiting for the full body.
    #[serde(default = "default_true")]
    pub stream: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model_name(),
            // api_key_env is intentionally None here.  resolve_api_key() in
            // parley-model falls through to the canonical env-var name for
            // each provider (OPENAI_API_KEY, OPENROUTER_API_KEY, …).
            api_key_env: None,
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stream: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// System prompt that seeds every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Window applied to the outbound request when the conversation grows past
    /// this many messages.  The system message is always kept; the most recent
    /// messages fill the rest of the window.  0 disables the window entirely
    /// and every turn replays the full history.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Use plain ASCII characters in the panel instead of Unicode box-drawing
    /// glyphs.
    #[serde(default)]
    pub ascii: bool,
    /// Show HH:MM timestamps in message headers.
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_messages: default_max_messages(),
            ascii: false,
            timestamps: true,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
