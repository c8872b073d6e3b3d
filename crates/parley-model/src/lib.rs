// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod backend;
mod mock;
mod openai_compat;
mod types;

pub use backend::{ChatBackend, ResponseStream};
pub use mock::{MockBackend, ScriptedBackend};
pub use openai_compat::{AuthStyle, OpenAiCompatBackend};
pub use types::*;

use anyhow::bail;
use parley_config::ModelConfig;

/// Construct a boxed [`ChatBackend`] from configuration.
///
/// Backend selection:
/// - `"openai"` / `"openrouter"` — hosted APIs with bearer auth and a known
///   base URL (overridable via `base_url`)
/// - `"ollama"` — local OpenAI-compatible server, no auth
/// - `"custom"` — any OpenAI-compatible endpoint; `base_url` is required and
///   bearer auth is used when a key resolves
/// - `"mock"` — deterministic echo backend for tests and offline demos
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Box<dyn ChatBackend>> {
    let key = resolve_api_key(cfg);
    let backend = match cfg.provider.as_str() {
        "openai" => OpenAiCompatBackend::new(
            "openai",
            cfg.name.clone(),
            key,
            cfg.base_url.as_deref().unwrap_or("https://api.openai.com/v1"),
            cfg.max_tokens,
            cfg.temperature,
            AuthStyle::Bearer,
        ),
        "openrouter" => OpenAiCompatBackend::new(
            "openrouter",
            cfg.name.clone(),
            key,
            cfg.base_url.as_deref().unwrap_or("https://openrouter.ai/api/v1"),
            cfg.max_tokens,
            cfg.temperature,
            AuthStyle::Bearer,
        ),
        "ollama" => OpenAiCompatBackend::new(
            "ollama",
            cfg.name.clone(),
            None,
            cfg.base_url.as_deref().unwrap_or("http://localhost:11434/v1"),
            cfg.max_tokens,
            cfg.temperature,
            AuthStyle::None,
        ),
        "custom" => {
            let base = match &cfg.base_url {
                Some(b) => b.as_str(),
                None => bail!("provider \"custom\" requires base_url in config"),
            };
            let auth = if key.is_some() { AuthStyle::Bearer } else { AuthStyle::None };
            OpenAiCompatBackend::new("custom", cfg.name.clone(), key, base, cfg.max_tokens, cfg.temperature, auth)
        }
        "mock" => return Ok(Box::new(MockBackend)),
        other => bail!("unknown model provider: {other}"),
    };
    Ok(Box::new(backend))
}

fn resolve_api_key(cfg: &ModelConfig) -> Option<String> {
    if let Some(k) = &cfg.api_key {
        return Some(k.clone());
    }
    if let Some(env) = &cfg.api_key_env {
        return std::env::var(env).ok();
    }
    let canonical = match cfg.provider.as_str() {
        "openai" => "OPENAI_API_KEY",
        "openrouter" => "OPENROUTER_API_KEY",
        _ => return None,
    };
    std::env::var(canonical).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
