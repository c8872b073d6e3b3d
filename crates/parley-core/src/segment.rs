// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Split an assistant reply into prose and fenced-code pieces.
//!
//! The output is one ordered list of tagged segments rather than two parallel
//! text/code lists, so a reply that starts or ends with a code block (or has
//! adjacent blocks) cannot drop trailing pieces.

use std::sync::OnceLock;

use regex::Regex;

/// Language tag used when a fence has none.
pub const DEFAULT_LANGUAGE: &str = "text";

/// One piece of a segmented reply, in original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplySegment {
    Text(String),
    Code { language: String, code: String },
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```([A-Za-z0-9_+.#-]*)[ \t]*\r?\n([\s\S]*?)```")
            .expect("fence pattern is valid")
    })
}

/// Scan `reply` for fenced code blocks and return the interleaved segments.
///
/// Prose around the fences is trimmed; gaps that trim to nothing produce no
/// segment.  Code bodies are trimmed and keep their optional language tag
/// (default [`DEFAULT_LANGUAGE`]).  An unterminated fence is not a block and
/// falls through as prose.
pub fn segment_reply(reply: &str) -> Vec<ReplySegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in fence_re().captures_iter(reply) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut segments, &reply[cursor..whole.start()]);

        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE);
        let code = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        segments.push(ReplySegment::Code {
            language: language.to_string(),
            code: code.trim().to_string(),
        });

        cursor = whole.end();
    }

    push_text(&mut segments, &reply[cursor..]);
    segments
}

fn push_text(segments: &mut Vec<ReplySegment>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        segments.push(ReplySegment::Text(trimmed.to_string()));
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
