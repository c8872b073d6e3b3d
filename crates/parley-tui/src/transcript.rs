// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Turn the panel transcript into styled lines for the chat pane.

use chrono::{DateTime, Utc};
use parley_core::{ReplySegment, TranscriptEntry};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::markdown::{render_markdown, StyledLines};

/// A code block of the latest reply, addressable by its 1-based on-screen
/// number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

/// The code blocks of the most recent assistant entry, in display order.
/// Insert and copy actions address these.
pub fn latest_code_blocks(entries: &[TranscriptEntry]) -> Vec<CodeBlock> {
    let last = entries
        .iter()
        .rev()
        .find_map(|e| match e {
            TranscriptEntry::Assistant { segments, .. } => Some(segments),
            _ => None,
        });

    let Some(segments) = last else { return Vec::new() };
    segments
        .iter()
        .filter_map(|s| match s {
            ReplySegment::Code { language, code } => Some(CodeBlock {
                language: language.clone(),
                code: code.clone(),
            }),
            ReplySegment::Text(_) => None,
        })
        .collect()
}

/// Render the whole transcript for a chat pane `width` columns wide.
pub fn render_transcript(
    entries: &[TranscriptEntry],
    width: u16,
    ascii: bool,
    timestamps: bool,
) -> StyledLines {
    let mut lines: StyledLines = Vec::new();

    for entry in entries {
        match entry {
            TranscriptEntry::User { text, at } => {
                lines.push(header("You", Color::LightGreen, *at, timestamps));
                for l in wrap_plain(text, width as usize) {
                    lines.push(Line::from(Span::raw(l)));
                }
                lines.push(Line::default());
            }
            TranscriptEntry::Assistant { segments, at } => {
                lines.push(header("Assistant", Color::LightBlue, *at, timestamps));
                let mut block_no = 0;
                for segment in segments {
                    match segment {
                        ReplySegment::Text(text) => {
                            lines.extend(render_markdown(text, width, ascii));
                        }
                        ReplySegment::Code { language, code } => {
                            block_no += 1;
                            push_code_block(&mut lines, block_no, language, code, ascii);
                        }
                    }
                }
                lines.push(Line::default());
            }
            TranscriptEntry::Error { message, at } => {
                lines.push(header("Error", Color::Red, *at, timestamps));
                let mark = if ascii { "x " } else { "✗ " };
                lines.push(Line::from(Span::styled(
                    format!("{mark}{message}"),
                    Style::default().fg(Color::Red),
                )));
                lines.push(Line::default());
            }
        }
    }

    lines
}

fn header(who: &str, color: Color, at: DateTime<Utc>, timestamps: bool) -> Line<'static> {
    let mut spans = vec![Span::styled(
        who.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if timestamps {
        spans.push(Span::styled(
            format!("  {}", at.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn push_code_block(
    lines: &mut StyledLines,
    number: usize,
    language: &str,
    code: &str,
    ascii: bool,
) {
    let gutter = if ascii { "| " } else { "│ " };
    lines.push(Line::from(Span::styled(
        format!("[{number}] {language}"),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));
    for l in code.split('\n') {
        lines.push(Line::from(vec![
            Span::styled(gutter.to_string(), Style::default().fg(Color::DarkGray)),
            Span::styled(l.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }
    lines.push(Line::default());
}

/// Word-wrap plain text to `width` display columns, preserving explicit
/// newlines.  Unlike the markdown path this never reflows user input.
pub fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for raw in text.split('\n') {
        if raw.width() <= width {
            out.push(raw.to_string());
            continue;
        }
        let mut line = String::new();
        for word in raw.split_inclusive(' ') {
            if line.width() + word.width() > width && !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            out.push(line);
        }
    }
    out
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
