// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Render the prose parts of a reply as styled Ratatui lines.
//!
//! Fenced code blocks are split out of replies before they reach this
//! renderer, so the interesting cases here are headings, emphasis, lists,
//! blockquotes, and inline code.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::widgets::{md_blockquote, md_bullet, md_rule_char};

/// A styled line ready for Ratatui rendering.
pub type StyledLines = Vec<Line<'static>>;

/// Convert a markdown string into styled [`Line`]s, word-wrapped to
/// `wrap_width` display columns.
///
/// `ascii` — when true, use plain ASCII characters instead of Unicode
/// glyphs so that fonts without wide Unicode support render cleanly.
pub fn render_markdown(md: &str, wrap_width: u16, ascii: bool) -> StyledLines {
    let width = if wrap_width == 0 { 80 } else { wrap_width as usize };
    let mut out = Renderer {
        width,
        ascii,
        lines: Vec::new(),
        spans: Vec::new(),
        styles: vec![Style::default()],
    };

    for event in Parser::new(md) {
        out.event(event);
    }
    out.flush_line_if_pending();
    out.lines
}

struct Renderer {
    width: usize,
    ascii: bool,
    lines: StyledLines,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
}

impl Renderer {
    fn style(&self) -> Style {
        *self.styles.last().unwrap_or(&Style::default())
    }

    fn line_break(&mut self) {
        if self.spans.is_empty() {
            self.lines.push(Line::default());
        } else {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn flush_line_if_pending(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    fn column(&self) -> usize {
        self.spans.iter().map(|s| s.content.width()).sum()
    }

    /// Append text at the current style, breaking lines at word boundaries
    /// when the display width runs out.
    fn wrapped_text(&mut self, text: &str) {
        let style = self.style();
        let mut col = self.column();
        let mut buf = String::new();
        for word in text.split_inclusive(' ') {
            if col + word.width() > self.width && !buf.is_empty() {
                self.spans.push(Span::styled(std::mem::take(&mut buf), style));
                self.line_break();
                col = 0;
            }
            buf.push_str(word);
            col += word.width();
        }
        if !buf.is_empty() {
            self.spans.push(Span::styled(buf, style));
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line_if_pending();
                self.styles.push(heading_style(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                self.styles.pop();
                self.line_break();
                self.lines.push(Line::default());
            }
            Event::Start(Tag::Strong) => {
                self.styles.push(self.style().add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::Strong) => {
                self.styles.pop();
            }
            Event::Start(Tag::Emphasis) => {
                self.styles.push(self.style().add_modifier(Modifier::ITALIC));
            }
            Event::End(TagEnd::Emphasis) => {
                self.styles.pop();
            }
            // An indented or stray fenced block that survived segmentation.
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush_line_if_pending();
                self.styles.push(Style::default().fg(Color::Cyan));
            }
            Event::End(TagEnd::CodeBlock) => {
                self.flush_line_if_pending();
                self.styles.pop();
                self.lines.push(Line::default());
            }
            Event::Start(Tag::List(_)) => {
                self.flush_line_if_pending();
            }
            Event::Start(Tag::Item) => {
                self.spans.push(Span::raw(format!("  {}", md_bullet(self.ascii))));
            }
            Event::End(TagEnd::Item) => {
                self.flush_line_if_pending();
            }
            Event::Start(Tag::BlockQuote(_)) => {
                self.styles.push(self.style().fg(Color::DarkGray));
                self.spans.push(Span::raw(md_blockquote(self.ascii).to_string()));
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.flush_line_if_pending();
                self.styles.pop();
                self.lines.push(Line::default());
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                self.line_break();
                self.lines.push(Line::default());
            }
            Event::Text(t) => {
                // Code-block text keeps its own line structure.
                if self.style().fg == Some(Color::Cyan) && t.contains('\n') {
                    let style = self.style();
                    for line in t.trim_end_matches('\n').split('\n') {
                        self.spans.push(Span::styled(line.to_string(), style));
                        self.line_break();
                    }
                } else {
                    self.wrapped_text(&t);
                }
            }
            Event::Code(t) => {
                let style = Style::default().fg(Color::Yellow).bg(Color::DarkGray);
                self.spans.push(Span::styled(format!("`{t}`"), style));
            }
            Event::SoftBreak => {
                self.spans.push(Span::raw(" "));
            }
            Event::HardBreak => {
                self.line_break();
            }
            Event::Rule => {
                self.flush_line_if_pending();
                self.lines.push(Line::from(Span::styled(
                    md_rule_char(self.ascii).to_string().repeat(self.width),
                    Style::default().fg(Color::DarkGray),
                )));
                self.lines.push(Line::default());
            }
            _ => {}
        }
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    match level {
        HeadingLevel::H1 => Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
        HeadingLevel::H2 => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        HeadingLevel::H3 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        _ => Style::default().add_modifier(Modifier::BOLD),
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────
