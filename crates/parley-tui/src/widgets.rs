// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crate::markdown::StyledLines;

// ── Character sets ────────────────────────────────────────────────────────────

fn sep(ascii: bool) -> &'static str {
    if ascii { "|" } else { "│" }
}
fn busy_char(ascii: bool) -> &'static str {
    if ascii { "* " } else { "⠿ " }
}
fn rule_char(ascii: bool) -> char {
    if ascii { '-' } else { '─' }
}
fn blockquote_prefix(ascii: bool) -> &'static str {
    if ascii { "> " } else { "▌ " }
}
fn bullet(ascii: bool) -> &'static str {
    if ascii { "- " } else { "• " }
}
fn border_type(ascii: bool) -> BorderType {
    if ascii { BorderType::Plain } else { BorderType::Rounded }
}

// ── Draw functions ────────────────────────────────────────────────────────────

/// Draw the status bar at the top.
pub fn draw_status(
    frame: &mut Frame,
    area: Rect,
    model_label: &str,
    busy: bool,
    selection_held: bool,
    note: Option<&str>,
    ascii: bool,
) {
    let busy_indicator = if busy { busy_char(ascii) } else { "  " };
    let separator = sep(ascii);

    let held_span: Span<'static> = if selection_held {
        Span::styled(
            format!(" {separator} selection held"),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::raw("")
    };

    let note_span: Span<'static> = if let Some(n) = note {
        Span::styled(format!("  {n}"), Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {busy_indicator}"),
            Style::default().fg(if busy { Color::Yellow } else { Color::DarkGray }),
        ),
        Span::styled(format!(" {model_label} "), Style::default().fg(Color::LightCyan)),
        held_span,
        note_span,
        Span::styled(
            "  F1:help  ^w k:↑chat  ^w j:↓input  1-9:insert  y#:copy  ^c:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let para = Paragraph::new(line).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(para, area);
}

/// Draw the chat scroll pane.
pub fn draw_chat(
    frame: &mut Frame,
    area: Rect,
    lines: &StyledLines,
    scroll_offset: u16,
    focused: bool,
    ascii: bool,
) {
    let block = pane_block("Chat", focused, ascii);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible: Vec<Line<'static>> = lines
        .iter()
        .skip(scroll_offset as usize)
        .take(inner.height as usize)
        .cloned()
        .collect();

    let para = Paragraph::new(visible).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);
}

/// Draw the input box at the bottom.
pub fn draw_input(
    frame: &mut Frame,
    area: Rect,
    content: &str,
    cursor_col: usize,
    focused: bool,
    busy: bool,
    ascii: bool,
) {
    let title = if busy {
        "Input  [waiting for reply…]"
    } else {
        "Input  [Enter:send  Shift+Enter:newline  ^w k:↑chat]"
    };

    let block = pane_block(title, focused, ascii);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let para = Paragraph::new(content).wrap(Wrap { trim: false });
    frame.render_widget(para, inner);

    if focused && !busy && inner.width > 0 {
        let col = (cursor_col % inner.width as usize) as u16;
        let row = (cursor_col / inner.width as usize) as u16;
        frame.set_cursor_position((inner.x + col, inner.y + row));
    }
}

/// Draw the help overlay.
pub fn draw_help(frame: &mut Frame, ascii: bool) {
    let area = frame.area();

    let help_text = vec![
        Line::from(Span::styled(
            "  Parley Key Bindings",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::LightBlue),
        )),
        Line::default(),
        Line::from(" ^w k     Focus chat pane"),
        Line::from(" ^w j     Focus input pane"),
        Line::from(" j/k      Scroll chat down/up"),
        Line::from(" ^u/^d    Half-page up/down"),
        Line::from(" g / G    Jump to top/bottom"),
        Line::from(" 1-9      Insert code block N of the latest reply"),
        Line::from("           into the captured selection, the current"),
        Line::from("           selection, or the whole file"),
        Line::from(" y then # Copy code block N to the clipboard"),
        Line::from(" Enter    Submit input"),
        Line::from(" S+Enter  Insert newline"),
        Line::from(" ^c / ^q  Quit"),
        Line::from(" F1       Toggle this help"),
        Line::default(),
        Line::from(Span::styled(
            " Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let width = 60u16.min(area.width);
    let height = (help_text.len() as u16 + 2).min(area.height);
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    let overlay = Rect::new(x, y, width, height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type(ascii))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);
    frame.render_widget(Paragraph::new(help_text), inner);
}

// ── Internal helpers ──────────────────────────────────────────────────────────

pub(crate) fn pane_block(title: &str, focused: bool, ascii: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::LightBlue)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(Span::styled(
            format!(" {title} "),
            if focused {
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(Color::LightBlue)
            } else {
                Style::default().fg(Color::Gray)
            },
        ))
        .borders(Borders::ALL)
        .border_type(border_type(ascii))
        .border_style(border_style)
}

pub(crate) fn md_rule_char(ascii: bool) -> char { rule_char(ascii) }
pub(crate) fn md_blockquote(ascii: bool) -> &'static str { blockquote_prefix(ascii) }
pub(crate) fn md_bullet(ascii: bool) -> &'static str { bullet(ascii) }
