// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The editor seam: everything the panel needs from its host editor.
//!
//! The trait is async because real editor bridges (RPC to an embedded editor
//! process) are; [`BufferEditor`] is the in-memory implementation used by the
//! terminal panel and the tests.

use anyhow::Result;
use async_trait::async_trait;

use crate::selection::{Position, Range};

/// An editor-like collaborator: get/set selection, read/replace text in a
/// range, and line/column metrics.
#[async_trait]
pub trait Editor: Send + Sync {
    /// The current live selection, if any.
    async fn selection(&self) -> Result<Option<Range>>;

    async fn set_selection(&mut self, range: Option<Range>) -> Result<()>;

    async fn line_count(&self) -> Result<usize>;

    /// Character length of one line (no trailing newline).
    async fn line_len(&self, line: usize) -> Result<usize>;

    async fn text_in_range(&self, range: Range) -> Result<String>;

    /// Replace exactly one range with `text`.  Any undo integration is the
    /// editor's own.
    async fn replace_range(&mut self, range: Range, text: &str) -> Result<()>;

    /// The range spanning the entire document.
    async fn document_range(&self) -> Result<Range> {
        let lines = self.line_count().await?;
        if lines == 0 {
            let origin = Position::new(0, 0);
            return Ok(Range::new(origin, origin));
        }
        let last = lines - 1;
        let end = Position::new(last, self.line_len(last).await?);
        Ok(Range::new(Position::new(0, 0), end))
    }

    async fn document_text(&self) -> Result<String> {
        let range = self.document_range().await?;
        self.text_in_range(range).await
    }
}

/// In-memory line-buffer editor.
///
/// Columns are character offsets; out-of-bounds positions clamp to the
/// nearest valid one instead of failing, matching how editor APIs treat stale
/// ranges.
#[derive(Debug, Clone)]
pub struct BufferEditor {
    lines: Vec<String>,
    selection: Option<Range>,
}

impl Default for BufferEditor {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl BufferEditor {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(String::from).collect(),
            selection: None,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Set the live selection directly (what a mouse drag would do).
    pub fn select(&mut self, range: Range) {
        self.selection = Some(range.normalised());
    }

    fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.lines.len() - 1);
        let column = pos.column.min(char_len(&self.lines[line]));
        Position::new(line, column)
    }

    fn clamp_range(&self, range: Range) -> Range {
        let r = range.normalised();
        Range::new(self.clamp(r.start), self.clamp(r.end))
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of character column `col`, saturating at the end of the line.
fn byte_index(s: &str, col: usize) -> usize {
    s.char_indices().nth(col).map(|(i, _)| i).unwrap_or(s.len())
}

#[async_trait]
impl Editor for BufferEditor {
    async fn selection(&self) -> Result<Option<Range>> {
        Ok(self.selection)
    }

    async fn set_selection(&mut self, range: Option<Range>) -> Result<()> {
        self.selection = range.map(|r| self.clamp_range(r));
        Ok(())
    }

    async fn line_count(&self) -> Result<usize> {
        Ok(self.lines.len())
    }

    async fn line_len(&self, line: usize) -> Result<usize> {
        anyhow::ensure!(line < self.lines.len(), "line {line} out of bounds");
        Ok(char_len(&self.lines[line]))
    }

    async fn text_in_range(&self, range: Range) -> Result<String> {
        let r = self.clamp_range(range);
        if r.start.line == r.end.line {
            let line = &self.lines[r.start.line];
            return Ok(line[byte_index(line, r.start.column)..byte_index(line, r.end.column)]
                .to_string());
        }

        let first = &self.lines[r.start.line];
        let mut out = first[byte_index(first, r.start.column)..].to_string();
        for line in &self.lines[r.start.line + 1..r.end.line] {
            out.push('\n');
            out.push_str(line);
        }
        let last = &self.lines[r.end.line];
        out.push('\n');
        out.push_str(&last[..byte_index(last, r.end.column)]);
        Ok(out)
    }

    async fn replace_range(&mut self, range: Range, text: &str) -> Result<()> {
        let r = self.clamp_range(range);
        let first = &self.lines[r.start.line];
        let last = &self.lines[r.end.line];
        let prefix = first[..byte_index(first, r.start.column)].to_string();
        let suffix = last[byte_index(last, r.end.column)..].to_string();

        let mut pieces = text.split('\n');
        let mut replacement = Vec::new();
        // split('\n') always yields at least one piece, even for "".
        let head = pieces.next().unwrap_or_default();
        replacement.push(format!("{prefix}{head}"));
        for piece in pieces {
            replacement.push(piece.to_string());
        }
        if let Some(tail) = replacement.last_mut() {
            tail.push_str(&suffix);
        }

        self.lines.splice(r.start.line..=r.end.line, replacement);
        // The replaced region no longer exists; collapse the live selection.
        self.selection = None;
        Ok(())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: usize, sc: usize, el: usize, ec: usize) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[tokio::test]
    async fn empty_editor_has_one_empty_line() {
        let ed = BufferEditor::default();
        assert_eq!(ed.line_count().await.unwrap(), 1);
        assert_eq!(ed.line_len(0).await.unwrap(), 0);
        assert_eq!(ed.text(), "");
    }

    #[tokio::test]
    async fn document_range_spans_all_lines() {
        let ed = BufferEditor::from_text("abc\ndefgh");
        let r = ed.document_range().await.unwrap();
        assert_eq!(r, range(0, 0, 1, 5));
    }

    #[tokio::test]
    async fn document_text_round_trips() {
        let text = "fn main() {\n    println!(\"hi\");\n}";
        let ed = BufferEditor::from_text(text);
        assert_eq!(ed.document_text().await.unwrap(), text);
    }

    #[tokio::test]
    async fn text_in_range_single_line() {
        let ed = BufferEditor::from_text("hello world");
        assert_eq!(ed.text_in_range(range(0, 6, 0, 11)).await.unwrap(), "world");
    }

    #[tokio::test]
    async fn text_in_range_multi_line() {
        let ed = BufferEditor::from_text("one\ntwo\nthree");
        assert_eq!(ed.text_in_range(range(0, 1, 2, 3)).await.unwrap(), "ne\ntwo\nthr");
    }

    #[tokio::test]
    async fn text_in_range_backwards_selection_normalises() {
        let ed = BufferEditor::from_text("one\ntwo");
        assert_eq!(ed.text_in_range(range(1, 3, 0, 0)).await.unwrap(), "one\ntwo");
    }

    #[tokio::test]
    async fn replace_range_within_one_line() {
        let mut ed = BufferEditor::from_text("let x = 1;");
        ed.replace_range(range(0, 8, 0, 9), "42").await.unwrap();
        assert_eq!(ed.text(), "let x = 42;");
    }

    #[tokio::test]
    async fn replace_range_across_lines() {
        let mut ed = BufferEditor::from_text("aaa\nbbb\nccc");
        ed.replace_range(range(0, 1, 2, 2), "XX\nYY").await.unwrap();
        assert_eq!(ed.text(), "aXX\nYYc");
    }

    #[tokio::test]
    async fn replace_whole_document() {
        let mut ed = BufferEditor::from_text("old\ncontent");
        let all = ed.document_range().await.unwrap();
        ed.replace_range(all, "new").await.unwrap();
        assert_eq!(ed.text(), "new");
    }

    #[tokio::test]
    async fn replace_at_cursor_inserts() {
        let mut ed = BufferEditor::from_text("ab");
        ed.replace_range(range(0, 1, 0, 1), "XYZ").await.unwrap();
        assert_eq!(ed.text(), "aXYZb");
    }

    #[tokio::test]
    async fn replace_clears_live_selection() {
        let mut ed = BufferEditor::from_text("abcdef");
        ed.select(range(0, 0, 0, 3));
        ed.replace_range(range(0, 0, 0, 3), "x").await.unwrap();
        assert_eq!(ed.selection().await.unwrap(), None);
    }

    #[tokio::test]
    async fn columns_count_characters_not_bytes() {
        let mut ed = BufferEditor::from_text("héllo");
        ed.replace_range(range(0, 1, 0, 2), "e").await.unwrap();
        assert_eq!(ed.text(), "hello");
    }

    #[tokio::test]
    async fn out_of_bounds_range_clamps() {
        let mut ed = BufferEditor::from_text("short");
        ed.replace_range(range(0, 2, 9, 99), "!").await.unwrap();
        assert_eq!(ed.text(), "sh!");
    }

    #[tokio::test]
    async fn line_len_out_of_bounds_errors() {
        let ed = BufferEditor::from_text("one");
        assert!(ed.line_len(5).await.is_err());
    }
}
