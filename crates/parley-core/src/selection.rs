// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// A zero-based line/column position in an editor document.
///
/// Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A start/end span identifying a region of editor text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width range is a bare cursor, not a selection.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return the range with start ≤ end (editors report backwards selections
    /// when the user dragged upward).
    pub fn normalised(&self) -> Self {
        if self.start <= self.end {
            *self
        } else {
            Self { start: self.end, end: self.start }
        }
    }
}

/// The captured-selection state machine: **empty** or **held**.
///
/// A non-empty editor selection present at submit time transitions to held;
/// the first insert action consumes it (held → empty).  There is no timeout
/// and no explicit cancel.  This is plain state owned by the panel and passed
/// into the insert handler, never a shared global.
#[derive(Debug, Default)]
pub struct HeldSelection(Option<Range>);

impl HeldSelection {
    /// Transition to held.  Empty ranges are ignored — a bare cursor is not a
    /// selection worth capturing.
    pub fn capture(&mut self, range: Range) {
        if !range.is_empty() {
            self.0 = Some(range.normalised());
        }
    }

    /// Consume the held range, transitioning back to empty.  At-most-once:
    /// a second call yields `None` until the next capture.
    pub fn take(&mut self) -> Option<Range> {
        self.0.take()
    }

    pub fn is_held(&self) -> bool {
        self.0.is_some()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
