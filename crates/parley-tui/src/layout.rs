// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

/// The regions that make up the panel layout.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub status_bar: Rect,
    pub chat_pane: Rect,
    pub input_pane: Rect,
}

impl AppLayout {
    /// Calculate layout regions from a `Rect` (terminal area).
    pub fn compute(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(5),
            ])
            .split(area);

        AppLayout {
            status_bar: vertical[0],
            chat_pane: vertical[1],
            input_pane: vertical[2],
        }
    }

    /// Convenience wrapper — derive the area from the current frame.
    pub fn new(frame: &Frame) -> Self {
        Self::compute(frame.area())
    }

    /// The number of text rows visible inside the chat pane's border.
    /// (pane height minus the two border rows)
    pub fn chat_inner_height(&self) -> u16 {
        self.chat_pane.height.saturating_sub(2)
    }

    /// The number of text columns inside the chat pane's border.
    pub fn chat_inner_width(&self) -> u16 {
        self.chat_pane.width.saturating_sub(2)
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_stack_without_overlap() {
        let l = AppLayout::compute(Rect::new(0, 0, 80, 24));
        assert_eq!(l.status_bar.height, 1);
        assert_eq!(l.input_pane.height, 5);
        assert_eq!(l.chat_pane.height, 24 - 1 - 5);
        assert_eq!(l.chat_pane.y, 1);
        assert_eq!(l.input_pane.y, 1 + l.chat_pane.height);
    }

    #[test]
    fn inner_sizes_account_for_borders() {
        let l = AppLayout::compute(Rect::new(0, 0, 80, 24));
        assert_eq!(l.chat_inner_height(), l.chat_pane.height - 2);
        assert_eq!(l.chat_inner_width(), 78);
    }
}
