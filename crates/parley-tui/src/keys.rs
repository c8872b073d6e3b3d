// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// All logical actions the panel UI can perform, independent of key binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    FocusChat,
    FocusInput,
    /// First key of the Ctrl+w nav chord (vim-style window navigation).
    /// The App will watch for a follow-up key to decide the target pane.
    NavPrefix,

    // Scrolling (in chat pane)
    ScrollUp,
    ScrollDown,
    ScrollPageUp,
    ScrollPageDown,
    ScrollTop,
    ScrollBottom,

    // Code-block actions (in chat pane)
    /// Insert the n-th code block of the latest reply into the editor.
    InsertBlock(usize),
    /// First key of the y-chord; a digit follow-up picks the block to copy.
    CopyPrefix,
    /// Copy the n-th code block of the latest reply to the clipboard.
    CopyBlock(usize),

    // Input
    InputChar(char),
    InputNewline,
    InputBackspace,
    InputDelete,
    InputMoveCursorLeft,
    InputMoveCursorRight,
    InputMoveLineStart,
    InputMoveLineEnd,
    InputDeleteToEnd,
    InputDeleteToStart,
    Submit,

    // App
    Quit,
    Help,
}

/// Map a raw key event to an [`Action`], depending on which pane has focus.
///
/// `pending_nav` — true when a Ctrl+w prefix has been received but not yet
/// resolved.  `pending_copy` — true when a `y` prefix awaits its digit.  In
/// either pending state any unexpected key cancels the chord (returning None
/// causes the App to clear the flag without acting).
pub fn map_key(
    event: KeyEvent,
    in_input: bool,
    pending_nav: bool,
    pending_copy: bool,
) -> Option<Action> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let shift = event.modifiers.contains(KeyModifiers::SHIFT);
    // "plain" = no modifier that would make a char a control sequence
    let plain = !ctrl && !alt;

    // ── Pending Ctrl+w chord ──────────────────────────────────────────────────
    if pending_nav {
        return match event.code {
            KeyCode::Char('k') | KeyCode::Up => Some(Action::FocusChat),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::FocusInput),
            _ => None, // cancel without action
        };
    }

    // ── Pending y chord ───────────────────────────────────────────────────────
    if pending_copy {
        return match event.code {
            KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
                Some(Action::CopyBlock(c as usize - '1' as usize))
            }
            _ => None,
        };
    }

    match event.code {
        // ── Input-pane overrides come FIRST so they shadow global bindings ────
        KeyCode::Char('u') if ctrl && in_input => Some(Action::InputDeleteToStart),
        KeyCode::Char('k') if ctrl && in_input => Some(Action::InputDeleteToEnd),

        // ── Global bindings ───────────────────────────────────────────────────
        KeyCode::Char('q') if ctrl => Some(Action::Quit),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),

        // Ctrl+w → start the nav-prefix chord (works from any pane)
        KeyCode::Char('w') if ctrl => Some(Action::NavPrefix),

        KeyCode::F(1) => Some(Action::Help),

        // ── Rest of input pane ────────────────────────────────────────────────
        KeyCode::Enter if in_input && !shift => Some(Action::Submit),
        KeyCode::Enter if in_input && shift => Some(Action::InputNewline),
        KeyCode::Backspace if in_input => Some(Action::InputBackspace),
        KeyCode::Delete if in_input => Some(Action::InputDelete),
        KeyCode::Left if in_input => Some(Action::InputMoveCursorLeft),
        KeyCode::Right if in_input => Some(Action::InputMoveCursorRight),
        KeyCode::Home if in_input => Some(Action::InputMoveLineStart),
        KeyCode::End if in_input => Some(Action::InputMoveLineEnd),
        // Printable characters — only when no ctrl/alt modifier
        KeyCode::Char(c) if in_input && plain => Some(Action::InputChar(c)),

        // ── Chat pane ─────────────────────────────────────────────────────────
        KeyCode::Up | KeyCode::Char('k') if !in_input && plain => Some(Action::ScrollUp),
        KeyCode::Down | KeyCode::Char('j') if !in_input && plain => Some(Action::ScrollDown),
        KeyCode::Char('u') if ctrl && !in_input => Some(Action::ScrollPageUp),
        KeyCode::Char('d') if ctrl && !in_input => Some(Action::ScrollPageDown),
        KeyCode::Char('g') if !in_input && plain => Some(Action::ScrollTop),
        KeyCode::Char('G') if !in_input => Some(Action::ScrollBottom),

        KeyCode::Char('y') if !in_input && plain => Some(Action::CopyPrefix),
        KeyCode::Char(c) if !in_input && plain && c.is_ascii_digit() && c != '0' => {
            Some(Action::InsertBlock(c as usize - '1' as usize))
        }

        _ => None,
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

    use super::*;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: mods,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    fn plain_key(c: char) -> KeyEvent { key(KeyCode::Char(c), KeyModifiers::NONE) }
    fn ctrl_key(c: char) -> KeyEvent { key(KeyCode::Char(c), KeyModifiers::CONTROL) }

    // ── Ctrl+w chord ─────────────────────────────────────────────────────────

    #[test]
    fn ctrl_w_returns_nav_prefix() {
        let ev = ctrl_key('w');
        assert_eq!(map_key(ev, false, false, false), Some(Action::NavPrefix));
        assert_eq!(map_key(ev, true, false, false), Some(Action::NavPrefix));
    }

    #[test]
    fn pending_nav_k_focuses_chat() {
        let ev = plain_key('k');
        assert_eq!(map_key(ev, false, true, false), Some(Action::FocusChat));
        assert_eq!(map_key(ev, true, true, false), Some(Action::FocusChat));
    }

    #[test]
    fn pending_nav_j_focuses_input() {
        let ev = plain_key('j');
        assert_eq!(map_key(ev, false, true, false), Some(Action::FocusInput));
    }

    #[test]
    fn pending_nav_other_key_cancels() {
        let ev = plain_key('x');
        assert_eq!(map_key(ev, false, true, false), None);
    }

    // ── y chord ──────────────────────────────────────────────────────────────

    #[test]
    fn y_in_chat_starts_copy_chord() {
        let ev = plain_key('y');
        assert_eq!(map_key(ev, false, false, false), Some(Action::CopyPrefix));
    }

    #[test]
    fn pending_copy_digit_picks_block() {
        let ev = plain_key('2');
        assert_eq!(map_key(ev, false, false, true), Some(Action::CopyBlock(1)));
    }

    #[test]
    fn pending_copy_zero_cancels() {
        let ev = plain_key('0');
        assert_eq!(map_key(ev, false, false, true), None);
    }

    #[test]
    fn y_in_input_types_y() {
        let ev = plain_key('y');
        assert_eq!(map_key(ev, true, false, false), Some(Action::InputChar('y')));
    }

    // ── Insert digits ────────────────────────────────────────────────────────

    #[test]
    fn digit_in_chat_inserts_block() {
        assert_eq!(map_key(plain_key('1'), false, false, false), Some(Action::InsertBlock(0)));
        assert_eq!(map_key(plain_key('3'), false, false, false), Some(Action::InsertBlock(2)));
    }

    #[test]
    fn digit_in_input_types_digit() {
        let ev = plain_key('1');
        assert_eq!(map_key(ev, true, false, false), Some(Action::InputChar('1')));
    }

    // ── Ctrl modifier should NOT type a character ─────────────────────────────

    #[test]
    fn ctrl_w_in_input_does_not_type_w() {
        let ev = ctrl_key('w');
        let action = map_key(ev, true, false, false);
        assert_ne!(action, Some(Action::InputChar('w')));
        assert_eq!(action, Some(Action::NavPrefix));
    }

    #[test]
    fn ctrl_x_unbound_does_not_type_x() {
        let ev = ctrl_key('x');
        assert_eq!(map_key(ev, true, false, false), None);
    }

    #[test]
    fn alt_char_in_input_does_not_type() {
        let ev = key(KeyCode::Char('a'), KeyModifiers::ALT);
        assert_eq!(map_key(ev, true, false, false), None);
    }

    // ── Normal typing ─────────────────────────────────────────────────────────

    #[test]
    fn plain_char_in_input_types() {
        let ev = plain_key('h');
        assert_eq!(map_key(ev, true, false, false), Some(Action::InputChar('h')));
    }

    #[test]
    fn enter_in_input_submits() {
        let ev = key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(map_key(ev, true, false, false), Some(Action::Submit));
    }

    #[test]
    fn shift_enter_in_input_inserts_newline() {
        let ev = key(KeyCode::Enter, KeyModifiers::SHIFT);
        assert_eq!(map_key(ev, true, false, false), Some(Action::InputNewline));
    }

    #[test]
    fn ctrl_k_in_input_deletes_to_end() {
        let ev = ctrl_key('k');
        assert_eq!(map_key(ev, true, false, false), Some(Action::InputDeleteToEnd));
    }

    // ── Global quit ───────────────────────────────────────────────────────────

    #[test]
    fn ctrl_c_quits_from_any_pane() {
        let ev = ctrl_key('c');
        assert_eq!(map_key(ev, false, false, false), Some(Action::Quit));
        assert_eq!(map_key(ev, true, false, false), Some(Action::Quit));
    }

    // ── Chat scrolling ────────────────────────────────────────────────────────

    #[test]
    fn j_in_chat_scrolls_down() {
        let ev = plain_key('j');
        assert_eq!(map_key(ev, false, false, false), Some(Action::ScrollDown));
    }

    #[test]
    fn ctrl_u_in_chat_page_up() {
        let ev = ctrl_key('u');
        assert_eq!(map_key(ev, false, false, false), Some(Action::ScrollPageUp));
    }
}
