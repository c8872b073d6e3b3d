// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The TUI event loop.
//!
//! The panel (conversation + editor) lives on its own task so the UI keeps
//! redrawing while a request streams; UI and panel talk over two mpsc
//! channels.  The UI holds a display copy of the transcript and refreshes it
//! after every completed turn.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use crossterm::event::{Event, EventStream, KeyEventKind, MouseEventKind};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use parley_config::PanelConfig;
use parley_core::{BufferEditor, ChatPanel, InsertTarget, ReplySegment, TranscriptEntry};

use crate::{
    keys::{map_key, Action},
    layout::AppLayout,
    markdown::StyledLines,
    transcript::{latest_code_blocks, render_transcript},
    widgets::{draw_chat, draw_help, draw_input, draw_status},
};

/// Options passed when constructing the TUI app.
pub struct AppOptions {
    pub panel: PanelConfig,
    /// File whose contents back the editor buffer.  Inserts are written back
    /// to this path.
    pub file: Option<PathBuf>,
    pub initial_prompt: Option<String>,
}

/// Which pane currently holds keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
    Chat,
    Input,
}

enum PanelCommand {
    Submit(String),
    Insert(String),
}

enum PanelEvent {
    Delta(String),
    TurnFinished {
        transcript: Vec<TranscriptEntry>,
        selection_held: bool,
    },
    Inserted {
        target: InsertTarget,
        selection_held: bool,
    },
    InsertFailed,
}

/// The top-level TUI application state.
pub struct App {
    panel: Option<ChatPanel>,
    editor: Option<BufferEditor>,
    model_label: String,
    file: Option<PathBuf>,
    ascii: bool,
    timestamps: bool,

    focus: FocusPane,
    transcript: Vec<TranscriptEntry>,
    /// User message shown while its turn is still in flight.
    pending_user: Option<(String, DateTime<Utc>)>,
    /// Streamed assistant text accumulated during the in-flight turn.
    streaming: String,
    chat_lines: StyledLines,
    chat_width: u16,
    chat_height: u16,
    scroll_offset: u16,

    input_buffer: String,
    /// Byte offset into `input_buffer`, always on a char boundary.
    input_cursor: usize,

    busy: bool,
    selection_held: bool,
    status_note: Option<String>,
    show_help: bool,
    pending_nav: bool,
    pending_copy: bool,
    initial_prompt: Option<String>,

    cmd_tx: Option<mpsc::Sender<PanelCommand>>,
}

impl App {
    pub fn new(panel: ChatPanel, editor: BufferEditor, opts: AppOptions) -> Self {
        Self {
            model_label: panel.model_label(),
            selection_held: panel.has_held_selection(),
            panel: Some(panel),
            editor: Some(editor),
            file: opts.file,
            ascii: opts.panel.ascii,
            timestamps: opts.panel.timestamps,
            focus: FocusPane::Input,
            transcript: Vec::new(),
            pending_user: None,
            streaming: String::new(),
            chat_lines: Vec::new(),
            chat_width: 78,
            chat_height: 24,
            scroll_offset: 0,
            input_buffer: String::new(),
            input_cursor: 0,
            busy: false,
            status_note: None,
            show_help: false,
            pending_nav: false,
            pending_copy: false,
            initial_prompt: opts.initial_prompt,
            cmd_tx: None,
        }
    }

    /// Run the TUI event loop until quit.
    pub async fn run(mut self, mut terminal: DefaultTerminal) -> anyhow::Result<()> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PanelCommand>(64);
        let (event_tx, mut event_rx) = mpsc::channel::<PanelEvent>(512);

        let panel = self.panel.take().expect("panel moves to its task once");
        let editor = self.editor.take().expect("editor moves to its task once");
        let file = self.file.clone();
        tokio::spawn(async move {
            panel_task(panel, editor, file, cmd_rx, event_tx).await;
        });
        self.cmd_tx = Some(cmd_tx);

        if let Some(prompt) = self.initial_prompt.take() {
            self.submit(prompt).await;
        }

        let mut crossterm_events = EventStream::new();

        loop {
            if let Ok(size) = terminal.size() {
                let layout = AppLayout::compute(ratatui::layout::Rect::new(
                    0, 0, size.width, size.height,
                ));
                self.chat_height = layout.chat_inner_height().max(1);
                if self.chat_width != layout.chat_inner_width().max(20) {
                    self.chat_width = layout.chat_inner_width().max(20);
                    self.rebuild_chat();
                }
            }

            terminal.draw(|frame| {
                let layout = AppLayout::new(frame);
                draw_status(
                    frame,
                    layout.status_bar,
                    &self.model_label,
                    self.busy,
                    self.selection_held,
                    self.status_note.as_deref(),
                    self.ascii,
                );
                draw_chat(
                    frame,
                    layout.chat_pane,
                    &self.chat_lines,
                    self.scroll_offset,
                    self.focus == FocusPane::Chat,
                    self.ascii,
                );
                draw_input(
                    frame,
                    layout.input_pane,
                    &self.input_buffer,
                    self.input_buffer[..self.input_cursor].chars().count(),
                    self.focus == FocusPane::Input,
                    self.busy,
                    self.ascii,
                );
                if self.show_help {
                    draw_help(frame, self.ascii);
                }
            })?;

            tokio::select! {
                Some(panel_event) = event_rx.recv() => {
                    self.handle_panel_event(panel_event);
                }
                Some(Ok(term_event)) = crossterm_events.next() => {
                    if self.handle_term_event(term_event).await { break; }
                }
            }
        }

        Ok(())
    }

    // ── Panel event handler ───────────────────────────────────────────────────

    fn handle_panel_event(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::Delta(delta) => {
                self.streaming.push_str(&delta);
                self.rebuild_chat();
                self.scroll_to_bottom();
            }
            PanelEvent::TurnFinished { transcript, selection_held } => {
                self.transcript = transcript;
                self.streaming.clear();
                self.pending_user = None;
                self.busy = false;
                self.selection_held = selection_held;
                self.rebuild_chat();
                self.scroll_to_bottom();
            }
            PanelEvent::Inserted { target, selection_held } => {
                self.selection_held = selection_held;
                self.status_note = Some(
                    match target {
                        InsertTarget::HeldSelection => "replaced the captured selection",
                        InsertTarget::LiveSelection => "replaced the current selection",
                        InsertTarget::WholeDocument => "replaced the whole file",
                    }
                    .to_string(),
                );
            }
            PanelEvent::InsertFailed => {
                self.status_note = Some("insert failed, see log".to_string());
            }
        }
    }

    // ── Terminal event handler ────────────────────────────────────────────────

    async fn handle_term_event(&mut self, event: Event) -> bool {
        match event {
            Event::Key(k) if k.kind == KeyEventKind::Press => {
                // Help overlay: dismiss on any key
                if self.show_help {
                    self.show_help = false;
                    return false;
                }

                let in_input = self.focus == FocusPane::Input;
                if let Some(action) =
                    map_key(k, in_input, self.pending_nav, self.pending_copy)
                {
                    if action == Action::NavPrefix {
                        self.pending_nav = true;
                        return false;
                    }
                    if action == Action::CopyPrefix {
                        self.pending_copy = true;
                        return false;
                    }
                    self.pending_nav = false;
                    self.pending_copy = false;
                    return self.dispatch(action).await;
                }
                self.pending_nav = false;
                self.pending_copy = false;
                false
            }

            Event::Mouse(mouse) => {
                match mouse.kind {
                    MouseEventKind::ScrollUp => self.scroll_up(3),
                    MouseEventKind::ScrollDown => self.scroll_down(3),
                    _ => {}
                }
                false
            }

            Event::Resize(_, _) => {
                self.rebuild_chat();
                false
            }

            _ => false,
        }
    }

    // ── Action dispatcher ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,

            Action::FocusChat => self.focus = FocusPane::Chat,
            Action::FocusInput => self.focus = FocusPane::Input,
            Action::NavPrefix | Action::CopyPrefix => {}

            Action::ScrollUp => self.scroll_up(1),
            Action::ScrollDown => self.scroll_down(1),
            Action::ScrollPageUp => self.scroll_up(self.chat_height / 2),
            Action::ScrollPageDown => self.scroll_down(self.chat_height / 2),
            Action::ScrollTop => self.scroll_offset = 0,
            Action::ScrollBottom => self.scroll_to_bottom(),

            Action::InsertBlock(n) => self.insert_block(n).await,
            Action::CopyBlock(n) => self.copy_block(n),

            Action::InputChar(c) => {
                input_insert(&mut self.input_buffer, &mut self.input_cursor, c);
            }
            Action::InputNewline => {
                input_insert(&mut self.input_buffer, &mut self.input_cursor, '\n');
            }
            Action::InputBackspace => {
                input_backspace(&mut self.input_buffer, &mut self.input_cursor);
            }
            Action::InputDelete => {
                input_delete(&mut self.input_buffer, &mut self.input_cursor);
            }
            Action::InputMoveCursorLeft => {
                self.input_cursor = prev_char_boundary(&self.input_buffer, self.input_cursor);
            }
            Action::InputMoveCursorRight => {
                self.input_cursor = next_char_boundary(&self.input_buffer, self.input_cursor);
            }
            Action::InputMoveLineStart => self.input_cursor = 0,
            Action::InputMoveLineEnd => self.input_cursor = self.input_buffer.len(),
            Action::InputDeleteToEnd => {
                self.input_buffer.truncate(self.input_cursor);
            }
            Action::InputDeleteToStart => {
                self.input_buffer.drain(..self.input_cursor);
                self.input_cursor = 0;
            }
            Action::Submit => {
                let text = std::mem::take(&mut self.input_buffer);
                self.input_cursor = 0;
                self.submit(text).await;
            }

            Action::Help => self.show_help = true,
        }
        false
    }

    async fn submit(&mut self, text: String) {
        if text.trim().is_empty() {
            return;
        }
        if self.busy {
            self.status_note = Some("a request is already in flight".to_string());
            self.input_buffer = text;
            self.input_cursor = self.input_buffer.len();
            return;
        }
        self.busy = true;
        self.status_note = None;
        self.pending_user = Some((text.trim().to_string(), Utc::now()));
        self.rebuild_chat();
        self.scroll_to_bottom();
        if let Some(tx) = &self.cmd_tx {
            if tx.send(PanelCommand::Submit(text)).await.is_err() {
                error!("panel task is gone");
                self.busy = false;
            }
        }
    }

    async fn insert_block(&mut self, n: usize) {
        let blocks = latest_code_blocks(&self.transcript);
        let Some(block) = blocks.get(n) else {
            self.status_note = Some(format!("no code block {}", n + 1));
            return;
        };
        debug!(block = n + 1, "sending code block to editor");
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(PanelCommand::Insert(block.code.clone())).await;
        }
    }

    fn copy_block(&mut self, n: usize) {
        let blocks = latest_code_blocks(&self.transcript);
        let Some(block) = blocks.get(n) else {
            self.status_note = Some(format!("no code block {}", n + 1));
            return;
        };
        match arboard::Clipboard::new().and_then(|mut c| c.set_text(block.code.clone())) {
            Ok(()) => {
                self.status_note = Some(format!("copied code block {}", n + 1));
            }
            Err(e) => {
                warn!(error = %e, "clipboard unavailable");
                self.status_note = Some("clipboard unavailable".to_string());
            }
        }
    }

    // ── Chat rendering ────────────────────────────────────────────────────────

    fn rebuild_chat(&mut self) {
        let mut entries = self.transcript.clone();
        if let Some((text, at)) = &self.pending_user {
            entries.push(TranscriptEntry::User { text: text.clone(), at: *at });
        }
        if !self.streaming.is_empty() {
            entries.push(TranscriptEntry::Assistant {
                segments: vec![ReplySegment::Text(self.streaming.clone())],
                at: Utc::now(),
            });
        }
        self.chat_lines =
            render_transcript(&entries, self.chat_width, self.ascii, self.timestamps);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    fn max_scroll(&self) -> u16 {
        (self.chat_lines.len() as u16).saturating_sub(self.chat_height)
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    fn scroll_up(&mut self, n: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n.max(1));
    }

    fn scroll_down(&mut self, n: u16) {
        self.scroll_offset = (self.scroll_offset + n.max(1)).min(self.max_scroll());
    }
}

// ── Panel task ────────────────────────────────────────────────────────────────

/// Owns the panel and the editor buffer for the lifetime of the UI.
/// Commands arrive from the UI; deltas and turn results flow back.
async fn panel_task(
    mut panel: ChatPanel,
    mut editor: BufferEditor,
    file: Option<PathBuf>,
    mut cmd_rx: mpsc::Receiver<PanelCommand>,
    event_tx: mpsc::Sender<PanelEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            PanelCommand::Submit(text) => {
                let delta_tx = event_tx.clone();
                let _ = panel
                    .submit(&text, &mut editor, move |d| {
                        // Dropped deltas only degrade the live preview; the
                        // full reply arrives with TurnFinished.
                        let _ = delta_tx.try_send(PanelEvent::Delta(d.to_string()));
                    })
                    .await;
                let finished = PanelEvent::TurnFinished {
                    transcript: panel.transcript().to_vec(),
                    selection_held: panel.has_held_selection(),
                };
                if event_tx.send(finished).await.is_err() {
                    return;
                }
            }
            PanelCommand::Insert(code) => {
                match panel.insert_code(&mut editor, &code).await {
                    Ok(target) => {
                        if let Some(path) = &file {
                            if let Err(e) = tokio::fs::write(path, editor.text()).await {
                                warn!(error = %e, path = %path.display(), "could not save edited file");
                            }
                        }
                        let _ = event_tx
                            .send(PanelEvent::Inserted {
                                target,
                                selection_held: panel.has_held_selection(),
                            })
                            .await;
                    }
                    Err(e) => {
                        error!(error = %e, "insert into editor failed");
                        let _ = event_tx.send(PanelEvent::InsertFailed).await;
                    }
                }
            }
        }
    }
}

// ── Input buffer editing ──────────────────────────────────────────────────────

fn prev_char_boundary(s: &str, i: usize) -> usize {
    s[..i].char_indices().next_back().map(|(idx, _)| idx).unwrap_or(0)
}

fn next_char_boundary(s: &str, i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    i + s[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(0)
}

fn input_insert(buf: &mut String, cursor: &mut usize, c: char) {
    buf.insert(*cursor, c);
    *cursor += c.len_utf8();
}

fn input_backspace(buf: &mut String, cursor: &mut usize) {
    if *cursor > 0 {
        let prev = prev_char_boundary(buf, *cursor);
        buf.remove(prev);
        *cursor = prev;
    }
}

fn input_delete(buf: &mut String, cursor: &mut usize) {
    if *cursor < buf.len() {
        buf.remove(*cursor);
    }
}

// ─── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_advances_cursor_by_utf8_len() {
        let mut buf = String::new();
        let mut cur = 0;
        input_insert(&mut buf, &mut cur, 'h');
        input_insert(&mut buf, &mut cur, 'é');
        assert_eq!(buf, "hé");
        assert_eq!(cur, buf.len());
    }

    #[test]
    fn backspace_removes_previous_char() {
        let mut buf = String::from("hé");
        let mut cur = buf.len();
        input_backspace(&mut buf, &mut cur);
        assert_eq!(buf, "h");
        assert_eq!(cur, 1);
        input_backspace(&mut buf, &mut cur);
        assert_eq!(buf, "");
        assert_eq!(cur, 0);
        // No-op at the start.
        input_backspace(&mut buf, &mut cur);
        assert_eq!(cur, 0);
    }

    #[test]
    fn delete_removes_char_under_cursor() {
        let mut buf = String::from("abc");
        let mut cur = 1;
        input_delete(&mut buf, &mut cur);
        assert_eq!(buf, "ac");
        assert_eq!(cur, 1);
    }

    #[test]
    fn boundaries_step_whole_chars() {
        let s = "aé b";
        let end = s.len();
        let back = prev_char_boundary(s, end);
        assert_eq!(&s[back..], "b");
        assert_eq!(next_char_boundary(s, 1), 3, "é is two bytes");
        assert_eq!(next_char_boundary(s, end), end);
    }
}
