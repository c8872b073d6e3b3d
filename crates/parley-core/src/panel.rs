// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! `ChatPanel`: the submit → request → segment turn loop.
//!
//! One panel owns one conversation, one backend, and the held-selection
//! state.  All mutation happens from the single UI task driving it; requests
//! are serialised by the in-flight flag, never by locks.

use std::sync::Arc;

use anyhow::bail;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parley_config::PanelConfig;
use parley_model::{ChatBackend, CompletionRequest, Message, ResponseEvent};
use tracing::{debug, error, warn};

use crate::conversation::Conversation;
use crate::editor::Editor;
use crate::insert::{insert_code, InsertTarget};
use crate::segment::{segment_reply, ReplySegment};
use crate::selection::HeldSelection;

/// The one user-facing message shown for any failure in the
/// request/response/render sequence.  Kinds are not distinguished; details go
/// to the log.
pub const GENERIC_ERROR_MESSAGE: &str =
    "The assistant could not be reached. Check your connection and try again.";

/// One rendered item in the panel, in display order.
///
/// This is the display transcript, not the wire history: errors appear here
/// but are never replayed to the backend.
#[derive(Debug, Clone)]
pub enum TranscriptEntry {
    User {
        text: String,
        at: DateTime<Utc>,
    },
    Assistant {
        segments: Vec<ReplySegment>,
        at: DateTime<Utc>,
    },
    Error {
        message: String,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Assistant reply appended and segmented.
    Completed,
    /// Request or stream failed; one generic error entry was appended.
    Failed,
    /// Empty input: nothing appended, nothing sent.
    RejectedEmpty,
    /// A request is already in flight; submissions are serialised.
    RejectedBusy,
}

/// Editor context attached to an outgoing user message.
enum EditorContext {
    Selection(String),
    Document(String),
}

pub struct ChatPanel {
    conversation: Conversation,
    backend: Arc<dyn ChatBackend>,
    held: HeldSelection,
    transcript: Vec<TranscriptEntry>,
    in_flight: bool,
    stream: bool,
}

impl ChatPanel {
    pub fn new(backend: Arc<dyn ChatBackend>, panel_cfg: &PanelConfig, stream: bool) -> Self {
        Self {
            conversation: Conversation::new(&panel_cfg.system_prompt, panel_cfg.max_messages),
            backend,
            held: HeldSelection::default(),
            transcript: Vec::new(),
            in_flight: false,
            stream,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// True while a request is in flight and the input control is disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn has_held_selection(&self) -> bool {
        self.held.is_held()
    }

    /// `"{backend}/{model}"` label for the status bar.
    pub fn model_label(&self) -> String {
        format!("{}/{}", self.backend.name(), self.backend.model_name())
    }

    /// Run one turn: append the user message (with editor context), replay
    /// the history to the backend, collect the streamed reply, and append the
    /// segmented assistant entry.  `on_delta` observes text deltas as they
    /// arrive.
    ///
    /// Every completion path — success or failure — clears the in-flight flag
    /// before returning, so the input control is always re-enabled.
    pub async fn submit(
        &mut self,
        input: &str,
        editor: &mut dyn Editor,
        mut on_delta: impl FnMut(&str) + Send,
    ) -> SubmitOutcome {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            debug!("ignoring empty submission");
            return SubmitOutcome::RejectedEmpty;
        }
        if self.in_flight {
            debug!("submission rejected while a request is in flight");
            return SubmitOutcome::RejectedBusy;
        }

        let context = self.capture_context(editor).await;
        self.conversation
            .push(Message::user(compose_user_content(trimmed, context.as_ref())));
        self.transcript.push(TranscriptEntry::User {
            text: trimmed.to_string(),
            at: Utc::now(),
        });

        self.in_flight = true;
        let result = self.run_turn(&mut on_delta).await;
        self.in_flight = false;

        match result {
            Ok(reply) => {
                self.conversation.push(Message::assistant(reply.clone()));
                self.transcript.push(TranscriptEntry::Assistant {
                    segments: segment_reply(&reply),
                    at: Utc::now(),
                });
                SubmitOutcome::Completed
            }
            Err(e) => {
                error!(error = %e, "chat turn failed");
                self.transcript.push(TranscriptEntry::Error {
                    message: GENERIC_ERROR_MESSAGE.to_string(),
                    at: Utc::now(),
                });
                SubmitOutcome::Failed
            }
        }
    }

    /// Insert a code segment into the editor, consuming the held selection if
    /// one exists.
    pub async fn insert_code(
        &mut self,
        editor: &mut dyn Editor,
        code: &str,
    ) -> anyhow::Result<InsertTarget> {
        insert_code(editor, &mut self.held, code).await
    }

    /// Snapshot the editor at submit time: a non-empty selection is captured
    /// as the held insert target and attached as context; otherwise the whole
    /// document is attached (when it has any content).
    async fn capture_context(&mut self, editor: &mut dyn Editor) -> Option<EditorContext> {
        let live = match editor.selection().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not read editor selection");
                None
            }
        };

        if let Some(range) = live.filter(|r| !r.is_empty()) {
            self.held.capture(range);
            match editor.text_in_range(range).await {
                Ok(text) if !text.trim().is_empty() => return Some(EditorContext::Selection(text)),
                Ok(_) => return None,
                Err(e) => {
                    warn!(error = %e, "could not read selected text");
                    return None;
                }
            }
        }

        match editor.document_text().await {
            Ok(text) if !text.trim().is_empty() => Some(EditorContext::Document(text)),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "could not read editor document");
                None
            }
        }
    }

    async fn run_turn(&mut self, on_delta: &mut (impl FnMut(&str) + Send)) -> anyhow::Result<String> {
        let req = CompletionRequest {
            messages: self.conversation.request_messages(),
            stream: self.stream,
        };
        let mut events = self.backend.complete(req).await?;

        let mut reply = String::new();
        while let Some(ev) = events.next().await {
            match ev? {
                ResponseEvent::TextDelta(t) => {
                    on_delta(&t);
                    reply.push_str(&t);
                }
                ResponseEvent::Done => break,
                ResponseEvent::Error(msg) => bail!("backend reported an error: {msg}"),
            }
        }
        Ok(reply)
    }
}

fn compose_user_content(input: &str, context: Option<&EditorContext>) -> String {
    match context {
        None => input.to_string(),
        Some(EditorContext::Selection(code)) => {
            format!("{input}\n\nSelected code:\n```\n{code}\n```")
        }
        Some(EditorContext::Document(code)) => {
            format!("{input}\n\nCurrent file:\n```\n{code}\n```")
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use parley_config::PanelConfig;
    use parley_model::{Role, ScriptedBackend};

    use super::*;
    use crate::editor::BufferEditor;
    use crate::selection::{Position, Range};

    fn panel(backend: ScriptedBackend) -> ChatPanel {
        ChatPanel::new(Arc::new(backend), &PanelConfig::default(), true)
    }

    fn range(sl: usize, sc: usize, el: usize, ec: usize) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    fn scripts(replies: &[&str]) -> Vec<Vec<ResponseEvent>> {
        replies
            .iter()
            .map(|r| vec![ResponseEvent::TextDelta(r.to_string()), ResponseEvent::Done])
            .collect()
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_side_effects() {
        let mut p = panel(ScriptedBackend::always_text("unused"));
        let mut ed = BufferEditor::default();
        let outcome = p.submit("   \n ", &mut ed, |_| {}).await;
        assert_eq!(outcome, SubmitOutcome::RejectedEmpty);
        assert_eq!(p.conversation().len(), 1, "only the system message");
        assert!(p.transcript().is_empty());
    }

    #[tokio::test]
    async fn successful_turn_appends_user_and_assistant() {
        let mut p = panel(ScriptedBackend::always_text("hello back"));
        let mut ed = BufferEditor::default();
        let outcome = p.submit("hello", &mut ed, |_| {}).await;
        assert_eq!(outcome, SubmitOutcome::Completed);
        assert_eq!(p.conversation().len(), 3);
        assert_eq!(p.conversation().messages()[2].as_text(), Some("hello back"));
        assert_eq!(p.transcript().len(), 2);
    }

    #[tokio::test]
    async fn n_submissions_give_two_n_plus_one_history() {
        let backend = ScriptedBackend::new(scripts(&["r0", "r1", "r2"]));
        let mut p = panel(backend);
        let mut ed = BufferEditor::default();
        for i in 0..3 {
            let out = p.submit(&format!("msg {i}"), &mut ed, |_| {}).await;
            assert_eq!(out, SubmitOutcome::Completed);
        }
        assert_eq!(p.conversation().len(), 7);
        let roles: Vec<Role> = p.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn deltas_are_observed_in_order() {
        let backend = ScriptedBackend::new(vec![vec![
            ResponseEvent::TextDelta("one ".into()),
            ResponseEvent::TextDelta("two".into()),
            ResponseEvent::Done,
        ]]);
        let mut p = panel(backend);
        let mut ed = BufferEditor::default();
        let mut seen = String::new();
        p.submit("go", &mut ed, |d| seen.push_str(d)).await;
        assert_eq!(seen, "one two");
        assert_eq!(p.conversation().messages()[2].as_text(), Some("one two"));
    }

    #[tokio::test]
    async fn assistant_reply_is_segmented() {
        let backend =
            ScriptedBackend::always_text("Fix this:\n```js\nconsole.log(1)\n```\nDone.");
        let mut p = panel(backend);
        let mut ed = BufferEditor::default();
        p.submit("fix", &mut ed, |_| {}).await;
        match &p.transcript()[1] {
            TranscriptEntry::Assistant { segments, .. } => {
                assert_eq!(segments.len(), 3);
                assert!(matches!(
                    &segments[1],
                    ReplySegment::Code { language, code }
                        if language == "js" && code == "console.log(1)"
                ));
            }
            other => panic!("expected assistant entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_appends_one_generic_error_and_reenables_input() {
        let mut p = panel(ScriptedBackend::always_failing());
        let mut ed = BufferEditor::default();
        let outcome = p.submit("hi", &mut ed, |_| {}).await;
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert!(!p.is_busy(), "input must be re-enabled after a failure");
        let errors: Vec<_> = p
            .transcript()
            .iter()
            .filter(|e| matches!(e, TranscriptEntry::Error { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        match errors[0] {
            TranscriptEntry::Error { message, .. } => {
                assert_eq!(message, GENERIC_ERROR_MESSAGE)
            }
            _ => unreachable!(),
        }
        // The user message stays in the wire history.
        assert_eq!(p.conversation().len(), 2);
    }

    #[tokio::test]
    async fn mid_stream_error_event_fails_the_turn() {
        let backend = ScriptedBackend::new(vec![vec![
            ResponseEvent::TextDelta("partial".into()),
            ResponseEvent::Error("rate limited".into()),
        ]]);
        let mut p = panel(backend);
        let mut ed = BufferEditor::default();
        let outcome = p.submit("hi", &mut ed, |_| {}).await;
        assert_eq!(outcome, SubmitOutcome::Failed);
        assert!(!p.is_busy());
    }

    #[tokio::test]
    async fn selection_context_is_attached_and_held() {
        let backend = ScriptedBackend::always_text("ok");
        let last_request = backend.last_request.clone();
        let mut p = panel(backend);
        let mut ed = BufferEditor::from_text("fn broken() {}\nfn fine() {}");
        ed.select(range(0, 0, 0, 14));

        p.submit("what is wrong here?", &mut ed, |_| {}).await;

        let req = last_request.lock().unwrap();
        let sent = req.as_ref().unwrap().messages.last().unwrap().flattened_text();
        assert!(sent.contains("what is wrong here?"));
        assert!(sent.contains("Selected code:"));
        assert!(sent.contains("fn broken() {}"));
        assert!(!sent.contains("fn fine()"), "only the selection is attached");
        drop(req);

        assert!(p.has_held_selection());
    }

    #[tokio::test]
    async fn document_context_attached_when_no_selection() {
        let backend = ScriptedBackend::always_text("ok");
        let last_request = backend.last_request.clone();
        let mut p = panel(backend);
        let mut ed = BufferEditor::from_text("whole file body");

        p.submit("review", &mut ed, |_| {}).await;

        let req = last_request.lock().unwrap();
        let sent = req.as_ref().unwrap().messages.last().unwrap().flattened_text();
        assert!(sent.contains("Current file:"));
        assert!(sent.contains("whole file body"));
        drop(req);
        assert!(!p.has_held_selection());
    }

    #[tokio::test]
    async fn empty_document_attaches_no_context() {
        let backend = ScriptedBackend::always_text("ok");
        let last_request = backend.last_request.clone();
        let mut p = panel(backend);
        let mut ed = BufferEditor::default();

        p.submit("hello", &mut ed, |_| {}).await;

        let req = last_request.lock().unwrap();
        let sent = req.as_ref().unwrap().messages.last().unwrap().flattened_text();
        assert_eq!(sent, "hello");
    }

    #[tokio::test]
    async fn insert_targets_captured_range_despite_cursor_movement() {
        let backend = ScriptedBackend::always_text("```rust\nfn fixed() {}\n```");
        let mut p = panel(backend);
        let mut ed = BufferEditor::from_text("fn broken() {}\nfn fine() {}");
        ed.select(range(0, 0, 0, 14));

        p.submit("fix it", &mut ed, |_| {}).await;

        // Cursor moved somewhere else after the submit.
        ed.select(range(1, 0, 1, 0));
        let target = p.insert_code(&mut ed, "fn fixed() {}").await.unwrap();
        assert_eq!(target, InsertTarget::HeldSelection);
        assert_eq!(ed.text(), "fn fixed() {}\nfn fine() {}");
    }

    #[tokio::test]
    async fn transcript_shows_typed_text_not_context_blob() {
        let mut p = panel(ScriptedBackend::always_text("ok"));
        let mut ed = BufferEditor::from_text("some file content");
        p.submit("  question  ", &mut ed, |_| {}).await;
        match &p.transcript()[0] {
            TranscriptEntry::User { text, .. } => assert_eq!(text, "question"),
            other => panic!("expected user entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn window_is_applied_to_outbound_request_only() {
        let backend = ScriptedBackend::new(scripts(&["a", "b", "c", "d"]));
        let last_request = backend.last_request.clone();
        let cfg = PanelConfig { max_messages: 4, ..PanelConfig::default() };
        let mut p = ChatPanel::new(Arc::new(backend), &cfg, true);
        let mut ed = BufferEditor::default();

        for i in 0..4 {
            p.submit(&format!("q{i}"), &mut ed, |_| {}).await;
        }

        // Full history: system + 4 pairs.
        assert_eq!(p.conversation().len(), 9);
        // Last request saw the windowed view: system + 3 most recent at the
        // time of sending (history was 7 long then, plus the new user msg).
        let req = last_request.lock().unwrap();
        assert_eq!(req.as_ref().unwrap().messages.len(), 4);
        assert_eq!(req.as_ref().unwrap().messages[0].role, Role::System);
    }
}
