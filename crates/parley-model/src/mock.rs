// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::{backend::ResponseStream, CompletionRequest, ResponseEvent};

/// Deterministic mock backend for tests.  Echoes the last user message
/// back as the assistant response.
#[derive(Default)]
pub struct MockBackend;

#[async_trait]
impl crate::ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::Role::User))
            .map(|m| m.flattened_text())
            .unwrap_or_else(|| "[no input]".to_string());

        let events: Vec<anyhow::Result<ResponseEvent>> = vec![
            Ok(ResponseEvent::TextDelta(format!("MOCK: {reply}"))),
            Ok(ResponseEvent::Done),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// A pre-scripted mock backend.  Each call to `complete` pops the next
/// response script from the front of the queue, letting tests specify exact
/// event sequences without network access.
pub struct ScriptedBackend {
    scripts: Arc<Mutex<Vec<Vec<ResponseEvent>>>>,
    /// The last `CompletionRequest` seen by this backend.
    /// Written on each `complete()` call so tests can inspect what was sent.
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
}

impl ScriptedBackend {
    /// Build a backend from a list of response scripts.  The outer `Vec` is
    /// the ordered list of calls; the inner `Vec` is the event sequence
    /// emitted for that call.
    pub fn new(scripts: Vec<Vec<ResponseEvent>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Convenience: backend that always returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![vec![
            ResponseEvent::TextDelta(reply.into()),
            ResponseEvent::Done,
        ]])
    }

    /// Convenience: backend whose first call fails at the transport level.
    pub fn always_failing() -> Self {
        Self::new(vec![vec![]])
    }
}

#[async_trait]
impl crate::ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted-mock"
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        *self.last_request.lock().unwrap() = Some(req);
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                // Default fallback when all scripts are consumed
                vec![
                    ResponseEvent::TextDelta("[no more scripts]".into()),
                    ResponseEvent::Done,
                ]
            } else {
                scripts.remove(0)
            }
        };
        if events.is_empty() {
            anyhow::bail!("scripted transport failure");
        }
        let wrapped: Vec<anyhow::Result<ResponseEvent>> = events.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(wrapped)))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::{ChatBackend, Message};

    fn simple_req() -> CompletionRequest {
        CompletionRequest {
            messages: vec![Message::user("hi")],
            stream: true,
        }
    }

    #[tokio::test]
    async fn mock_echoes_last_user_message() {
        let b = MockBackend;
        let mut stream = b.complete(simple_req()).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        match first {
            ResponseEvent::TextDelta(t) => assert!(t.contains("MOCK: hi")),
            other => panic!("unexpected first event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_ends_with_done() {
        let b = MockBackend;
        let mut stream = b.complete(simple_req()).await.unwrap();
        let mut events = Vec::new();
        while let Some(ev) = stream.next().await {
            events.push(ev.unwrap());
        }
        assert!(matches!(events.last(), Some(ResponseEvent::Done)));
    }

    #[tokio::test]
    async fn scripted_single_text_reply() {
        let b = ScriptedBackend::always_text("hello world");
        let mut stream = b.complete(simple_req()).await.unwrap();
        let ev = stream.next().await.unwrap().unwrap();
        assert!(matches!(ev, ResponseEvent::TextDelta(t) if t == "hello world"));
    }

    #[tokio::test]
    async fn scripted_records_last_request() {
        let b = ScriptedBackend::always_text("ok");
        let _ = b.complete(simple_req()).await.unwrap();
        let seen = b.last_request.lock().unwrap();
        assert_eq!(seen.as_ref().unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn scripted_failure_returns_err_from_complete() {
        let b = ScriptedBackend::always_failing();
        assert!(b.complete(simple_req()).await.is_err());
    }

    #[tokio::test]
    async fn scripted_fallback_when_scripts_exhausted() {
        let b = ScriptedBackend::new(vec![]);
        let mut stream = b.complete(simple_req()).await.unwrap();
        let ev = stream.next().await.unwrap().unwrap();
        assert!(matches!(ev, ResponseEvent::TextDelta(t) if t.contains("no more scripts")));
    }
}
