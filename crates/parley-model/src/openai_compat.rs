// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Chat-completion driver for OpenAI-compatible APIs.
//!
//! Hosted providers, aggregators, and local servers all speak the same
//! `/chat/completions` wire format, so one driver covers every configured
//! backend except the mock.  Responses are consumed either as an SSE stream
//! (`stream = true`) or as a single JSON body whose `message.content` may be
//! a plain string or a list of typed text parts.

use anyhow::{bail, Context};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    backend::ResponseStream, CompletionRequest, MessageContent, ResponseEvent, Role,
};

/// How to send the API key in HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>` — hosted providers.
    Bearer,
    /// No authentication header — local servers (Ollama, vLLM, LM Studio).
    None,
}

pub struct OpenAiCompatBackend {
    /// Backend id returned by `ChatBackend::name()`.
    driver_name: &'static str,
    /// Model id forwarded to the API.
    model: String,
    /// API key (pre-resolved from config or env).
    api_key: Option<String>,
    /// Full chat completions URL, e.g. `https://api.openai.com/v1/chat/completions`.
    chat_url: String,
    max_tokens: u32,
    temperature: f32,
    auth_style: AuthStyle,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// `base_url` is the API base that ends **before** `/chat/completions`,
    /// e.g. `https://api.openai.com/v1`.
    pub fn new(
        driver_name: &'static str,
        model: String,
        api_key: Option<String>,
        base_url: &str,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        auth_style: AuthStyle,
    ) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            driver_name,
            model,
            api_key,
            chat_url: format!("{base}/chat/completions"),
            max_tokens: max_tokens.unwrap_or(1024),
            temperature: temperature.unwrap_or(0.2),
            auth_style,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl crate::ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        self.driver_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<ResponseStream> {
        let messages = build_wire_messages(&req);

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": req.stream,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if req.stream {
            body["stream_options"] = json!({ "include_usage": false });
        }

        debug!(
            driver = %self.driver_name,
            model = %self.model,
            message_count = req.messages.len(),
            stream = req.stream,
            "sending completion request"
        );

        let mut http_req = self.client.post(&self.chat_url).json(&body);
        http_req = match self.auth_style {
            AuthStyle::Bearer => {
                let key = self.api_key.as_deref()
                    .context("API key not set; provide api_key or api_key_env in config")?;
                http_req.bearer_auth(key)
            }
            AuthStyle::None => http_req,
        };

        let resp = http_req.send().await
            .with_context(|| format!("{} request failed", self.driver_name))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("{} error {status}: {text}", self.driver_name);
        }

        if !req.stream {
            let body: Value = resp.json().await
                .with_context(|| format!("{} response was not JSON", self.driver_name))?;
            let text = extract_message_text(&body)
                .with_context(|| format!("{} response had no message content", self.driver_name))?;
            let events = vec![Ok(ResponseEvent::TextDelta(text)), Ok(ResponseEvent::Done)];
            return Ok(Box::pin(futures::stream::iter(events)));
        }

        let byte_stream = resp.bytes_stream();
        // SSE events can be split across multiple TCP packets.  Maintain a
        // line buffer across chunks; emit events only for complete lines.
        let event_stream = byte_stream
            .scan(String::new(), |buf, chunk| {
                let events: Vec<anyhow::Result<ResponseEvent>> = match chunk {
                    Ok(b) => {
                        buf.push_str(&String::from_utf8_lossy(&b));
                        drain_complete_sse_lines(buf)
                    }
                    Err(e) => vec![Err(anyhow::anyhow!(e))],
                };
                std::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

fn role_str(r: Role) -> &'static str {
    match r {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Convert the request messages into the OpenAI wire-format JSON array.
///
/// Extracted as a free function so it can be unit-tested without making HTTP
/// requests.
pub(crate) fn build_wire_messages(req: &CompletionRequest) -> Vec<Value> {
    req.messages
        .iter()
        .map(|m| {
            let content: Value = match &m.content {
                MessageContent::Text(t) => json!(t),
                MessageContent::Parts(parts) => {
                    let arr: Vec<Value> = parts
                        .iter()
                        .map(|p| {
                            let crate::ContentPart::Text { text } = p;
                            json!({ "type": "text", "text": text })
                        })
                        .collect();
                    json!(arr)
                }
            };
            json!({ "role": role_str(m.role), "content": content })
        })
        .collect()
}

/// Pull the assistant text out of a non-streaming response body.
///
/// `choices[0].message.content` is either a plain string or an array of
/// `{type: "text", text: …}` parts; both shapes collapse to one string.
pub(crate) fn extract_message_text(body: &Value) -> Option<String> {
    let content = &body["choices"][0]["message"]["content"];
    if let Some(s) = content.as_str() {
        return Some(s.to_string());
    }
    let parts = content.as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect();
    if texts.is_empty() {
        return None;
    }
    Some(texts.join("\n"))
}

/// Drain all complete `\n`-terminated SSE lines from `buf`.
///
/// Any trailing incomplete line is left in `buf` so it can be extended by the
/// next TCP chunk.
pub(crate) fn drain_complete_sse_lines(buf: &mut String) -> Vec<anyhow::Result<ResponseEvent>> {
    let mut events = Vec::new();
    while let Some(nl_pos) = buf.find('\n') {
        // Strip the optional Windows-style \r before \n.
        let line = buf[..nl_pos].trim_end_matches('\r').to_string();
        *buf = buf[nl_pos + 1..].to_string();
        if let Some(ev) = parse_sse_data_line(&line) {
            events.push(ev);
        }
    }
    events
}

/// Parse a single complete SSE `data:` line into a [`ResponseEvent`].
///
/// Returns `None` for empty lines, comment lines, or unparseable data.
fn parse_sse_data_line(line: &str) -> Option<anyhow::Result<ResponseEvent>> {
    let data = line.strip_prefix("data: ")?.trim();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(Ok(ResponseEvent::Done));
    }
    let v: Value = serde_json::from_str(data).ok()?;
    parse_sse_chunk(&v)
}

fn parse_sse_chunk(v: &Value) -> Option<anyhow::Result<ResponseEvent>> {
    // Mid-stream error object from the API (OpenRouter sends these inline).
    if let Some(err) = v.get("error") {
        let msg = err["message"].as_str().unwrap_or("upstream error").to_string();
        return Some(Ok(ResponseEvent::Error(msg)));
    }

    let delta = &v["choices"][0]["delta"];
    let text = delta.get("content").and_then(|c| c.as_str())?;
    if text.is_empty() {
        return None;
    }
    Some(Ok(ResponseEvent::TextDelta(text.to_string())))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;

    // ── Wire-format construction ─────────────────────────────────────────────

    #[test]
    fn wire_messages_preserve_order_and_roles() {
        let req = CompletionRequest {
            messages: vec![
                Message::system("sys"),
                Message::user("hi"),
                Message::assistant("hello"),
            ],
            stream: true,
        };
        let wire = build_wire_messages(&req);
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["content"], "hi");
        assert_eq!(wire[2]["role"], "assistant");
    }

    #[test]
    fn wire_messages_serialise_parts_as_array() {
        let req = CompletionRequest {
            messages: vec![Message {
                role: crate::Role::User,
                content: MessageContent::Parts(vec![crate::ContentPart::text("a")]),
            }],
            stream: false,
        };
        let wire = build_wire_messages(&req);
        assert!(wire[0]["content"].is_array());
        assert_eq!(wire[0]["content"][0]["text"], "a");
    }

    // ── Non-streaming body extraction ────────────────────────────────────────

    #[test]
    fn extract_text_from_string_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "reply" } }]
        });
        assert_eq!(extract_message_text(&body).as_deref(), Some("reply"));
    }

    #[test]
    fn extract_text_from_part_list_content() {
        let body = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "one" },
                { "type": "text", "text": "two" },
            ] } }]
        });
        assert_eq!(extract_message_text(&body).as_deref(), Some("one\ntwo"));
    }

    #[test]
    fn extract_text_none_when_content_missing() {
        let body = json!({ "choices": [{}] });
        assert!(extract_message_text(&body).is_none());
    }

    // ── SSE line handling ────────────────────────────────────────────────────

    fn drain_all(input: &str) -> Vec<ResponseEvent> {
        let mut buf = input.to_string();
        drain_complete_sse_lines(&mut buf)
            .into_iter()
            .map(|e| e.unwrap())
            .collect()
    }

    #[test]
    fn sse_delta_line_becomes_text_event() {
        let events = drain_all(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ResponseEvent::TextDelta(t) if t == "Hel"));
    }

    #[test]
    fn sse_done_sentinel_becomes_done_event() {
        let events = drain_all("data: [DONE]\n");
        assert!(matches!(events[0], ResponseEvent::Done));
    }

    #[test]
    fn sse_incomplete_line_stays_buffered() {
        let mut buf = "data: {\"choices\":[{\"delta\":{\"co".to_string();
        let events = drain_complete_sse_lines(&mut buf);
        assert!(events.is_empty());
        assert!(!buf.is_empty(), "partial line must remain in the buffer");

        buf.push_str("ntent\":\"x\"}}]}\n");
        let events = drain_complete_sse_lines(&mut buf);
        assert_eq!(events.len(), 1);
        assert!(buf.is_empty());
    }

    #[test]
    fn sse_crlf_lines_are_handled() {
        let events = drain_all("data: [DONE]\r\n");
        assert!(matches!(events[0], ResponseEvent::Done));
    }

    #[test]
    fn sse_empty_delta_produces_no_event() {
        let events = drain_all(
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n",
        );
        assert!(events.is_empty());
    }

    #[test]
    fn sse_inline_error_object_becomes_error_event() {
        let events = drain_all(
            "data: {\"error\":{\"message\":\"rate limited\"}}\n",
        );
        assert!(matches!(&events[0], ResponseEvent::Error(m) if m == "rate limited"));
    }
}
