// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod conversation;
mod editor;
mod insert;
mod panel;
mod segment;
mod selection;

pub use conversation::Conversation;
pub use editor::{BufferEditor, Editor};
pub use insert::{insert_code, InsertTarget};
pub use panel::{ChatPanel, SubmitOutcome, TranscriptEntry, GENERIC_ERROR_MESSAGE};
pub use segment::{segment_reply, ReplySegment, DEFAULT_LANGUAGE};
pub use selection::{HeldSelection, Position, Range};
