// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use anyhow::Result;
use tracing::debug;

use crate::editor::Editor;
use crate::selection::HeldSelection;

/// Where an insert action ended up writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTarget {
    /// The selection captured at submit time.
    HeldSelection,
    /// The editor's live selection at insert time.
    LiveSelection,
    /// No selection anywhere — the whole document was replaced.
    WholeDocument,
}

/// Insert `code` into the editor, replacing exactly one range.
///
/// Target resolution priority: the held selection reference (consumed here,
/// at most once), else the live selection, else the entire document.  This is
/// fire-and-forget: no rollback beyond whatever undo the editor provides.
pub async fn insert_code(
    editor: &mut dyn Editor,
    held: &mut HeldSelection,
    code: &str,
) -> Result<InsertTarget> {
    let (range, target) = if let Some(r) = held.take() {
        (r, InsertTarget::HeldSelection)
    } else if let Some(r) = editor.selection().await? {
        (r, InsertTarget::LiveSelection)
    } else {
        (editor.document_range().await?, InsertTarget::WholeDocument)
    };

    editor.replace_range(range, code).await?;
    debug!(?target, bytes = code.len(), "inserted code into editor");
    Ok(target)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
