//! Session state for one conversation.
//!
//! A session holds the identifiers the remote API hands back during setup
//! (assistant, thread) plus the files uploaded so far. It lives for the
//! duration of one conversation and is never persisted.

use serde::{Deserialize, Serialize};

/// A file uploaded to the remote API, referenced by id when posting messages
/// or creating an assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFileRef {
    /// Remote file identifier (opaque)
    pub file_id: String,
    /// Original filename, for display
    pub display_name: String,
}

/// State for a single conversation with one assistant.
///
/// Created empty, filled in during setup (assistant then thread), and reset
/// to empty when the user starts over. The uploaded-file list is append-only
/// except on a full reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier of the active assistant, once created
    pub assistant_id: Option<String>,
    /// Display name of the active assistant
    pub assistant_name: Option<String>,
    /// Identifier of the active conversation thread, once created
    pub thread_id: Option<String>,
    /// Files uploaded during this session, in upload order
    pub uploaded_files: Vec<UploadedFileRef>,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all fields, ready for a fresh setup.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Appends an uploaded-file reference, preserving upload order.
    pub fn record_uploaded_file(&mut self, file: UploadedFileRef) {
        self.uploaded_files.push(file);
    }

    /// True iff both the assistant and the thread have been created,
    /// which is the precondition for running a conversational turn.
    pub fn is_ready(&self) -> bool {
        self.assistant_id.is_some() && self.thread_id.is_some()
    }

    /// The ids of all uploaded files, in upload order.
    pub fn file_ids(&self) -> Vec<String> {
        self.uploaded_files
            .iter()
            .map(|f| f.file_id.clone())
            .collect()
    }
}
