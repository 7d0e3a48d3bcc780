//! Completion notifications
//!
//! When a submission completes, downstream systems (the original form
//! application, document generation, webhooks) may want to know. The engine
//! reports completions through a [`CompletionSink`]; delivery is
//! best-effort and a sink failure is logged, never propagated, because the
//! completion itself has already been committed.

use chrono::{DateTime, Utc};
use formroute_types::{AuditEntry, PersonId, SubmissionId, TemplateId};
use serde_json::Value;
use std::sync::Mutex;

/// A sink rejected or failed to deliver a notice.
#[derive(Debug, thiserror::Error)]
#[error("completion notification failed: {0}")]
pub struct NotifyError(pub String);

/// What a completed submission looks like to the outside: enough to render
/// a final document without another round-trip to the engine.
#[derive(Clone, Debug)]
pub struct CompletionNotice {
    pub submission_id: SubmissionId,
    pub template_id: TemplateId,
    pub submitter: PersonId,
    /// The form payload as finally approved
    pub form_data: Value,
    /// The full audit timeline of the submission, oldest entry first
    pub timeline: Vec<AuditEntry>,
    pub completed_at: DateTime<Utc>,
}

/// Receives completion notices from the engine.
pub trait CompletionSink: Send + Sync {
    fn submission_completed(&self, notice: &CompletionNotice) -> Result<(), NotifyError>;
}

/// Discards every notice. The default sink.
pub struct NullSink;

impl CompletionSink for NullSink {
    fn submission_completed(&self, _notice: &CompletionNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Buffers notices for inspection. Test double, also handy for batching.
#[derive(Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<CompletionNotice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain every notice received so far
    pub fn take(&self) -> Vec<CompletionNotice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(_) => Vec::new(),
        }
    }
}

impl CompletionSink for RecordingSink {
    fn submission_completed(&self, notice: &CompletionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .map_err(|_| NotifyError("recording sink lock poisoned".into()))?
            .push(notice.clone());
        Ok(())
    }
}
