//! Submission and approval-request lifecycles
//!
//! Submission: `DRAFT -> PENDING -> {PENDING | REJECTED | COMPLETED}`.
//! Rejected and Completed are terminal. A draft performs no routing until
//! it is explicitly resubmitted (resubmission semantics live outside this
//! core).
//!
//! ApprovalRequest: `PENDING -> APPROVED | REJECTED`, decided exactly once.

use crate::{PersonId, RequestId, StageId, SubmissionId, TemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Submission ───────────────────────────────────────────────────────

/// Lifecycle status of a submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Saved without routing; editable by the submitter
    Draft,
    /// Routed and waiting on the current stage's approver
    Pending,
    /// An approver rejected a stage; the workflow terminated
    Rejected,
    /// Every applicable stage approved (or none applied)
    Completed,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

/// One form instance moving through its template's workflow.
///
/// Mutated only by the routing engine; never deleted. Corrections append
/// audit entries instead of overwriting history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub template_id: TemplateId,
    pub submitter: PersonId,
    /// Arbitrary form payload as submitted
    pub form_data: Value,
    pub status: SubmissionStatus,
    /// The stage currently awaiting action, when status is Pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<StageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        template_id: TemplateId,
        submitter: PersonId,
        form_data: Value,
        is_draft: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubmissionId::generate(),
            template_id,
            submitter,
            form_data,
            status: if is_draft {
                SubmissionStatus::Draft
            } else {
                SubmissionStatus::Pending
            },
            current_stage: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Park the submission on a stage, waiting for its approver
    pub fn route_to(&mut self, stage: StageId) {
        self.status = SubmissionStatus::Pending;
        self.current_stage = Some(stage);
        self.updated_at = Utc::now();
    }

    /// Terminal rejection; no further stages are evaluated
    pub fn reject(&mut self) {
        self.status = SubmissionStatus::Rejected;
        self.current_stage = None;
        self.updated_at = Utc::now();
    }

    /// Terminal completion: no remaining stage applies
    pub fn complete(&mut self) {
        self.status = SubmissionStatus::Completed;
        self.current_stage = None;
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ── Approval Request ─────────────────────────────────────────────────

/// Status of an approval request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// The action a caller takes on a pending approval request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Approve,
    Reject,
}

/// One person's pending or decided action on one (submission, stage) pair.
///
/// Exactly one request is ever created per pairing, and once decided only
/// the decision fields have been touched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub submission_id: SubmissionId,
    pub stage_id: StageId,
    /// The person whose decision is awaited
    pub assignee: PersonId,
    pub status: ApprovalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn new(submission_id: SubmissionId, stage_id: StageId, assignee: PersonId) -> Self {
        Self {
            id: RequestId::generate(),
            submission_id,
            stage_id,
            assignee,
            status: ApprovalStatus::Pending,
            comments: None,
            created_at: Utc::now(),
            decided_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub fn approve(&mut self, comments: Option<String>) {
        self.status = ApprovalStatus::Approved;
        self.comments = comments;
        self.decided_at = Some(Utc::now());
    }

    pub fn reject(&mut self, comments: Option<String>) {
        self.status = ApprovalStatus::Rejected;
        self.comments = comments;
        self.decided_at = Some(Utc::now());
    }
}
