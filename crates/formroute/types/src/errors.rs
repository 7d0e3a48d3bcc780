//! Error types for the routing core
//!
//! Three categories, kept distinguishable because they demand different
//! treatment:
//! - caller errors: bad or unauthorized requests; nothing was mutated;
//! - configuration errors: administrative misconfiguration (missing
//!   workflow, hierarchy cycle, unknown operator); fatal for the operation;
//! - resolution failures: the org data cannot answer "who approves this?";
//!   the submission stays in its prior state so the operation can be
//!   retried once the organization data is fixed.

use crate::{
    ConditionError, PersonId, PositionId, RequestId, RoleTag, StageId, SubmissionId, TemplateId,
    WorkflowId,
};

/// Errors that can occur in routing operations
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    // ── Caller errors ────────────────────────────────────────────────
    #[error("approval request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("approval request already decided: {0}")]
    RequestAlreadyDecided(RequestId),

    #[error("person {0} is not the assignee of this approval request")]
    NotAuthorized(PersonId),

    #[error("submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    #[error("form template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("form template is not active: {0}")]
    TemplateInactive(TemplateId),

    #[error("submission {0} is in a terminal state")]
    SubmissionTerminal(SubmissionId),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("no workflow configured for template {0}")]
    NoWorkflowConfigured(TemplateId),

    #[error("stage {0} does not belong to the submission's workflow")]
    StageNotInWorkflow(StageId),

    #[error("workflow {workflow} already has a stage with order {order}")]
    DuplicateStageOrder { workflow: WorkflowId, order: u32 },

    #[error("another workflow is already bound to template {0}")]
    WorkflowAlreadyBound(TemplateId),

    #[error("cycle detected in the position hierarchy at {0}")]
    HierarchyCycle(PositionId),

    #[error("position hierarchy above {0} exceeds the maximum chain depth")]
    HierarchyTooDeep(PositionId),

    #[error("position not found: {0}")]
    PositionNotFound(PositionId),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error("a pending approval request already exists for submission {0}")]
    PendingRequestExists(SubmissionId),

    #[error("shared state lock poisoned")]
    LockPoisoned,

    // ── Domain resolution failures ───────────────────────────────────
    #[error("submitter {0} has no assigned position")]
    NoPositionAssigned(PersonId),

    #[error("no ancestor with role '{role}' in the submitter's reporting chain")]
    ApproverRoleNotFound { role: RoleTag },

    #[error("position '{title}' matches the required role but has no active occupant")]
    PositionVacant { position: PositionId, title: String },
}

impl RoutingError {
    /// Bad or unauthorized request; report synchronously, nothing mutated
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::RequestNotFound(_)
                | Self::RequestAlreadyDecided(_)
                | Self::NotAuthorized(_)
                | Self::SubmissionNotFound(_)
                | Self::TemplateNotFound(_)
                | Self::TemplateInactive(_)
                | Self::SubmissionTerminal(_)
        )
    }

    /// Administrative misconfiguration; fatal for the operation
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoWorkflowConfigured(_)
                | Self::StageNotInWorkflow(_)
                | Self::DuplicateStageOrder { .. }
                | Self::WorkflowAlreadyBound(_)
                | Self::HierarchyCycle(_)
                | Self::HierarchyTooDeep(_)
                | Self::PositionNotFound(_)
                | Self::Condition(_)
                | Self::PendingRequestExists(_)
                | Self::LockPoisoned
        )
    }

    /// The org data cannot currently resolve an approver; retry after fixing
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::NoPositionAssigned(_)
                | Self::ApproverRoleNotFound { .. }
                | Self::PositionVacant { .. }
        )
    }
}

/// Result type alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
