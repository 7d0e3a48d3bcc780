//! Audit types: the append-only trail of accepted state transitions

use crate::PersonId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag for the entity an audit entry is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Submission,
    Approval,
    System,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Submission => "SUBMISSION",
            Self::Approval => "APPROVAL",
            Self::System => "SYSTEM",
        };
        write!(f, "{}", tag)
    }
}

/// Action tag recorded by the routing engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Submitted,
    DraftSaved,
    Approved,
    Rejected,
    Completed,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::Submitted => "SUBMITTED",
            Self::DraftSaved => "DRAFT_SAVED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        };
        write!(f, "{}", tag)
    }
}

/// One immutable audit record.
///
/// `sequence` is assigned by the ledger at write time and is monotonically
/// increasing across the whole ledger, so a timeline's order stays
/// well-defined even when two entries share a timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub sequence: u64,
    /// Polymorphic subject id (submission, request, ...)
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<PersonId>,
    pub timestamp: DateTime<Utc>,
    /// Structured snapshot of relevant state at the instant of the action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_render_like_the_wire_format() {
        assert_eq!(EntityKind::Submission.to_string(), "SUBMISSION");
        assert_eq!(AuditAction::DraftSaved.to_string(), "DRAFT_SAVED");
        assert_eq!(AuditAction::Completed.to_string(), "COMPLETED");
    }
}
