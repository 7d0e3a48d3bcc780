//! Domain Types for FormRoute
//!
//! FormRoute routes a submitted form through a variable-length chain of
//! human approvals. The chain's length, the approver role required at each
//! step, and whether a step applies at all are decided dynamically from the
//! organization hierarchy and from predicate logic over the submitted data.
//!
//! # Key Concepts
//!
//! - **Position**: a node in the reporting tree, carrying a [`RoleTag`]
//!   (MANAGER, HOD, ...) and a weak reference to its parent.
//! - **Assignment**: the person-to-position edge; a person may hold several
//!   positions and the resolver picks a documented primary one.
//! - **Workflow**: an ordered template of [`Stage`]s bound to exactly one
//!   form template. A template without a workflow cannot be submitted.
//! - **ConditionSet**: the declarative predicate attached to a stage,
//!   validated at authoring time so unknown operators never reach routing.
//! - **Submission**: one form instance moving through the workflow.
//! - **ApprovalRequest**: one person's pending or decided action on one
//!   stage. At most one request per submission is PENDING at any time.
//! - **AuditEntry**: an append-only record of an accepted state transition.
//!
//! # Design Principles
//!
//! 1. Lifecycle transitions live on the types; orchestration lives in the
//!    engine. A `Submission` knows how to reject itself, not when.
//! 2. Configuration mistakes (unknown operator, duplicate stage order) are
//!    rejected at authoring time, never discovered mid-routing.
//! 3. Errors carry enough identity to be actionable, and classify
//!    themselves into caller / configuration / resolution categories.

#![deny(unsafe_code)]

mod audit;
mod condition;
mod errors;
mod ids;
mod org;
mod submission;
mod workflow;

pub use audit::*;
pub use condition::*;
pub use errors::*;
pub use ids::*;
pub use org::*;
pub use submission::*;
pub use workflow::*;
