//! Organization hierarchy resolution for FormRoute
//!
//! This crate answers the two organizational questions approval routing
//! asks, and nothing else:
//!
//! - Where does a position sit? ([`HierarchyResolver::ancestor_chain`]
//!   walks the reporting tree upward, cycle-safe.)
//! - Who must approve this stage for this submitter?
//!   ([`ApproverRouter::resolve_approver`] scans the submitter's chain for
//!   the nearest ancestor carrying the required role, then picks a
//!   deterministic occupant.)
//!
//! # Design Principles
//!
//! 1. Read-only. Nothing here mutates org data; all access goes through
//!    the [`OrgDirectory`] trait so a durable store can execute the same
//!    queries server-side.
//! 2. The hierarchy graph is externally editable, so traversal never
//!    trusts acyclicity: an explicit visited set and a depth cutoff turn a
//!    corrupted graph into a configuration error instead of a hang.
//! 3. Every tie-break is a documented policy, not incidental iteration
//!    order.

#![deny(unsafe_code)]

mod directory;
mod resolver;
mod router;

pub use directory::*;
pub use resolver::*;
pub use router::*;
