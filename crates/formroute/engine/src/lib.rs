//! FormRoute Engine - condition evaluation and submission routing
//!
//! This crate drives submissions through their workflows. It decides which
//! stages apply to a given form payload, asks the org layer who must act,
//! and applies decisions as single atomic transitions.
//!
//! # Key Concepts
//!
//! 1. **Condition evaluation**: a pure function over a validated
//!    [`formroute_types::ConditionSet`] and a form payload. No storage, no
//!    clock, no side effects.
//! 2. **Plan before commit**: every transition performs all fallible work
//!    (reads, condition checks, approver resolution) before its first
//!    write, so a failure leaves stored state exactly as it was.
//! 3. **Per-submission serialization**: concurrent decisions on the same
//!    submission are forced through one mutex, so exactly one wins and the
//!    rest observe the decided request.
//!
//! # Design Principles
//!
//! - Storage is a trait ([`RoutingStore`]); the in-memory implementation
//!   here is the reference, not the ceiling.
//! - Completion side effects go through a [`CompletionSink`] and are
//!   fire-and-forget: a failing sink never rolls back a completion.

#![deny(unsafe_code)]

mod engine;
mod evaluator;
mod notify;
mod store;

pub use engine::*;
pub use evaluator::*;
pub use notify::*;
pub use store::*;
