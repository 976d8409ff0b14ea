//! The PCR workflow engine.
//!
//! Owns the role-gated state machine for performance-commitment forms
//! and orchestrates guard → mutation → reconciler/aggregator → store
//! for every public operation. All state lives in the
//! [`ReviewStore`](pcr_core::store::ReviewStore); the engine itself
//! holds nothing but a store handle and its side-effect hooks, so each
//! operation is one independent unit of work.
//!
//! Concurrency discipline: every status change goes through the
//! store's conditional write. A write that affects zero rows is
//! reported as [`pcr_core::Error::InvalidState`] — a lost race is a
//! visible failure, never a silent success, and is not retried here.

mod engine;

pub use engine::{FormWithItems, ListFilter, NewFormRequest, WorkflowEngine};
