//! Core types and trait definitions for the PCR workflow engine.
//!
//! PCR — performance commitment & review. This crate holds the domain
//! model, the `ReviewStore` abstraction, and the pure decision
//! components (authorization guard, line-item reconciler, rating
//! aggregator). It is deliberately free of HTTP and database
//! dependencies; all other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod error;
pub mod form;
pub mod guard;
pub mod hooks;
pub mod item;
pub mod rating;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
