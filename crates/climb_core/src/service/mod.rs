//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep transport/UI layers decoupled from storage details.
//!
//! # Invariants
//! - Drift detection is pure; only the reconciler mutates state.

pub mod drift;
pub mod reconcile;
pub mod seed;
