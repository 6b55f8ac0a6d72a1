//! Domain model for checklist templates and per-user checklist copies.
//!
//! # Responsibility
//! - Define the canonical data structures used by core business logic.
//! - Keep template rows and user copies as distinct aggregates with stable
//!   integer identities.
//!
//! # Invariants
//! - Template rows are immutable once superseded by a newer version.
//! - A user checklist always references exactly one template row.

pub mod definition;
pub mod template;
pub mod user_checklist;
