//! Checklist template domain model.
//!
//! # Responsibility
//! - Define the canonical, versioned checklist definition shared by all users.
//! - Provide version ordering helpers for "latest wins" resolution.
//!
//! # Invariants
//! - `(name, version)` identifies exactly one template row.
//! - `version` is an ISO-timestamp string, so lexicographic order equals
//!   chronological order.
//! - `items` are ordered by `display_index` and unique by `display_text`
//!   within one template.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stable row id of a checklist template.
pub type TemplateId = i64;

/// Stable row id of a checklist template item.
pub type TemplateItemId = i64;

/// Canonical, versioned checklist definition shared by all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    /// Stable row id.
    pub id: TemplateId,
    /// Template family name. All versions of one checklist share it.
    pub name: String,
    /// ISO-timestamp version string; newer versions sort higher.
    pub version: String,
    /// Whether the checklist is gated behind a paid plan.
    pub is_premium: bool,
    /// Optional stable URL fragment used by the hosting application.
    pub pretty_route: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// One entry of a checklist template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplateItem {
    /// Stable row id.
    pub id: TemplateItemId,
    /// Owning template row.
    pub template_id: TemplateId,
    /// User-facing text. Unique within one template; also the cross-version
    /// identity used by drift detection.
    pub display_text: String,
    /// Longer explanation shown on demand. Empty when absent.
    pub detail_text: String,
    /// Whether the item counts toward required progress.
    pub is_required: bool,
    /// Label of the optional outbound link. Empty when absent.
    pub link_text: String,
    /// Target of the optional outbound link. Empty when absent.
    pub link_uri: String,
    /// Position within the template. Clone order must preserve it.
    pub display_index: i64,
}

/// A template row together with its items, sorted by `display_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateWithItems {
    pub template: ChecklistTemplate,
    pub items: Vec<ChecklistTemplateItem>,
}

/// Compares two version strings in template order.
///
/// Versions are ISO-timestamp strings, so plain byte comparison is the
/// chronological comparison. Kept as a named helper so call sites state
/// intent instead of comparing raw strings.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    left.cmp(right)
}

/// Returns whether `candidate` is strictly newer than `current`.
pub fn is_newer_version(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Ordering::Greater
}
