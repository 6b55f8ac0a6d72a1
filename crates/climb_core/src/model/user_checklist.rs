//! Per-user checklist copy domain model.
//!
//! # Responsibility
//! - Define the user-owned copy of a template and its completion state.
//! - Keep each copy item linked to the template item it was cloned from.
//!
//! # Invariants
//! - At most one `UserChecklist` exists per `(user_id, template_id)`.
//! - Every item references exactly one template item of the bound template.
//! - `is_complete` on the checklist is true only while every item is complete.

use crate::model::template::{ChecklistTemplateItem, TemplateId, TemplateItemId};
use serde::{Deserialize, Serialize};

/// Stable row id of a user checklist.
pub type UserChecklistId = i64;

/// Stable row id of a user checklist item.
pub type UserChecklistItemId = i64;

/// User identity resolved by the hosting application's session layer.
pub type UserId = i64;

/// A user's personal copy of one checklist template version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChecklist {
    /// Stable row id.
    pub id: UserChecklistId,
    /// Owning user.
    pub user_id: UserId,
    /// Template row this copy was cloned from.
    pub template_id: TemplateId,
    /// Roll-up flag: every item of this checklist is complete.
    pub is_complete: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// One entry of a user checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChecklistItem {
    /// Stable row id.
    pub id: UserChecklistItemId,
    /// Owning user checklist.
    pub user_checklist_id: UserChecklistId,
    /// Template item this entry was cloned from.
    pub template_item_id: TemplateItemId,
    /// Owning user. Denormalized for ownership checks on toggle.
    pub user_id: UserId,
    /// Completion flag toggled by the user.
    pub is_complete: bool,
}

/// A user checklist item joined with the template item it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChecklistItemView {
    pub item: UserChecklistItem,
    pub template_item: ChecklistTemplateItem,
}

/// A user checklist with its items, sorted by the referenced template items'
/// `display_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChecklistWithItems {
    pub checklist: UserChecklist,
    pub items: Vec<UserChecklistItemView>,
}
