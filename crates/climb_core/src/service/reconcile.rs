//! Checklist reconciliation use-case service.
//!
//! # Responsibility
//! - Resolve "give me my checklist" into a well-formed user copy of the
//!   latest template version, cloning or repairing as needed.
//! - Provide explicit clone, completion-toggle, and newer-version probes for
//!   callers that drive prompts.
//!
//! # Invariants
//! - `user_id` is always an explicit argument; the core never reads ambient
//!   session state.
//! - Repair is the only recoverable path; every other failure propagates to
//!   the caller unmodified.
//! - A repair that loses the delete race re-reads instead of cloning a
//!   duplicate.

use crate::model::template::{
    is_newer_version, ChecklistTemplate, TemplateId, TemplateWithItems,
};
use crate::model::user_checklist::{
    UserChecklistItemId, UserChecklistItemView, UserChecklistWithItems, UserId,
};
use crate::repo::template_repo::{TemplateListQuery, TemplateRepoError, TemplateRepository};
use crate::repo::user_checklist_repo::{UserChecklistRepoError, UserChecklistRepository};
use crate::service::drift::is_malformed;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from checklist service operations.
#[derive(Debug)]
pub enum ChecklistServiceError {
    /// No template row exists for this name.
    TemplateNotFound(String),
    /// No template row exists for this id.
    TemplateIdNotFound(TemplateId),
    /// Completion toggle target missing or owned by another user.
    ItemNotFound(UserChecklistItemId),
    /// Template-repository failure.
    Templates(TemplateRepoError),
    /// User-checklist-repository failure.
    UserChecklists(UserChecklistRepoError),
}

impl Display for ChecklistServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplateNotFound(name) => write!(f, "checklist not found: {name}"),
            Self::TemplateIdNotFound(id) => write!(f, "checklist template not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "checklist item not found: {id}"),
            Self::Templates(err) => write!(f, "{err}"),
            Self::UserChecklists(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ChecklistServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Templates(err) => Some(err),
            Self::UserChecklists(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TemplateRepoError> for ChecklistServiceError {
    fn from(value: TemplateRepoError) -> Self {
        Self::Templates(value)
    }
}

impl From<UserChecklistRepoError> for ChecklistServiceError {
    fn from(value: UserChecklistRepoError) -> Self {
        match value {
            UserChecklistRepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            other => Self::UserChecklists(other),
        }
    }
}

/// Result of one reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The well-formed user checklist, items attached.
    pub user_checklist: UserChecklistWithItems,
    /// Whether the copy is bound to the newest template version. Callers use
    /// `false` to offer a "new version available" prompt.
    pub is_latest_version: bool,
}

/// Checklist use-case service facade.
pub struct ChecklistService<T: TemplateRepository, U: UserChecklistRepository> {
    templates: T,
    user_checklists: U,
}

impl<T: TemplateRepository, U: UserChecklistRepository> ChecklistService<T, U> {
    /// Creates a service from repository implementations.
    pub fn new(templates: T, user_checklists: U) -> Self {
        Self {
            templates,
            user_checklists,
        }
    }

    /// Returns a well-formed user checklist for the latest template with this
    /// name, cloning or repairing as needed.
    ///
    /// # Contract
    /// - Clones on first access (no existing copy).
    /// - A malformed copy is deleted and re-cloned from the latest version;
    ///   completion state is not carried over.
    /// - A well-formed copy bound to an older version is returned as-is with
    ///   `is_latest_version = false`.
    ///
    /// # Errors
    /// - `TemplateNotFound` when no template row carries this name.
    pub fn get_or_repair(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<ReconcileOutcome, ChecklistServiceError> {
        let latest = self
            .templates
            .find_latest_by_name(name)?
            .ok_or_else(|| ChecklistServiceError::TemplateNotFound(name.to_string()))?;

        let existing = self
            .user_checklists
            .find_newest_for_template_name(user_id, name)?;

        let user_checklist = match existing {
            Some(current) if !is_malformed(&current, &latest) => current,
            Some(stale) => self.repair(user_id, name, stale, &latest)?,
            None => self.user_checklists.clone_template(&latest, user_id)?,
        };

        let is_latest_version = user_checklist.checklist.template_id == latest.template.id;
        Ok(ReconcileOutcome {
            user_checklist,
            is_latest_version,
        })
    }

    /// Clones one specific template version to the user, regardless of
    /// whether it is the latest.
    ///
    /// # Errors
    /// - `TemplateIdNotFound` when the id does not exist.
    pub fn clone_from_template(
        &self,
        user_id: UserId,
        template_id: TemplateId,
    ) -> Result<UserChecklistWithItems, ChecklistServiceError> {
        let template = self
            .templates
            .get_with_items(template_id)?
            .ok_or(ChecklistServiceError::TemplateIdNotFound(template_id))?;
        Ok(self.user_checklists.clone_template(&template, user_id)?)
    }

    /// Sets one item's completion flag; the owning checklist's roll-up flag
    /// follows in the same transaction.
    ///
    /// # Errors
    /// - `ItemNotFound` when the item is missing or owned by another user.
    pub fn set_item_completion(
        &self,
        user_id: UserId,
        item_id: UserChecklistItemId,
        is_complete: bool,
    ) -> Result<UserChecklistItemView, ChecklistServiceError> {
        Ok(self
            .user_checklists
            .set_item_completion(user_id, item_id, is_complete)?)
    }

    /// Returns the newest template with this name that is strictly newer than
    /// the version the user's copy is bound to.
    ///
    /// `None` when the user has no copy or is already current.
    pub fn newer_template_for_user(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Option<ChecklistTemplate>, ChecklistServiceError> {
        let Some(current) = self
            .user_checklists
            .find_newest_for_template_name(user_id, name)?
        else {
            return Ok(None);
        };

        let bound_id = current.checklist.template_id;
        let bound = self
            .templates
            .get_with_items(bound_id)?
            .ok_or(ChecklistServiceError::TemplateIdNotFound(bound_id))?;

        // Versions come newest-first, so the first strictly newer row wins.
        let newer = self
            .templates
            .list_versions(name)?
            .into_iter()
            .find(|candidate| is_newer_version(&candidate.version, &bound.template.version));
        Ok(newer)
    }

    /// Lists template rows without items, in the repository's stable order.
    pub fn list_templates(
        &self,
        query: &TemplateListQuery,
    ) -> Result<Vec<ChecklistTemplate>, ChecklistServiceError> {
        Ok(self.templates.list_templates(query)?)
    }

    fn repair(
        &self,
        user_id: UserId,
        name: &str,
        stale: UserChecklistWithItems,
        latest: &TemplateWithItems,
    ) -> Result<UserChecklistWithItems, ChecklistServiceError> {
        info!(
            "event=checklist_repair module=service status=start user_id={user_id} checklist_id={} template_id={}",
            stale.checklist.id, latest.template.id
        );

        match self
            .user_checklists
            .replace_with_clone(stale.checklist.id, latest, user_id)
        {
            Ok(cloned) => {
                info!(
                    "event=checklist_repair module=service status=ok user_id={user_id} checklist_id={}",
                    cloned.checklist.id
                );
                Ok(cloned)
            }
            Err(UserChecklistRepoError::ChecklistNotFound(_)) => {
                // Lost the repair race to a concurrent request. Re-read and
                // accept the winner's clone when it is well-formed.
                let fresh = self
                    .user_checklists
                    .find_newest_for_template_name(user_id, name)?;
                match fresh {
                    Some(fresh) if !is_malformed(&fresh, latest) => {
                        info!(
                            "event=checklist_repair module=service status=ok user_id={user_id} checklist_id={} raced=1",
                            fresh.checklist.id
                        );
                        Ok(fresh)
                    }
                    _ => Err(ChecklistServiceError::UserChecklists(
                        UserChecklistRepoError::ChecklistNotFound(stale.checklist.id),
                    )),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}
