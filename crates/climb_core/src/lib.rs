//! Core domain logic for the Climb checklist platform.
//! This crate is the single source of truth for checklist business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::definition::{
    ChecklistDefinition, DefinitionError, ItemDefinition, ItemDefinitionFields,
};
pub use model::template::{
    ChecklistTemplate, ChecklistTemplateItem, TemplateId, TemplateItemId, TemplateWithItems,
};
pub use model::user_checklist::{
    UserChecklist, UserChecklistId, UserChecklistItem, UserChecklistItemId, UserChecklistItemView,
    UserChecklistWithItems, UserId,
};
pub use repo::template_repo::{
    SqliteTemplateRepository, TemplateListQuery, TemplateRepoError, TemplateRepoResult,
    TemplateRepository,
};
pub use repo::user_checklist_repo::{
    SqliteUserChecklistRepository, UserChecklistRepoError, UserChecklistRepoResult,
    UserChecklistRepository,
};
pub use service::drift::is_malformed;
pub use service::reconcile::{ChecklistService, ChecklistServiceError, ReconcileOutcome};
pub use service::seed::{seed_checklists, seed_checklists_from_json, SeedError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
