//! Template seeding from structured JSON definitions.
//!
//! # Responsibility
//! - Parse seed files into checklist definitions and apply them through the
//!   template repository's upsert rules.
//!
//! # Invariants
//! - Definitions validate before any write; a bad definition aborts the seed
//!   run without touching later entries.

use crate::model::definition::ChecklistDefinition;
use crate::model::template::TemplateWithItems;
use crate::repo::template_repo::{TemplateRepoError, TemplateRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from seeding checklist definitions.
#[derive(Debug)]
pub enum SeedError {
    /// Seed input is not valid JSON for a definition list.
    Parse(serde_json::Error),
    /// Upsert failed (validation or persistence).
    Template(TemplateRepoError),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid seed JSON: {err}"),
            Self::Template(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Template(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SeedError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<TemplateRepoError> for SeedError {
    fn from(value: TemplateRepoError) -> Self {
        Self::Template(value)
    }
}

/// Parses a JSON array of checklist definitions and upserts each in order.
///
/// Returns the seeded templates with items, in input order.
pub fn seed_checklists_from_json<R: TemplateRepository>(
    repo: &R,
    json: &str,
) -> Result<Vec<TemplateWithItems>, SeedError> {
    let definitions: Vec<ChecklistDefinition> = serde_json::from_str(json)?;
    seed_checklists(repo, &definitions)
}

/// Upserts already-parsed definitions in order.
pub fn seed_checklists<R: TemplateRepository>(
    repo: &R,
    definitions: &[ChecklistDefinition],
) -> Result<Vec<TemplateWithItems>, SeedError> {
    let mut seeded = Vec::with_capacity(definitions.len());
    for definition in definitions {
        info!(
            "event=checklist_seed module=service status=start name={} version={}",
            definition.name, definition.version
        );
        let template = repo.upsert_definition(definition)?;
        info!(
            "event=checklist_seed module=service status=ok name={} template_id={} items={}",
            definition.name,
            template.template.id,
            template.items.len()
        );
        seeded.push(template);
    }
    Ok(seeded)
}
