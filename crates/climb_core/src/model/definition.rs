//! Seed definition model for checklist templates.
//!
//! # Responsibility
//! - Define the structured shape template definitions are loaded from.
//! - Validate definitions before any persistence happens.
//!
//! # Invariants
//! - `version` must look like an ISO date or timestamp, since version
//!   resolution relies on lexicographic order.
//! - Item display texts are non-blank and unique within one definition.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}:\d{2}(\.\d{1,3})?Z?)?$")
        .expect("valid version regex")
});

/// Validation failure for one checklist definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// Checklist name is blank after trim.
    BlankName,
    /// Version string does not have ISO date/timestamp shape.
    InvalidVersion { name: String, version: String },
    /// Definition has no items.
    EmptyItems(String),
    /// An item display text is blank after trim.
    BlankItemText { name: String, index: usize },
    /// Two items share one display text.
    DuplicateItemText { name: String, display_text: String },
}

impl Display for DefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "checklist name must not be blank"),
            Self::InvalidVersion { name, version } => write!(
                f,
                "checklist `{name}` has invalid version `{version}`; expected ISO date or timestamp"
            ),
            Self::EmptyItems(name) => write!(f, "checklist `{name}` has no items"),
            Self::BlankItemText { name, index } => {
                write!(f, "checklist `{name}` item {index} has blank display text")
            }
            Self::DuplicateItemText { name, display_text } => write!(
                f,
                "checklist `{name}` repeats item display text `{display_text}`"
            ),
        }
    }
}

impl Error for DefinitionError {}

/// One item of a checklist definition.
///
/// Seed files may spell an item as a bare string, which expands to an object
/// with all optional fields defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemDefinition {
    /// Shorthand: display text only.
    Text(String),
    /// Full item shape.
    Full(ItemDefinitionFields),
}

/// Full field set of one item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinitionFields {
    pub display_text: String,
    #[serde(default)]
    pub detail_text: String,
    #[serde(default = "default_true")]
    pub is_required: bool,
    #[serde(default)]
    pub link_text: String,
    #[serde(default)]
    pub link_uri: String,
}

fn default_true() -> bool {
    true
}

impl ItemDefinition {
    /// Expands shorthand items to the full field shape.
    pub fn into_fields(self) -> ItemDefinitionFields {
        match self {
            Self::Text(display_text) => ItemDefinitionFields {
                display_text,
                detail_text: String::new(),
                is_required: true,
                link_text: String::new(),
                link_uri: String::new(),
            },
            Self::Full(fields) => fields,
        }
    }

    fn display_text(&self) -> &str {
        match self {
            Self::Text(display_text) => display_text,
            Self::Full(fields) => &fields.display_text,
        }
    }
}

/// One checklist definition as loaded from a seed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistDefinition {
    pub name: String,
    pub version: String,
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub pretty_route: Option<String>,
}

impl ChecklistDefinition {
    /// Validates this definition for persistence.
    ///
    /// # Errors
    /// - Returns the first violated rule; write paths must not proceed on
    ///   any error.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::BlankName);
        }
        if !VERSION_RE.is_match(&self.version) {
            return Err(DefinitionError::InvalidVersion {
                name: self.name.clone(),
                version: self.version.clone(),
            });
        }
        if self.items.is_empty() {
            return Err(DefinitionError::EmptyItems(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for (index, item) in self.items.iter().enumerate() {
            let display_text = item.display_text().trim();
            if display_text.is_empty() {
                return Err(DefinitionError::BlankItemText {
                    name: self.name.clone(),
                    index,
                });
            }
            if !seen.insert(display_text.to_string()) {
                return Err(DefinitionError::DuplicateItemText {
                    name: self.name.clone(),
                    display_text: display_text.to_string(),
                });
            }
        }

        Ok(())
    }
}
