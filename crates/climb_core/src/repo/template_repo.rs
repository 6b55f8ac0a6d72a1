//! Checklist template repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide versioned template reads ("latest by name" resolution).
//! - Apply seed definitions with idempotent upsert semantics.
//!
//! # Invariants
//! - A superseded `(name, version)` row is never mutated; publishing a new
//!   version inserts a new row.
//! - Re-seeding the latest version updates its items in place.
//! - Item listings are always ordered by `display_index ASC, id ASC`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::definition::{ChecklistDefinition, DefinitionError};
use crate::model::template::{
    ChecklistTemplate, ChecklistTemplateItem, TemplateId, TemplateWithItems,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id,
    name,
    version,
    is_premium,
    pretty_route,
    created_at
FROM checklist_templates";

const TEMPLATE_ITEM_SELECT_SQL: &str = "SELECT
    id,
    template_id,
    display_text,
    detail_text,
    is_required,
    link_text,
    link_uri,
    display_index
FROM checklist_template_items";

pub type TemplateRepoResult<T> = Result<T, TemplateRepoError>;

/// Errors from template repository operations.
#[derive(Debug)]
pub enum TemplateRepoError {
    /// Seed definition failed validation.
    Validation(DefinitionError),
    /// Seed definition targets a superseded `(name, version)` row.
    SupersededVersion { name: String, version: String },
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for TemplateRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::SupersededVersion { name, version } => write!(
                f,
                "checklist `{name}` version `{version}` is superseded and immutable"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted template data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "template repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "template repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "template repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for TemplateRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DefinitionError> for TemplateRepoError {
    fn from(value: DefinitionError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for TemplateRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TemplateRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for checklist template storage.
pub trait TemplateRepository {
    /// Loads the newest template version with this name, items attached.
    fn find_latest_by_name(&self, name: &str) -> TemplateRepoResult<Option<TemplateWithItems>>;
    /// Loads one template row with items by id.
    fn get_with_items(&self, id: TemplateId) -> TemplateRepoResult<Option<TemplateWithItems>>;
    /// Lists template rows without items, ordered by `id ASC`.
    fn list_templates(&self, query: &TemplateListQuery) -> TemplateRepoResult<Vec<ChecklistTemplate>>;
    /// Lists all versions of one name, newest first, without items.
    fn list_versions(&self, name: &str) -> TemplateRepoResult<Vec<ChecklistTemplate>>;
    /// Applies one seed definition; see module invariants for upsert rules.
    fn upsert_definition(
        &self,
        definition: &ChecklistDefinition,
    ) -> TemplateRepoResult<TemplateWithItems>;
}

/// SQLite-backed template repository.
pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TemplateRepoResult<Self> {
        ensure_template_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn find_latest_by_name(&self, name: &str) -> TemplateRepoResult<Option<TemplateWithItems>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL}
             WHERE name = ?1
             ORDER BY version DESC, id DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            let template = parse_template_row(row)?;
            let items = load_items(self.conn, template.id)?;
            return Ok(Some(TemplateWithItems { template, items }));
        }
        Ok(None)
    }

    fn get_with_items(&self, id: TemplateId) -> TemplateRepoResult<Option<TemplateWithItems>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            let template = parse_template_row(row)?;
            let items = load_items(self.conn, template.id)?;
            return Ok(Some(TemplateWithItems { template, items }));
        }
        Ok(None)
    }

    fn list_templates(
        &self,
        query: &TemplateListQuery,
    ) -> TemplateRepoResult<Vec<ChecklistTemplate>> {
        let limit = query.limit.map_or(-1, i64::from);
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL}
             ORDER BY id ASC
             LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![limit, i64::from(query.offset)])?;

        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn list_versions(&self, name: &str) -> TemplateRepoResult<Vec<ChecklistTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL}
             WHERE name = ?1
             ORDER BY version DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([name])?;

        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn upsert_definition(
        &self,
        definition: &ChecklistDefinition,
    ) -> TemplateRepoResult<TemplateWithItems> {
        definition.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let latest: Option<(TemplateId, String)> = tx
            .query_row(
                "SELECT id, version
                 FROM checklist_templates
                 WHERE name = ?1
                 ORDER BY version DESC, id DESC
                 LIMIT 1;",
                [definition.name.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let template_id = match latest {
            Some((id, version)) if version == definition.version => {
                sync_items_in_place(&tx, id, definition)?;
                update_template_metadata(&tx, id, definition)?;
                id
            }
            _ => {
                if version_exists(&tx, &definition.name, &definition.version)? {
                    return Err(TemplateRepoError::SupersededVersion {
                        name: definition.name.clone(),
                        version: definition.version.clone(),
                    });
                }
                insert_template_with_items(&tx, definition)?
            }
        };

        let template = load_required_template(&tx, template_id)?;
        let items = load_items(&tx, template_id)?;
        tx.commit()?;

        Ok(TemplateWithItems { template, items })
    }
}

fn insert_template_with_items(
    conn: &Connection,
    definition: &ChecklistDefinition,
) -> TemplateRepoResult<TemplateId> {
    conn.execute(
        "INSERT INTO checklist_templates (name, version, is_premium, pretty_route)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            definition.name.as_str(),
            definition.version.as_str(),
            definition.is_premium,
            definition.pretty_route.as_deref(),
        ],
    )?;
    let template_id = conn.last_insert_rowid();

    for (index, item) in definition.items.iter().cloned().enumerate() {
        let fields = item.into_fields();
        conn.execute(
            "INSERT INTO checklist_template_items (
                template_id,
                display_text,
                detail_text,
                is_required,
                link_text,
                link_uri,
                display_index
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                template_id,
                fields.display_text.as_str(),
                fields.detail_text.as_str(),
                fields.is_required,
                fields.link_text.as_str(),
                fields.link_uri.as_str(),
                index as i64,
            ],
        )?;
    }

    Ok(template_id)
}

// In-place re-seed of the latest version: upsert items by display_text,
// then drop items the definition no longer mentions.
fn sync_items_in_place(
    conn: &Connection,
    template_id: TemplateId,
    definition: &ChecklistDefinition,
) -> TemplateRepoResult<()> {
    let mut kept = HashSet::new();

    for (index, item) in definition.items.iter().cloned().enumerate() {
        let fields = item.into_fields();
        kept.insert(fields.display_text.clone());

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id
                 FROM checklist_template_items
                 WHERE template_id = ?1
                   AND display_text = ?2;",
                params![template_id, fields.display_text.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(item_id) => {
                conn.execute(
                    "UPDATE checklist_template_items
                     SET detail_text = ?2,
                         is_required = ?3,
                         link_text = ?4,
                         link_uri = ?5,
                         display_index = ?6
                     WHERE id = ?1;",
                    params![
                        item_id,
                        fields.detail_text.as_str(),
                        fields.is_required,
                        fields.link_text.as_str(),
                        fields.link_uri.as_str(),
                        index as i64,
                    ],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO checklist_template_items (
                        template_id,
                        display_text,
                        detail_text,
                        is_required,
                        link_text,
                        link_uri,
                        display_index
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                    params![
                        template_id,
                        fields.display_text.as_str(),
                        fields.detail_text.as_str(),
                        fields.is_required,
                        fields.link_text.as_str(),
                        fields.link_uri.as_str(),
                        index as i64,
                    ],
                )?;
            }
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id, display_text
         FROM checklist_template_items
         WHERE template_id = ?1;",
    )?;
    let mut rows = stmt.query([template_id])?;
    let mut obsolete = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let display_text: String = row.get(1)?;
        if !kept.contains(&display_text) {
            obsolete.push(id);
        }
    }
    for item_id in obsolete {
        conn.execute(
            "DELETE FROM checklist_template_items WHERE id = ?1;",
            [item_id],
        )?;
    }

    Ok(())
}

fn update_template_metadata(
    conn: &Connection,
    template_id: TemplateId,
    definition: &ChecklistDefinition,
) -> TemplateRepoResult<()> {
    conn.execute(
        "UPDATE checklist_templates
         SET is_premium = ?2,
             pretty_route = ?3
         WHERE id = ?1;",
        params![
            template_id,
            definition.is_premium,
            definition.pretty_route.as_deref(),
        ],
    )?;
    Ok(())
}

fn version_exists(conn: &Connection, name: &str, version: &str) -> TemplateRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM checklist_templates
            WHERE name = ?1 AND version = ?2
        );",
        params![name, version],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_items(
    conn: &Connection,
    template_id: TemplateId,
) -> TemplateRepoResult<Vec<ChecklistTemplateItem>> {
    let mut stmt = conn.prepare(&format!(
        "{TEMPLATE_ITEM_SELECT_SQL}
         WHERE template_id = ?1
         ORDER BY display_index ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([template_id])?;

    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_template_item_row(row)?);
    }
    Ok(items)
}

fn load_required_template(
    conn: &Connection,
    template_id: TemplateId,
) -> TemplateRepoResult<ChecklistTemplate> {
    let mut stmt = conn.prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([template_id])?;
    if let Some(row) = rows.next()? {
        return parse_template_row(row);
    }
    Err(TemplateRepoError::InvalidData(format!(
        "template {template_id} missing after upsert"
    )))
}

fn parse_template_row(row: &Row<'_>) -> TemplateRepoResult<ChecklistTemplate> {
    Ok(ChecklistTemplate {
        id: row.get("id")?,
        name: row.get("name")?,
        version: row.get("version")?,
        is_premium: parse_bool(row.get("is_premium")?, "checklist_templates.is_premium")?,
        pretty_route: row.get("pretty_route")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_template_item_row(row: &Row<'_>) -> TemplateRepoResult<ChecklistTemplateItem> {
    Ok(ChecklistTemplateItem {
        id: row.get("id")?,
        template_id: row.get("template_id")?,
        display_text: row.get("display_text")?,
        detail_text: row.get("detail_text")?,
        is_required: parse_bool(
            row.get("is_required")?,
            "checklist_template_items.is_required",
        )?,
        link_text: row.get("link_text")?,
        link_uri: row.get("link_uri")?,
        display_index: row.get("display_index")?,
    })
}

fn parse_bool(value: i64, column: &'static str) -> TemplateRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(TemplateRepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn ensure_template_connection_ready(conn: &Connection) -> TemplateRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(TemplateRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "checklist_templates")? {
        return Err(TemplateRepoError::MissingRequiredTable("checklist_templates"));
    }
    if !table_exists(conn, "checklist_template_items")? {
        return Err(TemplateRepoError::MissingRequiredTable(
            "checklist_template_items",
        ));
    }

    for column in ["id", "name", "version", "is_premium", "pretty_route", "created_at"] {
        if !table_has_column(conn, "checklist_templates", column)? {
            return Err(TemplateRepoError::MissingRequiredColumn {
                table: "checklist_templates",
                column,
            });
        }
    }
    for column in [
        "id",
        "template_id",
        "display_text",
        "detail_text",
        "is_required",
        "link_text",
        "link_uri",
        "display_index",
    ] {
        if !table_has_column(conn, "checklist_template_items", column)? {
            return Err(TemplateRepoError::MissingRequiredColumn {
                table: "checklist_template_items",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TemplateRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> TemplateRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
