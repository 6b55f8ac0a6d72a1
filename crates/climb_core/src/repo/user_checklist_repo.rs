//! User checklist repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Materialize per-user checklist copies from template rows (cloning).
//! - Replace a malformed copy atomically (delete items, delete row, re-clone).
//! - Persist per-item completion with whole-checklist roll-up.
//!
//! # Invariants
//! - Clone and replace run as single `IMMEDIATE` transactions.
//! - The `(user_id, template_id)` unique constraint is the race guard for
//!   concurrent clones; the losing writer surfaces a constraint error.
//! - Item listings are ordered by the referenced template items'
//!   `display_index ASC`, then item id.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::template::{ChecklistTemplateItem, TemplateWithItems};
use crate::model::user_checklist::{
    UserChecklist, UserChecklistId, UserChecklistItem, UserChecklistItemId, UserChecklistItemView,
    UserChecklistWithItems, UserId,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHECKLIST_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    template_id,
    is_complete,
    created_at
FROM user_checklists";

const ITEM_VIEW_SELECT_SQL: &str = "SELECT
    uci.id AS item_id,
    uci.user_checklist_id AS user_checklist_id,
    uci.template_item_id AS template_item_id,
    uci.user_id AS item_user_id,
    uci.is_complete AS item_is_complete,
    cti.template_id AS template_id,
    cti.display_text AS display_text,
    cti.detail_text AS detail_text,
    cti.is_required AS is_required,
    cti.link_text AS link_text,
    cti.link_uri AS link_uri,
    cti.display_index AS display_index
FROM user_checklist_items uci
INNER JOIN checklist_template_items cti ON cti.id = uci.template_item_id";

pub type UserChecklistRepoResult<T> = Result<T, UserChecklistRepoError>;

/// Errors from user checklist repository operations.
#[derive(Debug)]
pub enum UserChecklistRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target user checklist does not exist.
    ChecklistNotFound(UserChecklistId),
    /// Target item does not exist or belongs to another user.
    ItemNotFound(UserChecklistItemId),
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

impl Display for UserChecklistRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ChecklistNotFound(id) => write!(f, "user checklist not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "user checklist item not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted user checklist data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user checklist repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "user checklist repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "user checklist repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for UserChecklistRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for UserChecklistRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for UserChecklistRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for user checklist storage.
pub trait UserChecklistRepository {
    /// Loads the user's newest checklist whose template has this name.
    ///
    /// Searches across all template versions of the name, not only the
    /// latest, since a user's copy may lag behind the current version.
    fn find_newest_for_template_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> UserChecklistRepoResult<Option<UserChecklistWithItems>>;
    /// Loads one user checklist with items by id.
    fn get_with_items(
        &self,
        id: UserChecklistId,
    ) -> UserChecklistRepoResult<Option<UserChecklistWithItems>>;
    /// Clones a template to a fresh user checklist with all items incomplete.
    fn clone_template(
        &self,
        template: &TemplateWithItems,
        user_id: UserId,
    ) -> UserChecklistRepoResult<UserChecklistWithItems>;
    /// Deletes an existing checklist (items first) and clones the template,
    /// all within one transaction.
    fn replace_with_clone(
        &self,
        old_id: UserChecklistId,
        template: &TemplateWithItems,
        user_id: UserId,
    ) -> UserChecklistRepoResult<UserChecklistWithItems>;
    /// Sets one item's completion flag and maintains the checklist roll-up.
    fn set_item_completion(
        &self,
        user_id: UserId,
        item_id: UserChecklistItemId,
        is_complete: bool,
    ) -> UserChecklistRepoResult<UserChecklistItemView>;
}

/// SQLite-backed user checklist repository.
pub struct SqliteUserChecklistRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserChecklistRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> UserChecklistRepoResult<Self> {
        ensure_user_checklist_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserChecklistRepository for SqliteUserChecklistRepository<'_> {
    fn find_newest_for_template_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> UserChecklistRepoResult<Option<UserChecklistWithItems>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uc.id AS id,
                uc.user_id AS user_id,
                uc.template_id AS template_id,
                uc.is_complete AS is_complete,
                uc.created_at AS created_at
             FROM user_checklists uc
             INNER JOIN checklist_templates t ON t.id = uc.template_id
             WHERE uc.user_id = ?1
               AND t.name = ?2
             ORDER BY uc.created_at DESC, uc.id DESC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query(params![user_id, name])?;
        if let Some(row) = rows.next()? {
            let checklist = parse_checklist_row(row)?;
            let items = load_item_views(self.conn, checklist.id)?;
            return Ok(Some(UserChecklistWithItems { checklist, items }));
        }
        Ok(None)
    }

    fn get_with_items(
        &self,
        id: UserChecklistId,
    ) -> UserChecklistRepoResult<Option<UserChecklistWithItems>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHECKLIST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            let checklist = parse_checklist_row(row)?;
            let items = load_item_views(self.conn, checklist.id)?;
            return Ok(Some(UserChecklistWithItems { checklist, items }));
        }
        Ok(None)
    }

    fn clone_template(
        &self,
        template: &TemplateWithItems,
        user_id: UserId,
    ) -> UserChecklistRepoResult<UserChecklistWithItems> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let cloned = insert_clone(&tx, template, user_id)?;
        tx.commit()?;
        Ok(cloned)
    }

    fn replace_with_clone(
        &self,
        old_id: UserChecklistId,
        template: &TemplateWithItems,
        user_id: UserId,
    ) -> UserChecklistRepoResult<UserChecklistWithItems> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        // Items first to satisfy the foreign-key dependency.
        tx.execute(
            "DELETE FROM user_checklist_items WHERE user_checklist_id = ?1;",
            [old_id],
        )?;
        let deleted = tx.execute("DELETE FROM user_checklists WHERE id = ?1;", [old_id])?;
        if deleted == 0 {
            // A concurrent repair already removed this row; let the caller
            // re-read instead of cloning a duplicate.
            return Err(UserChecklistRepoError::ChecklistNotFound(old_id));
        }

        let cloned = insert_clone(&tx, template, user_id)?;
        tx.commit()?;
        Ok(cloned)
    }

    fn set_item_completion(
        &self,
        user_id: UserId,
        item_id: UserChecklistItemId,
        is_complete: bool,
    ) -> UserChecklistRepoResult<UserChecklistItemView> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE user_checklist_items
             SET is_complete = ?3
             WHERE id = ?1
               AND user_id = ?2;",
            params![item_id, user_id, is_complete],
        )?;
        if changed == 0 {
            return Err(UserChecklistRepoError::ItemNotFound(item_id));
        }

        let checklist_id: UserChecklistId = tx.query_row(
            "SELECT user_checklist_id FROM user_checklist_items WHERE id = ?1;",
            [item_id],
            |row| row.get(0),
        )?;

        // Roll-up: the checklist is complete only while every item is.
        let all_complete = if is_complete {
            let open_items: i64 = tx.query_row(
                "SELECT EXISTS(
                    SELECT 1
                    FROM user_checklist_items
                    WHERE user_checklist_id = ?1
                      AND is_complete = 0
                );",
                [checklist_id],
                |row| row.get(0),
            )?;
            open_items == 0
        } else {
            false
        };
        tx.execute(
            "UPDATE user_checklists SET is_complete = ?2 WHERE id = ?1;",
            params![checklist_id, all_complete],
        )?;

        let view = load_required_item_view(&tx, item_id)?;
        tx.commit()?;
        Ok(view)
    }
}

fn insert_clone(
    conn: &Connection,
    template: &TemplateWithItems,
    user_id: UserId,
) -> UserChecklistRepoResult<UserChecklistWithItems> {
    conn.execute(
        "INSERT INTO user_checklists (user_id, template_id, is_complete)
         VALUES (?1, ?2, 0);",
        params![user_id, template.template.id],
    )?;
    let checklist_id = conn.last_insert_rowid();
    let created_at: i64 = conn.query_row(
        "SELECT created_at FROM user_checklists WHERE id = ?1;",
        [checklist_id],
        |row| row.get(0),
    )?;

    let mut items = Vec::with_capacity(template.items.len());
    for template_item in &template.items {
        conn.execute(
            "INSERT INTO user_checklist_items (
                user_checklist_id,
                template_item_id,
                user_id,
                is_complete
            ) VALUES (?1, ?2, ?3, 0);",
            params![checklist_id, template_item.id, user_id],
        )?;
        items.push(UserChecklistItemView {
            item: UserChecklistItem {
                id: conn.last_insert_rowid(),
                user_checklist_id: checklist_id,
                template_item_id: template_item.id,
                user_id,
                is_complete: false,
            },
            template_item: template_item.clone(),
        });
    }

    Ok(UserChecklistWithItems {
        checklist: UserChecklist {
            id: checklist_id,
            user_id,
            template_id: template.template.id,
            is_complete: false,
            created_at,
        },
        items,
    })
}

fn load_item_views(
    conn: &Connection,
    checklist_id: UserChecklistId,
) -> UserChecklistRepoResult<Vec<UserChecklistItemView>> {
    let mut stmt = conn.prepare(&format!(
        "{ITEM_VIEW_SELECT_SQL}
         WHERE uci.user_checklist_id = ?1
         ORDER BY cti.display_index ASC, uci.id ASC;"
    ))?;
    let mut rows = stmt.query([checklist_id])?;

    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_item_view_row(row)?);
    }
    Ok(items)
}

fn load_required_item_view(
    conn: &Connection,
    item_id: UserChecklistItemId,
) -> UserChecklistRepoResult<UserChecklistItemView> {
    let mut stmt = conn.prepare(&format!("{ITEM_VIEW_SELECT_SQL} WHERE uci.id = ?1;"))?;
    let mut rows = stmt.query([item_id])?;
    if let Some(row) = rows.next()? {
        return parse_item_view_row(row);
    }
    Err(UserChecklistRepoError::ItemNotFound(item_id))
}

fn parse_checklist_row(row: &Row<'_>) -> UserChecklistRepoResult<UserChecklist> {
    Ok(UserChecklist {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        template_id: row.get("template_id")?,
        is_complete: parse_bool(row.get("is_complete")?, "user_checklists.is_complete")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_item_view_row(row: &Row<'_>) -> UserChecklistRepoResult<UserChecklistItemView> {
    let template_item_id = row.get("template_item_id")?;
    Ok(UserChecklistItemView {
        item: UserChecklistItem {
            id: row.get("item_id")?,
            user_checklist_id: row.get("user_checklist_id")?,
            template_item_id,
            user_id: row.get("item_user_id")?,
            is_complete: parse_bool(
                row.get("item_is_complete")?,
                "user_checklist_items.is_complete",
            )?,
        },
        template_item: ChecklistTemplateItem {
            id: template_item_id,
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
        },
    })
}

fn parse_bool(value: i64, column: &'static str) -> UserChecklistRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(UserChecklistRepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn ensure_user_checklist_connection_ready(conn: &Connection) -> UserChecklistRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(UserChecklistRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "user_checklists")? {
        return Err(UserChecklistRepoError::MissingRequiredTable("user_checklists"));
    }
    if !table_exists(conn, "user_checklist_items")? {
        return Err(UserChecklistRepoError::MissingRequiredTable(
            "user_checklist_items",
        ));
    }

    for column in ["id", "user_id", "template_id", "is_complete", "created_at"] {
        if !table_has_column(conn, "user_checklists", column)? {
            return Err(UserChecklistRepoError::MissingRequiredColumn {
                table: "user_checklists",
                column,
            });
        }
    }
    for column in [
        "id",
        "user_checklist_id",
        "template_item_id",
        "user_id",
        "is_complete",
    ] {
        if !table_has_column(conn, "user_checklist_items", column)? {
            return Err(UserChecklistRepoError::MissingRequiredColumn {
                table: "user_checklist_items",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> UserChecklistRepoResult<bool> {
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> UserChecklistRepoResult<bool> {
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
