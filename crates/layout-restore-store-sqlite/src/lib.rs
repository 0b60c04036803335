use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use layout_restore_core::{
    AppWidgetId, Container, ItemType, LayoutRow, ProfileId, RestoredFlags, RowId, ScreenRemap,
    CONTAINER_DESKTOP,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, DatabaseName, OpenFlags, Savepoint, Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FAVORITES_TABLE: &str = "favorites";
const FAVORITES_STAGING_TABLE: &str = "favorites_old";

const TABLE_INFO_NAME_COLUMN: usize = 1;
const TABLE_INFO_DEFAULT_COLUMN: usize = 4;

/// Columns of the `favorites` table in declaration order.
pub const FAVORITES_COLUMNS: &[&str] = &[
    "_id",
    "title",
    "intent",
    "container",
    "screen",
    "cellX",
    "cellY",
    "spanX",
    "spanY",
    "itemType",
    "appWidgetId",
    "appWidgetProvider",
    "modified",
    "restored",
    "profileId",
    "rank",
    "options",
];

/// Columns written to the log when rows from unrestored profiles are dropped.
pub const DIAGNOSTIC_COLUMNS: &[&str] = &[
    "profileId",
    "title",
    "itemType",
    "screen",
    "container",
    "cellX",
    "cellY",
    "spanX",
    "spanY",
    "intent",
];

fn create_favorites_sql(table: &str, default_profile: ProfileId) -> String {
    format!(
        "CREATE TABLE {table} (
  _id INTEGER PRIMARY KEY,
  title TEXT,
  intent TEXT,
  container INTEGER,
  screen INTEGER,
  cellX INTEGER,
  cellY INTEGER,
  spanX INTEGER,
  spanY INTEGER,
  itemType INTEGER,
  appWidgetId INTEGER NOT NULL DEFAULT -1,
  appWidgetProvider TEXT,
  modified INTEGER NOT NULL DEFAULT 0,
  restored INTEGER NOT NULL DEFAULT 0,
  profileId INTEGER DEFAULT {default_profile},
  rank INTEGER NOT NULL DEFAULT 0,
  options INTEGER NOT NULL DEFAULT 0
);"
    )
}

pub struct SqliteLayoutStore {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub quick_check_ok: bool,
    pub quick_check_message: String,
    pub has_favorites_table: bool,
    pub default_profile_id: Option<ProfileId>,
    pub row_count: i64,
}

impl SqliteLayoutStore {
    /// Open a SQLite-backed layout store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch("PRAGMA busy_timeout = 5000;")
            .context("failed to configure sqlite pragmas")?;

        Ok(Self { conn })
    }

    /// Create the `favorites` table when it does not exist yet.
    ///
    /// # Errors
    /// Returns an error when the schema cannot be inspected or created.
    pub fn ensure_schema(&self, default_profile: ProfileId) -> Result<()> {
        if table_exists(&self.conn, FAVORITES_TABLE)? {
            return Ok(());
        }
        self.conn
            .execute_batch(&create_favorites_sql(FAVORITES_TABLE, default_profile))
            .context("failed to create favorites table")
    }

    /// Discard every table and recreate an empty `favorites` table.
    ///
    /// # Errors
    /// Returns an error when any table cannot be dropped or the schema cannot be created.
    pub fn reset_empty(&mut self, default_profile: ProfileId) -> Result<()> {
        let tables = user_tables(&self.conn)?;
        let tx = self.conn.transaction().context("failed to start reset transaction")?;
        for table in &tables {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\";"))
                .with_context(|| format!("failed to drop table {table}"))?;
        }
        tx.execute_batch(&create_favorites_sql(FAVORITES_TABLE, default_profile))
            .context("failed to recreate favorites table")?;
        tx.commit().context("failed to commit reset transaction")?;
        debug!(dropped_tables = tables.len(), %default_profile, "recreated empty layout store");
        Ok(())
    }

    /// Read-only access outside of an explicit transaction.
    #[must_use]
    pub fn favorites(&self) -> Favorites<'_> {
        Favorites { conn: &self.conn }
    }

    /// Begin the write transaction a restore pass runs in. Dropping it rolls back.
    ///
    /// # Errors
    /// Returns an error when `SQLite` refuses to start the transaction.
    pub fn transaction(&mut self) -> Result<LayoutTransaction<'_>> {
        let tx = self.conn.transaction().context("failed to start transaction")?;
        Ok(LayoutTransaction { tx })
    }

    /// Write a `SQLite` backup of the current store to `out_file`.
    ///
    /// # Errors
    /// Returns an error when backup directories cannot be created or backup fails.
    pub fn backup_database(&self, out_file: &Path) -> Result<()> {
        if let Some(parent) = out_file.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory for backup file {}", out_file.display())
            })?;
        }

        self.conn
            .backup(DatabaseName::Main, out_file, None)
            .with_context(|| format!("failed to create sqlite backup at {}", out_file.display()))
    }

    /// Replace this store's contents with a `SQLite` backup taken on another device.
    ///
    /// The snapshot is inspected read-only first; a snapshot without a `favorites.profileId`
    /// column leaves this store untouched.
    ///
    /// # Errors
    /// Returns an error when the backup file is missing or cannot be opened, has no
    /// `favorites.profileId` column, or the restore fails.
    pub fn restore_database(&mut self, in_file: &Path) -> Result<()> {
        if !in_file.exists() {
            return Err(anyhow!("backup file does not exist: {}", in_file.display()));
        }

        let snapshot = Connection::open_with_flags(in_file, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open sqlite backup {}", in_file.display()))?;
        if !table_has_column(&snapshot, FAVORITES_TABLE, "profileId")? {
            return Err(anyhow!(
                "backup has no {FAVORITES_TABLE}.profileId column: {}",
                in_file.display()
            ));
        }
        drop(snapshot);

        self.conn
            .restore(DatabaseName::Main, in_file, None::<fn(rusqlite::backup::Progress)>)
            .with_context(|| {
                format!("failed to restore sqlite backup from {}", in_file.display())
            })
    }

    /// Run quick-check and report the layout schema state.
    ///
    /// # Errors
    /// Returns an error when any integrity probe query fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let quick_check_message: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))
            .context("failed to run PRAGMA quick_check")?;

        let has_favorites_table = table_exists(&self.conn, FAVORITES_TABLE)?;
        let (default_profile_id, row_count) = if has_favorites_table {
            let favorites = self.favorites();
            (favorites.default_profile_id()?, favorites.row_count()?)
        } else {
            (None, 0)
        };

        Ok(IntegrityReport {
            quick_check_ok: quick_check_message == "ok",
            quick_check_message,
            has_favorites_table,
            default_profile_id,
            row_count,
        })
    }
}

pub struct LayoutTransaction<'a> {
    tx: Transaction<'a>,
}

impl LayoutTransaction<'_> {
    #[must_use]
    pub fn favorites(&self) -> Favorites<'_> {
        Favorites { conn: &self.tx }
    }

    /// Open a nested scope that only takes effect when committed.
    ///
    /// # Errors
    /// Returns an error when the savepoint cannot be created.
    pub fn savepoint(&mut self) -> Result<LayoutSavepoint<'_>> {
        let sp = self.tx.savepoint().context("failed to open savepoint")?;
        Ok(LayoutSavepoint { sp })
    }

    /// # Errors
    /// Returns an error when `SQLite` fails to commit.
    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("failed to commit restore transaction")
    }
}

pub struct LayoutSavepoint<'a> {
    sp: Savepoint<'a>,
}

impl LayoutSavepoint<'_> {
    #[must_use]
    pub fn favorites(&self) -> Favorites<'_> {
        Favorites { conn: &self.sp }
    }

    /// # Errors
    /// Returns an error when `SQLite` fails to release the savepoint.
    pub fn commit(self) -> Result<()> {
        self.sp.commit().context("failed to release savepoint")
    }
}

/// Queries and bulk statements over the `favorites` table.
#[derive(Clone, Copy)]
pub struct Favorites<'c> {
    conn: &'c Connection,
}

impl Favorites<'_> {
    /// Table-level default of `profileId`, which records the primary profile the store was
    /// written for. `None` when the column is missing or has no integer default.
    ///
    /// # Errors
    /// Returns an error when the table metadata cannot be read.
    pub fn default_profile_id(&self) -> Result<Option<ProfileId>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({FAVORITES_TABLE})"))
            .context("failed to inspect favorites table_info")?;
        let mut rows = stmt.query([])?;

        while let Some(row) = rows.next()? {
            let name: String = row.get(TABLE_INFO_NAME_COLUMN)?;
            if name != "profileId" {
                continue;
            }
            let default = match row.get::<_, Value>(TABLE_INFO_DEFAULT_COLUMN)? {
                Value::Integer(value) => Some(value),
                Value::Text(text) => parse_sql_integer(&text),
                _ => None,
            };
            return Ok(default.map(ProfileId));
        }

        Ok(None)
    }

    /// Distinct profile ids present in the table other than `excluded`.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn distinct_profile_ids_except(&self, excluded: ProfileId) -> Result<Vec<ProfileId>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT profileId FROM favorites WHERE profileId != ?1
                 GROUP BY profileId ORDER BY profileId",
            )
            .context("failed to prepare profile id query")?;
        let ids = stmt
            .query_map(params![excluded.0], |row| row.get::<_, i64>(0))?
            .map(|row| row.map(ProfileId))
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read profile ids")?;
        Ok(ids)
    }

    /// Render the key columns of rows whose profile is not in `retained`, one line per row.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn describe_rows_outside_profiles(&self, retained: &[ProfileId]) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {} FROM favorites WHERE {}",
            DIAGNOSTIC_COLUMNS.join(", "),
            profile_not_in_clause(retained.len())
        );
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare diagnostic query")?;
        let mut rows = stmt.query(params_from_iter(retained.iter().map(|id| id.0)))?;

        let mut lines = Vec::new();
        while let Some(row) = rows.next()? {
            let mut line = String::new();
            for (index, column) in DIAGNOSTIC_COLUMNS.iter().enumerate() {
                let value: Value = row.get(index)?;
                line.push_str(column);
                line.push('=');
                line.push_str(&display_value(&value));
                line.push(' ');
            }
            lines.push(line.trim_end().to_string());
        }
        Ok(lines)
    }

    /// Delete rows whose profile is not in `retained`; returns the number deleted.
    ///
    /// # Errors
    /// Returns an error when the delete fails.
    pub fn delete_rows_outside_profiles(&self, retained: &[ProfileId]) -> Result<usize> {
        let sql = format!("DELETE FROM favorites WHERE {}", profile_not_in_clause(retained.len()));
        self.conn
            .execute(&sql, params_from_iter(retained.iter().map(|id| id.0)))
            .context("failed to delete rows from unrestored profiles")
    }

    /// # Errors
    /// Returns an error when the update fails.
    pub fn set_restored_flags_all(&self, flags: RestoredFlags) -> Result<usize> {
        self.conn
            .execute("UPDATE favorites SET restored = ?1", params![flags.0])
            .context("failed to mark rows as restored")
    }

    /// # Errors
    /// Returns an error when the update fails.
    pub fn set_restored_flags_for_type(
        &self,
        item_type: ItemType,
        flags: RestoredFlags,
    ) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE favorites SET restored = ?1 WHERE itemType = ?2",
                params![flags.0, item_type.as_i64()],
            )
            .with_context(|| format!("failed to mark {item_type:?} rows as restored"))
    }

    /// Move every row owned by `from` to `to`.
    ///
    /// # Errors
    /// Returns an error when the update fails.
    pub fn migrate_profile_id(&self, from: ProfileId, to: ProfileId) -> Result<usize> {
        debug!(%from, %to, "changing profile user id");
        self.conn
            .execute(
                "UPDATE favorites SET profileId = ?1 WHERE profileId = ?2",
                params![to.0, from.0],
            )
            .with_context(|| format!("failed to migrate profile id {from} to {to}"))
    }

    /// Rebuild the table so the `profileId` column defaults to `default_profile`.
    ///
    /// Columns the restored table shares with the current schema are copied; anything else
    /// the older schema carried is dropped.
    ///
    /// # Errors
    /// Returns an error when any step of the rename/create/copy/drop sequence fails.
    pub fn rewrite_default_profile(&self, default_profile: ProfileId) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "ALTER TABLE {FAVORITES_TABLE} RENAME TO {FAVORITES_STAGING_TABLE};"
            ))
            .context("failed to stage favorites table")?;
        self.conn
            .execute_batch(&create_favorites_sql(FAVORITES_TABLE, default_profile))
            .context("failed to create favorites table with new default")?;

        let staged = table_columns(self.conn, FAVORITES_STAGING_TABLE)?;
        let shared: Vec<&str> = FAVORITES_COLUMNS
            .iter()
            .copied()
            .filter(|column| staged.iter().any(|name| name == column))
            .collect();
        if shared.is_empty() {
            return Err(anyhow!("staged favorites table shares no columns with the schema"));
        }
        let columns = shared.join(", ");

        self.conn
            .execute_batch(&format!(
                "INSERT INTO {FAVORITES_TABLE} ({columns}) SELECT {columns} FROM {FAVORITES_STAGING_TABLE};
                 DROP TABLE IF EXISTS {FAVORITES_STAGING_TABLE};"
            ))
            .context("failed to copy rows into rewritten favorites table")?;
        debug!(%default_profile, "rewrote favorites profileId default");
        Ok(())
    }

    /// Distinct screen indices of desktop rows, ascending.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn distinct_desktop_screens(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT DISTINCT screen FROM favorites
                 WHERE container = ?1 AND screen IS NOT NULL
                 ORDER BY screen",
            )
            .context("failed to prepare screen query")?;
        let screens = stmt
            .query_map(params![CONTAINER_DESKTOP], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read desktop screens")?;
        Ok(screens)
    }

    /// Rewrite desktop screen indices in one statement; unmatched screens keep their value.
    ///
    /// # Errors
    /// Returns an error when the update fails.
    pub fn apply_screen_remap(&self, remap: &ScreenRemap) -> Result<usize> {
        if remap.is_empty() {
            return Ok(0);
        }

        let mut sql = String::from("UPDATE favorites SET screen = CASE");
        let mut values = Vec::with_capacity(remap.entries.len() * 2 + 1);
        for (old, new) in &remap.entries {
            values.push(*old);
            values.push(*new);
            sql.push_str(&format!(" WHEN screen = ?{} THEN ?{}", values.len() - 1, values.len()));
        }
        values.push(CONTAINER_DESKTOP);
        sql.push_str(&format!(" ELSE screen END WHERE container = ?{}", values.len()));

        self.conn
            .execute(&sql, params_from_iter(values))
            .context("failed to remove gaps between screen ids")
    }

    /// Application rows of `profile` whose serialized intent mentions any of `packages`.
    ///
    /// This is a substring match; callers confirm the package after parsing the intent.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn application_rows_mentioning(
        &self,
        profile: ProfileId,
        packages: &[String],
    ) -> Result<Vec<(RowId, String)>> {
        if packages.is_empty() {
            return Ok(Vec::new());
        }

        let clauses = (0..packages.len())
            .map(|index| format!("intent LIKE '%' || ?{} || '%'", index + 3))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT _id, intent FROM favorites
             WHERE itemType = ?1 AND profileId = ?2 AND intent IS NOT NULL AND ({clauses})
             ORDER BY _id"
        );

        let mut values = vec![
            Value::Integer(ItemType::Application.as_i64()),
            Value::Integer(profile.0),
        ];
        values.extend(packages.iter().map(|package| Value::Text(package.clone())));

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare override query")?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok((RowId(row.get(0)?), row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read override candidates")?;
        Ok(rows)
    }

    /// # Errors
    /// Returns an error when the update fails.
    pub fn update_launch_target(&self, row: RowId, profile: ProfileId, intent: &str) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE favorites SET profileId = ?1, intent = ?2 WHERE _id = ?3",
                params![profile.0, intent, row.0],
            )
            .with_context(|| format!("failed to override launch target of row {row}"))
    }

    /// Point widget rows still waiting for a valid id at `new` and clear their id-not-valid bit.
    ///
    /// Rows already rebound no longer carry the bit, so overlapping old/new lists cannot move
    /// a row twice.
    ///
    /// # Errors
    /// Returns an error when the update fails.
    pub fn rebind_widget_id(&self, old: AppWidgetId, new: AppWidgetId) -> Result<usize> {
        let not_valid = RestoredFlags::WIDGET_ID_NOT_VALID.0;
        self.conn
            .execute(
                "UPDATE favorites SET appWidgetId = ?1, restored = restored & ~?2
                 WHERE appWidgetId = ?3 AND itemType = ?4 AND (restored & ?2) != 0",
                params![new.0, not_valid, old.0, ItemType::AppWidget.as_i64()],
            )
            .with_context(|| format!("failed to rebind widget id {old} to {new}"))
    }

    /// Insert one row; an unassigned id lets `SQLite` choose it.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_row(&self, row: &LayoutRow) -> Result<RowId> {
        let id = (row.id != RowId::UNASSIGNED).then_some(row.id.0);
        self.conn
            .execute(
                "INSERT INTO favorites(
                    _id, title, intent, container, screen, cellX, cellY, spanX, spanY,
                    itemType, appWidgetId, appWidgetProvider, restored, profileId, rank
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    id,
                    row.title,
                    row.intent,
                    row.container.as_i64(),
                    row.screen,
                    row.cell_x,
                    row.cell_y,
                    row.span_x,
                    row.span_y,
                    row.item_type.as_i64(),
                    row.app_widget_id.0,
                    row.app_widget_provider,
                    row.restored.0,
                    row.profile_id.0,
                    row.rank,
                ],
            )
            .context("failed to insert favorites row")?;
        Ok(RowId(self.conn.last_insert_rowid()))
    }

    /// # Errors
    /// Returns an error when rows cannot be read.
    pub fn list_rows(&self) -> Result<Vec<LayoutRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                _id, title, profileId, itemType, container, screen, cellX, cellY,
                spanX, spanY, intent, appWidgetId, appWidgetProvider, restored, rank
             FROM favorites
             ORDER BY _id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(LayoutRow {
                    id: RowId(row.get(0)?),
                    title: row.get(1)?,
                    profile_id: ProfileId(row.get::<_, Option<i64>>(2)?.unwrap_or_default()),
                    item_type: ItemType::from_i64(row.get::<_, Option<i64>>(3)?.unwrap_or_default()),
                    container: Container::from_i64(
                        row.get::<_, Option<i64>>(4)?.unwrap_or(CONTAINER_DESKTOP),
                    ),
                    screen: row.get::<_, Option<i64>>(5)?.unwrap_or_default(),
                    cell_x: row.get::<_, Option<i64>>(6)?.unwrap_or_default(),
                    cell_y: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
                    span_x: row.get::<_, Option<i64>>(8)?.unwrap_or(1),
                    span_y: row.get::<_, Option<i64>>(9)?.unwrap_or(1),
                    intent: row.get(10)?,
                    app_widget_id: AppWidgetId(row.get(11)?),
                    app_widget_provider: row.get(12)?,
                    restored: RestoredFlags(row.get(13)?),
                    rank: row.get(14)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read favorites rows")?;
        Ok(rows)
    }

    /// # Errors
    /// Returns an error when the count query fails.
    pub fn row_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get::<_, i64>(0))
            .context("failed to count favorites rows")
    }
}

fn profile_not_in_clause(count: usize) -> String {
    if count == 0 {
        return "1 = 1".to_string();
    }
    let placeholders = (1..=count).map(|index| format!("?{index}")).collect::<Vec<_>>();
    format!("(profileId IS NULL OR profileId NOT IN ({}))", placeholders.join(", "))
}

fn parse_sql_integer(text: &str) -> Option<i64> {
    text.trim().trim_matches(|c| c == '(' || c == ')' || c == '\'').trim().parse().ok()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Real(value) => value.to_string(),
        Value::Text(value) => value.clone(),
        Value::Blob(value) => format!("<{} bytes>", value.len()),
    }
}

fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![table_name],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("failed to check if table exists: {table_name}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("failed to inspect table_info for {table}"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(TABLE_INFO_NAME_COLUMN))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to read columns of {table}"))?;
    Ok(columns)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    if !table_exists(conn, table)? {
        return Ok(false);
    }
    Ok(table_columns(conn, table)?.iter().any(|name| name == column))
}

fn user_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
        .context("failed to list tables")?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read table names")?;
    Ok(tables)
}
