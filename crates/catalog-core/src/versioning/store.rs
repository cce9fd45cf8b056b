//! Version storage layer.
//!
//! Provides SQLite-backed persistence for entity version rows. Each entity
//! type gets its own table; mutations that touch the current row run inside a
//! single transaction so the "exactly one current row" invariant holds even
//! when requests race.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::versioning::{ChangeKind, EntityVersion, VersionedEntity};

/// Shared handle to a SQLite connection.
pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open a SQLite database, creating parent directories as needed.
///
/// The literal path `:memory:` opens a private in-memory database.
pub fn open_connection(path: impl AsRef<Path>) -> CatalogResult<SharedConnection> {
    let path = path.as_ref();
    let conn = if path.to_str() == Some(":memory:") {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Connection::open(path)?
    };
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn lock(conn: &SharedConnection) -> CatalogResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| CatalogError::Internal("database connection lock poisoned".to_string()))
}

/// Timestamps are stored in a fixed-width UTC form so they sort as text.
fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> CatalogResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::database(format!("invalid timestamp '{}': {}", value, e)))
}

/// Trait for entity version storage operations
pub trait VersionStore<T: VersionedEntity>: Send + Sync {
    /// Store the first version of a new entity
    fn insert_initial(&self, version: &EntityVersion<T>) -> CatalogResult<()>;

    /// Get the current version of an entity
    fn get_current(&self, entity_id: Uuid) -> CatalogResult<Option<EntityVersion<T>>>;

    /// Get a specific version by number
    fn get_version(&self, entity_id: Uuid, version: u32)
        -> CatalogResult<Option<EntityVersion<T>>>;

    /// Get all versions of an entity (ordered by version number)
    fn get_all_versions(&self, entity_id: Uuid) -> CatalogResult<Vec<EntityVersion<T>>>;

    /// Get every non-current version (ordered by version number)
    fn get_previous_versions(&self, entity_id: Uuid) -> CatalogResult<Vec<EntityVersion<T>>>;

    /// Get versions whose active interval intersects `[from, to]`
    fn get_versions_in_period(
        &self,
        entity_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CatalogResult<Vec<EntityVersion<T>>>;

    /// Supersede the current version with new business fields
    fn append(
        &self,
        entity_id: Uuid,
        fields: &T,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>>;

    /// Supersede the current version with fields derived from it. `merge`
    /// sees the current fields and runs in the same transaction as the write.
    fn update_with(
        &self,
        entity_id: Uuid,
        merge: Box<dyn FnOnce(&T) -> CatalogResult<T> + '_>,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>>;

    /// Supersede the current version with a copy of `target`'s fields
    fn revert(
        &self,
        entity_id: Uuid,
        target: u32,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>>;

    /// Whether any version of the entity exists
    fn exists(&self, entity_id: Uuid) -> CatalogResult<bool>;

    /// Delete all versions for an entity
    fn delete_versions(&self, entity_id: Uuid) -> CatalogResult<usize>;

    /// Count total version rows in store
    fn count_all(&self) -> CatalogResult<usize>;
}

/// SQLite-backed version store
pub struct SqliteVersionStore<T> {
    conn: SharedConnection,
    _entity: PhantomData<fn() -> T>,
}

impl<T: VersionedEntity> SqliteVersionStore<T> {
    /// Create a new store at the given path
    pub fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        Self::with_connection(open_connection(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> CatalogResult<Self> {
        Self::with_connection(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// Create a store on an existing connection, sharing it with other stores
    pub fn with_connection(conn: SharedConnection) -> CatalogResult<Self> {
        let store = Self {
            conn,
            _entity: PhantomData,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CatalogResult<()> {
        let conn = lock(&self.conn)?;
        let table = T::TABLE;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                fields TEXT NOT NULL,
                is_current INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                superseded_at TEXT,
                change_kind TEXT NOT NULL,
                reverted_from INTEGER,
                UNIQUE(entity_id, version)
            );

            -- At most one current row per entity
            CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_current
                ON {table}(entity_id) WHERE is_current = 1;

            CREATE INDEX IF NOT EXISTS idx_{table}_entity_time
                ON {table}(entity_id, created_at);
        "#
        ))?;
        Ok(())
    }

    fn select_columns() -> String {
        format!(
            "SELECT entity_id, version, fields, is_current, created_at, superseded_at, \
             change_kind, reverted_from FROM {}",
            T::TABLE
        )
    }

    fn row_to_version(row: &rusqlite::Row<'_>) -> CatalogResult<EntityVersion<T>> {
        let entity_id: String = row.get(0)?;
        let version: u32 = row.get(1)?;
        let fields: String = row.get(2)?;
        let is_current: bool = row.get(3)?;
        let created_at: String = row.get(4)?;
        let superseded_at: Option<String> = row.get(5)?;
        let change_kind: String = row.get(6)?;
        let reverted_from: Option<u32> = row.get(7)?;

        Ok(EntityVersion {
            entity_id: Uuid::parse_str(&entity_id)
                .map_err(|e| CatalogError::database(format!("invalid entity id: {}", e)))?,
            version,
            fields: serde_json::from_str(&fields)?,
            is_current,
            created_at: parse_ts(&created_at)?,
            superseded_at: superseded_at.as_deref().map(parse_ts).transpose()?,
            change: ChangeKind::parse(&change_kind).ok_or_else(|| {
                CatalogError::database(format!("invalid change kind '{}'", change_kind))
            })?,
            reverted_from,
        })
    }

    fn query_many(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> CatalogResult<Vec<EntityVersion<T>>> {
        let mut stmt = conn.prepare(sql)?;
        let results = stmt.query_map(params, |row| Ok(Self::row_to_version(row)))?;

        results
            .map(|r| r.map_err(CatalogError::from).and_then(|inner| inner))
            .collect()
    }

    fn query_one(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> CatalogResult<Option<EntityVersion<T>>> {
        let mut stmt = conn.prepare(sql)?;
        stmt.query_row(params, |row| Ok(Self::row_to_version(row)))
            .optional()?
            .transpose()
    }

    fn insert_row(conn: &Connection, version: &EntityVersion<T>) -> CatalogResult<()> {
        let fields = serde_json::to_string(&version.fields)?;
        conn.execute(
            &format!(
                r#"INSERT INTO {}
                   (entity_id, version, fields, is_current, created_at, superseded_at,
                    change_kind, reverted_from)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                T::TABLE
            ),
            params![
                version.entity_id.to_string(),
                version.version,
                fields,
                version.is_current,
                format_ts(version.created_at),
                version.superseded_at.map(format_ts),
                version.change.as_str(),
                version.reverted_from,
            ],
        )?;
        Ok(())
    }

    /// Mark the current row superseded and insert its successor. Must run
    /// inside the caller's transaction.
    fn supersede(
        tx: &Transaction<'_>,
        entity_id: Uuid,
        fields: T,
        change: ChangeKind,
        reverted_from: Option<u32>,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>> {
        let max_version: Option<u32> = tx.query_row(
            &format!(
                "SELECT MAX(version) FROM {} WHERE entity_id = ?1",
                T::TABLE
            ),
            params![entity_id.to_string()],
            |row| row.get(0),
        )?;
        let max_version =
            max_version.ok_or_else(|| CatalogError::not_found(T::ENTITY_NAME, entity_id))?;

        tx.execute(
            &format!(
                "UPDATE {} SET is_current = 0, superseded_at = ?2 \
                 WHERE entity_id = ?1 AND is_current = 1",
                T::TABLE
            ),
            params![entity_id.to_string(), format_ts(at)],
        )?;

        let next = EntityVersion {
            entity_id,
            version: max_version + 1,
            fields,
            is_current: true,
            created_at: at,
            superseded_at: None,
            change,
            reverted_from,
        };
        Self::insert_row(tx, &next)?;
        Ok(next)
    }
}

impl<T: VersionedEntity> VersionStore<T> for SqliteVersionStore<T> {
    fn insert_initial(&self, version: &EntityVersion<T>) -> CatalogResult<()> {
        let conn = lock(&self.conn)?;
        let existing: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE entity_id = ?1", T::TABLE),
            params![version.entity_id.to_string()],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(CatalogError::validation(format!(
                "{} with id '{}' already exists",
                T::ENTITY_NAME,
                version.entity_id
            )));
        }

        Self::insert_row(&conn, version)?;
        debug!(table = T::TABLE, entity_id = %version.entity_id, "Inserted initial version");
        Ok(())
    }

    fn get_current(&self, entity_id: Uuid) -> CatalogResult<Option<EntityVersion<T>>> {
        let conn = lock(&self.conn)?;
        Self::query_one(
            &conn,
            &format!(
                "{} WHERE entity_id = ?1 AND is_current = 1",
                Self::select_columns()
            ),
            params![entity_id.to_string()],
        )
    }

    fn get_version(
        &self,
        entity_id: Uuid,
        version: u32,
    ) -> CatalogResult<Option<EntityVersion<T>>> {
        let conn = lock(&self.conn)?;
        Self::query_one(
            &conn,
            &format!(
                "{} WHERE entity_id = ?1 AND version = ?2",
                Self::select_columns()
            ),
            params![entity_id.to_string(), version],
        )
    }

    fn get_all_versions(&self, entity_id: Uuid) -> CatalogResult<Vec<EntityVersion<T>>> {
        let conn = lock(&self.conn)?;
        Self::query_many(
            &conn,
            &format!(
                "{} WHERE entity_id = ?1 ORDER BY version ASC",
                Self::select_columns()
            ),
            params![entity_id.to_string()],
        )
    }

    fn get_previous_versions(&self, entity_id: Uuid) -> CatalogResult<Vec<EntityVersion<T>>> {
        let conn = lock(&self.conn)?;
        Self::query_many(
            &conn,
            &format!(
                "{} WHERE entity_id = ?1 AND is_current = 0 ORDER BY version ASC",
                Self::select_columns()
            ),
            params![entity_id.to_string()],
        )
    }

    fn get_versions_in_period(
        &self,
        entity_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CatalogResult<Vec<EntityVersion<T>>> {
        let conn = lock(&self.conn)?;
        // The first ten characters of a stored timestamp are its UTC date.
        Self::query_many(
            &conn,
            &format!(
                "{} WHERE entity_id = ?1 \
                   AND substr(created_at, 1, 10) <= ?3 \
                   AND (superseded_at IS NULL OR substr(superseded_at, 1, 10) >= ?2) \
                 ORDER BY version ASC",
                Self::select_columns()
            ),
            params![
                entity_id.to_string(),
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string(),
            ],
        )
    }

    fn append(
        &self,
        entity_id: Uuid,
        fields: &T,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let next = Self::supersede(&tx, entity_id, fields.clone(), ChangeKind::Updated, None, at)?;
        tx.commit()?;

        debug!(table = T::TABLE, entity_id = %entity_id, version = next.version, "Appended version");
        Ok(next)
    }

    fn update_with(
        &self,
        entity_id: Uuid,
        merge: Box<dyn FnOnce(&T) -> CatalogResult<T> + '_>,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let current = Self::query_one(
            &tx,
            &format!(
                "{} WHERE entity_id = ?1 AND is_current = 1",
                Self::select_columns()
            ),
            params![entity_id.to_string()],
        )?
        .ok_or_else(|| CatalogError::not_found(T::ENTITY_NAME, entity_id))?;

        // An error from merge drops the transaction, rolling it back.
        let fields = merge(&current.fields)?;
        let next = Self::supersede(&tx, entity_id, fields, ChangeKind::Updated, None, at)?;
        tx.commit()?;

        debug!(
            table = T::TABLE,
            entity_id = %entity_id,
            from = current.version,
            version = next.version,
            "Merged version"
        );
        Ok(next)
    }

    fn revert(
        &self,
        entity_id: Uuid,
        target: u32,
        at: DateTime<Utc>,
    ) -> CatalogResult<EntityVersion<T>> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let source = Self::query_one(
            &tx,
            &format!(
                "{} WHERE entity_id = ?1 AND version = ?2",
                Self::select_columns()
            ),
            params![entity_id.to_string(), target],
        )?
        .ok_or_else(|| CatalogError::NotFound {
            message: format!(
                "{} with id '{}' has no version {}",
                T::ENTITY_NAME,
                entity_id,
                target
            ),
            entity_id: Some(entity_id.to_string()),
        })?;

        let next = Self::supersede(
            &tx,
            entity_id,
            source.fields,
            ChangeKind::Reverted,
            Some(target),
            at,
        )?;
        tx.commit()?;

        debug!(
            table = T::TABLE,
            entity_id = %entity_id,
            from = target,
            version = next.version,
            "Reverted version"
        );
        Ok(next)
    }

    fn exists(&self, entity_id: Uuid) -> CatalogResult<bool> {
        let conn = lock(&self.conn)?;
        let found: Option<i64> = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE entity_id = ?1 LIMIT 1", T::TABLE),
                params![entity_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn delete_versions(&self, entity_id: Uuid) -> CatalogResult<usize> {
        let conn = lock(&self.conn)?;
        let count = conn.execute(
            &format!("DELETE FROM {} WHERE entity_id = ?1", T::TABLE),
            params![entity_id.to_string()],
        )?;
        Ok(count)
    }

    fn count_all(&self) -> CatalogResult<usize> {
        let conn = lock(&self.conn)?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", T::TABLE), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::{Duration, TimeZone};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    impl VersionedEntity for Note {
        const ENTITY_NAME: &'static str = "Note";
        const TABLE: &'static str = "note_versions";
    }

    fn note(text: &str) -> Note {
        Note {
            text: text.to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded(texts: &[&str]) -> (SqliteVersionStore<Note>, Uuid) {
        let store = SqliteVersionStore::<Note>::in_memory().unwrap();
        let first = EntityVersion::initial(note(texts[0]), t0());
        store.insert_initial(&first).unwrap();
        for (i, text) in texts.iter().enumerate().skip(1) {
            store
                .append(first.entity_id, &note(text), t0() + Duration::days(i as i64))
                .unwrap();
        }
        (store, first.entity_id)
    }

    fn current_count(store: &SqliteVersionStore<Note>, id: Uuid) -> usize {
        store
            .get_all_versions(id)
            .unwrap()
            .iter()
            .filter(|v| v.is_current)
            .count()
    }

    #[test]
    fn test_insert_and_get_current() {
        let (store, id) = seeded(&["v0"]);

        let current = store.get_current(id).unwrap().unwrap();
        assert_eq!(current.version, 0);
        assert_eq!(current.fields, note("v0"));
        assert_eq!(current.created_at, t0());
        assert_eq!(current.change, ChangeKind::Created);
        assert!(store.get_current(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_insert_twice_is_rejected() {
        let store = SqliteVersionStore::<Note>::in_memory().unwrap();
        let first = EntityVersion::initial(note("a"), t0());
        store.insert_initial(&first).unwrap();
        let err = store.insert_initial(&first).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_append_supersedes_current() {
        let (store, id) = seeded(&["v0", "v1", "v2"]);

        let all = store.get_all_versions(id).unwrap();
        assert_eq!(all.iter().map(|v| v.version).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(current_count(&store, id), 1);
        assert!(all[2].is_current);
        assert_eq!(all[0].superseded_at, Some(t0() + Duration::days(1)));
        assert_eq!(all[1].superseded_at, Some(t0() + Duration::days(2)));
        assert!(all[2].superseded_at.is_none());
    }

    #[test]
    fn test_append_unknown_entity() {
        let store = SqliteVersionStore::<Note>::in_memory().unwrap();
        let err = store.append(Uuid::new_v4(), &note("x"), t0()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_previous_versions_exclude_current() {
        let (store, id) = seeded(&["v0", "v1", "v2"]);

        let previous = store.get_previous_versions(id).unwrap();
        assert_eq!(previous.iter().map(|v| v.version).collect::<Vec<_>>(), vec![0, 1]);
        assert!(previous.iter().all(|v| !v.is_current));
    }

    #[test]
    fn test_revert_copies_fields_forward() {
        let (store, id) = seeded(&["v0", "v1", "v2"]);

        let reverted = store.revert(id, 0, t0() + Duration::days(10)).unwrap();
        assert_eq!(reverted.version, 3);
        assert!(reverted.is_current);
        assert_eq!(reverted.fields, note("v0"));
        assert_eq!(reverted.change, ChangeKind::Reverted);
        assert_eq!(reverted.reverted_from, Some(0));

        let all = store.get_all_versions(id).unwrap();
        assert!(all[..3].iter().all(|v| !v.is_current));
        assert_eq!(store.get_current(id).unwrap().unwrap(), reverted);
    }

    #[test]
    fn test_revert_repeated_keeps_fields_and_bumps_version() {
        let (store, id) = seeded(&["v0", "v1"]);

        let first = store.revert(id, 0, t0() + Duration::days(5)).unwrap();
        let second = store.revert(id, 0, t0() + Duration::days(6)).unwrap();
        assert_eq!(first.fields, second.fields);
        assert_eq!(second.version, first.version + 1);
        assert_eq!(current_count(&store, id), 1);
    }

    #[test]
    fn test_revert_to_current_still_creates_version() {
        let (store, id) = seeded(&["v0", "v1"]);
        let reverted = store.revert(id, 1, t0() + Duration::days(3)).unwrap();
        assert_eq!(reverted.version, 2);
        assert_eq!(reverted.fields, note("v1"));
    }

    #[test]
    fn test_revert_missing_version() {
        let (store, id) = seeded(&["v0"]);
        let err = store.revert(id, 7, t0()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // Nothing changed.
        assert_eq!(store.get_all_versions(id).unwrap().len(), 1);
        assert_eq!(current_count(&store, id), 1);
    }

    #[test]
    fn test_versions_in_period() {
        // v0 active Mar 1 - Mar 2, v1 Mar 2 - Mar 3, v2 Mar 3 - open.
        let (store, id) = seeded(&["v0", "v1", "v2"]);

        let versions = |from, to| {
            store
                .get_versions_in_period(id, from, to)
                .unwrap()
                .into_iter()
                .map(|v| v.version)
                .collect::<Vec<_>>()
        };

        assert_eq!(versions(date(2024, 2, 1), date(2024, 2, 28)), Vec::<u32>::new());
        assert_eq!(versions(date(2024, 3, 1), date(2024, 3, 1)), vec![0]);
        assert_eq!(versions(date(2024, 3, 2), date(2024, 3, 2)), vec![0, 1]);
        assert_eq!(versions(date(2024, 3, 4), date(2025, 1, 1)), vec![2]);
        assert_eq!(versions(date(2024, 1, 1), date(2030, 1, 1)), vec![0, 1, 2]);
    }

    #[test]
    fn test_period_query_matches_in_memory_rule() {
        let (store, id) = seeded(&["v0", "v1", "v2", "v3"]);
        let all = store.get_all_versions(id).unwrap();
        let from = date(2024, 3, 2);
        let to = date(2024, 3, 3);

        let expected: Vec<u32> = all
            .iter()
            .filter(|v| v.active_during(from, to))
            .map(|v| v.version)
            .collect();
        let actual: Vec<u32> = store
            .get_versions_in_period(id, from, to)
            .unwrap()
            .iter()
            .map(|v| v.version)
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_delete_versions() {
        let (store, id) = seeded(&["v0", "v1"]);
        assert!(store.exists(id).unwrap());
        assert_eq!(store.delete_versions(id).unwrap(), 2);
        assert!(!store.exists(id).unwrap());
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_reverts_serialize() {
        let (store, id) = seeded(&["v0", "v1", "v2"]);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .revert(id, i % 3, t0() + Duration::days(20))
                        .unwrap()
                        .version
                })
            })
            .collect();

        let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (3..11).collect::<Vec<_>>());
        assert_eq!(current_count(&store, id), 1);
        assert_eq!(store.get_current(id).unwrap().unwrap().version, 10);
    }

    #[test]
    fn test_update_with_merges_from_current() {
        let (store, id) = seeded(&["v0"]);
        let next = store
            .update_with(
                id,
                Box::new(|current: &Note| -> CatalogResult<Note> {
                    Ok(note(&format!("{}+", current.text)))
                }),
                t0() + Duration::days(1),
            )
            .unwrap();
        assert_eq!(next.version, 1);
        assert_eq!(next.fields, note("v0+"));
        assert_eq!(next.change, ChangeKind::Updated);
    }

    #[test]
    fn test_update_with_rolls_back_on_merge_error() {
        let (store, id) = seeded(&["v0"]);
        let err = store
            .update_with(
                id,
                Box::new(|_: &Note| -> CatalogResult<Note> {
                    Err(CatalogError::validation("rejected"))
                }),
                t0(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(store.count_all().unwrap(), 1);
        assert_eq!(current_count(&store, id), 1);

        let err = store
            .update_with(
                Uuid::new_v4(),
                Box::new(|n: &Note| -> CatalogResult<Note> { Ok(n.clone()) }),
                t0(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_merges_lose_nothing() {
        let (store, id) = seeded(&[""]);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .update_with(
                            id,
                            Box::new(|current: &Note| -> CatalogResult<Note> {
                                Ok(note(&format!("{}x", current.text)))
                            }),
                            t0() + Duration::days(1),
                        )
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let current = store.get_current(id).unwrap().unwrap();
        assert_eq!(current.version, 8);
        assert_eq!(current.fields.text, "x".repeat(8));
        assert_eq!(current_count(&store, id), 1);
    }

    #[test]
    fn test_unknown_change_kind_is_reported() {
        let (store, id) = seeded(&["v0"]);
        lock(&store.conn)
            .unwrap()
            .execute(
                "UPDATE note_versions SET change_kind = 'renamed' WHERE entity_id = ?1",
                params![id.to_string()],
            )
            .unwrap();

        let err = store.get_current(id).unwrap_err();
        assert!(matches!(err, CatalogError::Database { .. }));
        assert!(err.to_string().contains("renamed"));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.db");

        let id = {
            let store = SqliteVersionStore::<Note>::new(&path).unwrap();
            let first = EntityVersion::initial(note("persisted"), t0());
            store.insert_initial(&first).unwrap();
            first.entity_id
        };

        let reopened = SqliteVersionStore::<Note>::new(&path).unwrap();
        assert_eq!(
            reopened.get_current(id).unwrap().unwrap().fields,
            note("persisted")
        );
    }
}
