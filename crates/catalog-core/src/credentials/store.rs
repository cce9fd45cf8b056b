//! SQLite persistence for client credentials.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::credentials::{Application, Client};
use crate::error::{CatalogError, CatalogResult};
use crate::versioning::{lock, open_connection, SharedConnection};

/// Trait for client credential storage
pub trait ClientStore: Send + Sync {
    fn insert(&self, client: &Client) -> CatalogResult<()>;

    fn get(&self, id: Uuid) -> CatalogResult<Option<Client>>;
}

/// SQLite-backed client store
pub struct SqliteClientStore {
    conn: SharedConnection,
}

impl SqliteClientStore {
    pub fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        Self::with_connection(open_connection(path)?)
    }

    pub fn in_memory() -> CatalogResult<Self> {
        Self::with_connection(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    pub fn with_connection(conn: SharedConnection) -> CatalogResult<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CatalogResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id TEXT PRIMARY KEY,
                firstname TEXT NOT NULL,
                lastname TEXT,
                email TEXT NOT NULL,
                application TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    fn row_to_client(row: &rusqlite::Row<'_>) -> CatalogResult<Client> {
        let id: String = row.get(0)?;
        let application: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(Client {
            id: Uuid::parse_str(&id)
                .map_err(|e| CatalogError::database(format!("invalid client id: {}", e)))?,
            firstname: row.get(1)?,
            lastname: row.get(2)?,
            email: row.get(3)?,
            application: application.parse::<Application>().map_err(|_| {
                CatalogError::database(format!("unknown stored application '{}'", application))
            })?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CatalogError::database(e.to_string()))?,
        })
    }
}

impl ClientStore for SqliteClientStore {
    fn insert(&self, client: &Client) -> CatalogResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            r#"INSERT INTO clients (id, firstname, lastname, email, application, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                client.id.to_string(),
                client.firstname,
                client.lastname,
                client.email,
                client.application.as_ref(),
                client
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: Uuid) -> CatalogResult<Option<Client>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            r#"SELECT id, firstname, lastname, email, application, created_at
               FROM clients WHERE id = ?1"#,
        )?;

        stmt.query_row(params![id.to_string()], |row| Ok(Self::row_to_client(row)))
            .optional()?
            .transpose()
    }
}
