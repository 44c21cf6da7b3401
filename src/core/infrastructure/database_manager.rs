use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::log::database::DatabaseLog;
use macros::log;
use sqlx::Row;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::DatabaseConnectFailed)?
            .create_if_missing(true)
            .foreign_keys(true);
        // An in-memory database lives and dies with its single connection.
        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(DatabaseError::DatabaseConnectFailed)?;
        log!(DatabaseLog::DatabaseConnectSuccess);

        let database_manager = Self { pool };
        database_manager.create_tables().await?;
        Ok(database_manager)
    }

    pub async fn in_memory() -> Result<Self, Error> {
        Self::new("sqlite::memory:").await
    }

    pub fn get_pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    pub async fn close_connection(&self) {
        self.pool.close().await
    }

    pub async fn exist_table(&self, table_name: &str) -> bool {
        let pool = self.get_pool();
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(&pool)
        .await
        .unwrap_or(false)
    }

    async fn create_tables(&self) -> Result<(), Error> {
        let tables = [
            ("Targets", CREATE_TARGETS),
            ("Schedules", CREATE_SCHEDULES),
            ("Backups", CREATE_BACKUPS),
        ];
        let pool = self.get_pool();
        for (name, statement) in tables {
            if self.exist_table(name).await {
                continue;
            }
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(DatabaseError::StatementExecutionFailed)?;
            log!(DatabaseLog::TableCreated { table: name.to_string() });
        }
        Ok(())
    }
}

pub(crate) fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, Error> {
    let bytes: Vec<u8> = row
        .try_get(column)
        .map_err(DatabaseError::StatementExecutionFailed)?;
    Ok(Uuid::from_slice(&bytes).map_err(|_| DatabaseError::DataCorrupted)?)
}

pub(crate) fn optional_uuid_column(row: &SqliteRow, column: &str) -> Result<Option<Uuid>, Error> {
    let bytes: Option<Vec<u8>> = row
        .try_get(column)
        .map_err(DatabaseError::StatementExecutionFailed)?;
    match bytes {
        Some(bytes) => Ok(Some(
            Uuid::from_slice(&bytes).map_err(|_| DatabaseError::DataCorrupted)?,
        )),
        None => Ok(None),
    }
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, Error>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    Ok(row
        .try_get(column)
        .map_err(DatabaseError::StatementExecutionFailed)?)
}

const CREATE_TARGETS: &str = r#"
    CREATE TABLE Targets (
        uuid BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        destination TEXT NOT NULL,
        credentials TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_SCHEDULES: &str = r#"
    CREATE TABLE Schedules (
        uuid BLOB PRIMARY KEY,
        name TEXT NOT NULL,
        source_path TEXT NOT NULL,
        days_of_week TEXT NOT NULL,
        time_of_day TEXT NOT NULL,
        is_active INTEGER NOT NULL,
        target_uuid BLOB NOT NULL REFERENCES Targets(uuid) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const CREATE_BACKUPS: &str = r#"
    CREATE TABLE Backups (
        uuid BLOB PRIMARY KEY,
        source_path TEXT NOT NULL,
        status TEXT NOT NULL,
        size INTEGER NOT NULL,
        error_message TEXT,
        created_at TEXT NOT NULL,
        completed_at TEXT,
        schedule_uuid BLOB REFERENCES Schedules(uuid) ON DELETE CASCADE,
        target_uuid BLOB NOT NULL REFERENCES Targets(uuid) ON DELETE CASCADE
    )
"#;
