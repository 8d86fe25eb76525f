//! Destination stores.
//!
//! The loader talks to a [`Store`] obtained from a [`StoreConnector`]; [`SqliteConnector`]
//! is the built-in implementation. A store reports the bound-parameter limit as
//! [`StoreError::TooManyParameters`] so the loader can fall back to smaller batches.

use std::path::{Path, PathBuf};

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::schema::{quote_ident, TableSchema};
use crate::types::Value;

/// Where a load writes: a database file and a table inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub database: PathBuf,
    pub table: String,
}

impl Destination {
    pub fn new(database: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }
}

/// A parameterized multi-row insert into fixed columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
}

impl InsertStatement {
    /// Insert statement for every column of `schema`, in schema order.
    pub fn for_schema(table: impl Into<String>, schema: &TableSchema) -> Self {
        Self {
            table: table.into(),
            columns: schema.canonical_names().map(str::to_owned).collect(),
        }
    }

    /// Parameters bound by a statement covering `rows` rows.
    pub fn parameter_count(&self, rows: usize) -> usize {
        rows * self.columns.len()
    }

    /// `INSERT INTO "t" ("a", "b") VALUES (?, ?), (?, ?)` for `rows` rows.
    pub fn sql(&self, rows: usize) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let tuple = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = vec![tuple.as_str(); rows.max(1)].join(", ");
        format!(
            "INSERT INTO {} ({columns}) VALUES {values}",
            quote_ident(&self.table)
        )
    }
}

/// `DROP TABLE IF EXISTS` followed by `CREATE TABLE` for `schema`.
pub fn create_table_sql(table: &str, schema: &TableSchema) -> [String; 2] {
    let columns = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.canonical_name), c.storage_type))
        .collect::<Vec<_>>()
        .join(", ");
    [
        format!("DROP TABLE IF EXISTS {}", quote_ident(table)),
        format!("CREATE TABLE {} ({columns})", quote_ident(table)),
    ]
}

/// An open connection to a destination.
pub trait Store: Send {
    /// Execute one statement without parameters.
    fn execute(&mut self, sql: &str) -> StoreResult<()>;

    /// Insert `rows` (each in `insert.columns` order) with one parameterized statement.
    fn execute_many(&mut self, insert: &InsertStatement, rows: &[Vec<Value>]) -> StoreResult<()>;

    /// Make everything executed since the last commit durable.
    fn commit(&mut self) -> StoreResult<()>;

    fn close(self: Box<Self>) -> StoreResult<()>;
}

/// Opens [`Store`]s; shared across threads by the loader.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, destination: &Destination) -> StoreResult<Box<dyn Store>>;
}

/// Connection settings for [`SqliteConnector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    pub journal_mode: String,
    pub synchronous: String,
    pub cache_size: i64,
    /// Refuse statements binding more parameters than this, the way an engine built with a
    /// lower variable limit would. `None` leaves the limit to SQLite.
    pub max_variables: Option<usize>,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            cache_size: 10_000,
            max_variables: None,
        }
    }
}

/// Connector for SQLite database files.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    options: SqliteOptions,
}

impl SqliteConnector {
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }
}

impl StoreConnector for SqliteConnector {
    fn connect(&self, destination: &Destination) -> StoreResult<Box<dyn Store>> {
        Ok(Box::new(SqliteStore::open(&destination.database, &self.options)?))
    }
}

/// A SQLite connection with write-friendly pragmas and lazily opened transactions.
pub struct SqliteStore {
    conn: Connection,
    in_transaction: bool,
    max_variables: Option<usize>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, options: &SqliteOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(map_sqlite_error)?;

        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", options.journal_mode.as_str(), |row| {
                row.get(0)
            })
            .map_err(map_sqlite_error)?;
        conn.pragma_update(None, "synchronous", options.synchronous.as_str())
            .map_err(map_sqlite_error)?;
        conn.pragma_update(None, "cache_size", options.cache_size)
            .map_err(map_sqlite_error)?;
        debug!(path = %path.display(), %journal_mode, "sqlite store opened");

        Ok(Self {
            conn,
            in_transaction: false,
            max_variables: options.max_variables,
        })
    }

    /// Names of the user tables in the database, sorted.
    pub fn list_tables(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(map_sqlite_error)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(map_sqlite_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)?;
        Ok(names)
    }

    /// Borrow the underlying connection, e.g. to query a loaded table.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN").map_err(map_sqlite_error)?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Store for SqliteStore {
    fn execute(&mut self, sql: &str) -> StoreResult<()> {
        self.begin()?;
        self.conn.execute_batch(sql).map_err(map_sqlite_error)
    }

    fn execute_many(&mut self, insert: &InsertStatement, rows: &[Vec<Value>]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let params = insert.parameter_count(rows.len());
        if let Some(limit) = self.max_variables.filter(|limit| params > *limit) {
            return Err(StoreError::TooManyParameters {
                message: format!("{params} parameters exceed the limit of {limit}"),
            });
        }
        self.begin()?;
        let mut stmt = self
            .conn
            .prepare(&insert.sql(rows.len()))
            .map_err(map_sqlite_error)?;
        stmt.execute(rusqlite::params_from_iter(rows.iter().flatten()))
            .map_err(map_sqlite_error)?;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT").map_err(map_sqlite_error)?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> StoreResult<()> {
        let SqliteStore { conn, .. } = *self;
        conn.close().map_err(|(_, e)| map_sqlite_error(e))
    }
}

/// Open `database` and list its tables.
pub fn list_tables(database: impl AsRef<Path>) -> StoreResult<Vec<String>> {
    SqliteStore::open(database, &SqliteOptions::default())?.list_tables()
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Int64(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Float64(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("too many SQL variables") {
        StoreError::TooManyParameters { message }
    } else {
        StoreError::Backend { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, StorageType};

    fn schema() -> TableSchema {
        TableSchema::from_columns(vec![
            ColumnSchema::new("Id", StorageType::Integer),
            ColumnSchema::new("Full Name", StorageType::Text),
        ])
    }

    #[test]
    fn insert_sql_has_one_tuple_per_row() {
        let insert = InsertStatement::for_schema("people", &schema());
        assert_eq!(
            insert.sql(2),
            r#"INSERT INTO "people" ("Id", "Full_Name") VALUES (?, ?), (?, ?)"#
        );
        assert_eq!(insert.parameter_count(3), 6);
    }

    #[test]
    fn ddl_quotes_identifiers() {
        let [drop, create] = create_table_sql("my table", &schema());
        assert_eq!(drop, r#"DROP TABLE IF EXISTS "my table""#);
        assert_eq!(create, r#"CREATE TABLE "my table" ("Id" INTEGER, "Full_Name" TEXT)"#);
    }

    #[test]
    fn sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("t.db");
        let mut store = SqliteStore::open(&db, &SqliteOptions::default()).unwrap();
        for sql in create_table_sql("people", &schema()) {
            store.execute(&sql).unwrap();
        }
        let insert = InsertStatement::for_schema("people", &schema());
        store
            .execute_many(
                &insert,
                &[
                    vec![Value::Int64(1), Value::text("Ana")],
                    vec![Value::Null, Value::Null],
                ],
            )
            .unwrap();
        store.commit().unwrap();

        let count: i64 = store
            .connection()
            .query_row(r#"SELECT COUNT(*) FROM "people""#, [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.list_tables().unwrap(), vec!["people".to_string()]);
        Box::new(store).close().unwrap();
    }

    #[test]
    fn variable_limit_is_reported_as_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let options = SqliteOptions {
            max_variables: Some(3),
            ..SqliteOptions::default()
        };
        let mut store = SqliteStore::open(dir.path().join("t.db"), &options).unwrap();
        let insert = InsertStatement::for_schema("people", &schema());
        let err = store
            .execute_many(&insert, &vec![vec![Value::Int64(1), Value::Null]; 2])
            .unwrap_err();
        assert!(err.is_capacity());
    }
}
