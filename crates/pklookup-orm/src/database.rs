//! SQLite execution
//!
//! Wraps a lazily connecting sqlx pool. Each new physical connection issues
//! `PRAGMA foreign_keys=ON;` once, and every statement sent through the
//! [`Database`] is recorded in its [`QueryLog`].

use std::str::FromStr;
use std::time::Duration;

use pklookup_query::{Value, ValueType};
use sqlx::Row as _;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::compiler::BoundQuery;
use crate::error::Result;
use crate::log::QueryLog;
use crate::settings::DatabaseSettings;
use crate::shape::EntityShape;

/// Pragma issued on every new connection when foreign keys are enabled
pub const FOREIGN_KEYS_PRAGMA: &str = "PRAGMA foreign_keys=ON;";

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// Handle to a SQLite database
#[derive(Debug, Clone)]
pub struct Database {
	pool: SqlitePool,
	log: QueryLog,
}

impl Database {
	/// Build a pool from `settings`; no connection is opened until first use
	///
	/// Must be called from within a tokio runtime.
	pub fn connect(settings: &DatabaseSettings, log: QueryLog) -> Result<Self> {
		let options = SqliteConnectOptions::from_str(&settings.url)?
			.create_if_missing(settings.create_if_missing)
			.foreign_keys(false)
			.busy_timeout(Duration::from_millis(settings.busy_timeout_ms));

		let enable_foreign_keys = settings.foreign_keys;
		let pragma_log = log.clone();
		let pool = SqlitePoolOptions::new()
			.min_connections(0)
			.max_connections(settings.max_connections)
			.after_connect(move |conn, _meta| {
				let log = pragma_log.clone();
				Box::pin(async move {
					if enable_foreign_keys {
						log.record(FOREIGN_KEYS_PRAGMA);
						sqlx::query(FOREIGN_KEYS_PRAGMA).execute(&mut *conn).await?;
					}
					Ok(())
				})
			})
			.connect_lazy_with(options);

		tracing::debug!(url = %settings.url, foreign_keys = enable_foreign_keys, "configured sqlite pool");
		Ok(Self { pool, log })
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	pub fn log(&self) -> &QueryLog {
		&self.log
	}

	/// Execute a statement that returns no rows
	pub async fn execute(&self, sql: &str) -> Result<u64> {
		let mut conn = self.pool.acquire().await?;
		self.log.record(sql);
		let result = sqlx::query(sql).execute(&mut *conn).await?;
		Ok(result.rows_affected())
	}

	/// Run a bound lookup, returning at most one row
	///
	/// The connection is acquired before the statement is recorded so that
	/// the pragma of a fresh connection precedes it in the log.
	pub async fn fetch_optional(&self, bound: &BoundQuery) -> Result<Option<SqliteRow>> {
		let mut conn = self.pool.acquire().await?;
		self.log.record(bound.logged_sql());

		let mut query = sqlx::query(bound.sql());
		for value in bound.values() {
			query = bind_value(query, value);
		}
		Ok(query.fetch_optional(&mut *conn).await?)
	}

	/// Close the pool, waiting for connections to be released
	pub async fn close(&self) {
		self.pool.close().await;
	}
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
	match value {
		Value::Bool(b) => query.bind(*b),
		Value::Int(i) => query.bind(*i),
		Value::BigInt(i) => query.bind(*i),
		Value::Double(f) => query.bind(*f),
		Value::String(s) => query.bind(s.as_deref().map(String::as_str)),
		Value::Bytes(b) => query.bind(b.as_deref().map(Vec::as_slice)),
	}
}

/// Decode a row selected by a compiled lookup of `shape`
///
/// Values are returned in projection order.
pub(crate) fn decode_row(row: &SqliteRow, shape: &EntityShape) -> Result<Vec<Value>> {
	shape
		.columns()
		.iter()
		.enumerate()
		.map(|(index, column)| -> Result<Value> {
			let value = match column.value_type() {
				ValueType::Boolean => Value::Bool(row.try_get(index)?),
				ValueType::Integer => Value::BigInt(row.try_get(index)?),
				ValueType::Real => Value::Double(row.try_get(index)?),
				ValueType::Text => Value::String(row.try_get::<Option<String>, _>(index)?.map(Box::new)),
				ValueType::Blob => Value::Bytes(row.try_get::<Option<Vec<u8>>, _>(index)?.map(Box::new)),
			};
			Ok(value)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn memory() -> Database {
		Database::connect(&DatabaseSettings::default(), QueryLog::new()).unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_pragma_logged_once_per_connection() {
		let db = memory();

		db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").await.unwrap();
		db.execute("INSERT INTO t (id) VALUES (1)").await.unwrap();

		assert_eq!(
			db.log().statements(),
			vec![
				FOREIGN_KEYS_PRAGMA.to_string(),
				"CREATE TABLE t (id INTEGER PRIMARY KEY)".to_string(),
				"INSERT INTO t (id) VALUES (1)".to_string(),
			]
		);
		db.close().await;
	}

	#[rstest]
	#[tokio::test]
	async fn test_foreign_keys_disabled() {
		let settings = DatabaseSettings {
			foreign_keys: false,
			..DatabaseSettings::default()
		};
		let db = Database::connect(&settings, QueryLog::new()).unwrap();

		db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").await.unwrap();

		assert_eq!(db.log().len(), 1);
		db.close().await;
	}

	#[rstest]
	#[tokio::test]
	async fn test_foreign_keys_enforced() {
		let db = memory();
		db.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)").await.unwrap();
		db.execute("CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id))")
			.await
			.unwrap();

		let result = db.execute("INSERT INTO child (id, parent_id) VALUES (1, 42)").await;

		assert!(matches!(result, Err(crate::LookupError::Database(_))));
		db.close().await;
	}
}
