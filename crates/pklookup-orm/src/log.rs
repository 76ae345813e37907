//! Capture of issued SQL

use std::sync::Arc;

use parking_lot::Mutex;

/// Tracing target every recorded statement is emitted under
pub const SQL_TARGET: &str = "pklookup::sql";

/// Shared, clonable log of the SQL statements sent to the database
///
/// ```rust
/// use pklookup_orm::QueryLog;
///
/// let log = QueryLog::new();
/// log.record("PRAGMA foreign_keys=ON;");
/// log.record("SELECT 1");
///
/// assert_eq!(log.sql(), "PRAGMA foreign_keys=ON;\n\nSELECT 1");
/// log.reset();
/// assert_eq!(log.sql(), "");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
	statements: Arc<Mutex<Vec<String>>>,
	emit_events: bool,
}

impl QueryLog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Also emit each statement as a debug event under [`SQL_TARGET`]
	pub fn with_tracing(mut self, enabled: bool) -> Self {
		self.emit_events = enabled;
		self
	}

	pub fn record(&self, sql: impl Into<String>) {
		let sql = sql.into();
		if self.emit_events {
			tracing::debug!(target: SQL_TARGET, "{}", sql);
		}
		self.statements.lock().push(sql);
	}

	/// Snapshot of the recorded statements
	pub fn statements(&self) -> Vec<String> {
		self.statements.lock().clone()
	}

	/// Recorded statements separated by a blank line
	pub fn sql(&self) -> String {
		self.statements.lock().join("\n\n")
	}

	pub fn reset(&self) {
		self.statements.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.statements.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.statements.lock().is_empty()
	}
}
