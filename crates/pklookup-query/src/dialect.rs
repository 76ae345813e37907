//! Literal-rendering policies
//!
//! A [`Dialect`] decides everything about the emitted text that differs
//! between backends: identifier quoting, placeholder syntax, literal
//! rendering and the clause that limits a result to one row. It is selected
//! once at startup and handed to the compiler.

use std::fmt;

use crate::value::Value;

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Backend-specific rendering policy
///
/// # Implementations
///
/// - [`SqliteDialect`] - SQLite backend
/// - [`PostgresDialect`] - PostgreSQL backend
/// - [`MySqlDialect`] - MySQL backend
pub trait Dialect: fmt::Debug + Send + Sync {
	/// Stable name of the dialect, used in plan cache keys
	fn name(&self) -> &'static str;

	/// Escape an identifier (table name, column name, alias)
	///
	/// - SQLite: `escape_identifier("user")` -> `"user"`
	/// - MySQL: `escape_identifier("user")` -> `` `user` ``
	fn escape_identifier(&self, ident: &str) -> String;

	/// Format the placeholder for the parameter at `index` (1-based)
	fn format_placeholder(&self, index: usize) -> String;

	/// Render a boolean literal
	fn render_bool(&self, value: bool) -> String {
		if value { "TRUE" } else { "FALSE" }.to_string()
	}

	/// Render a string literal, doubling embedded single quotes
	fn render_text(&self, value: &str) -> String {
		format!("'{}'", value.replace('\'', "''"))
	}

	/// Render a blob literal
	fn render_blob(&self, value: &[u8]) -> String {
		let hex: String = value.iter().map(|b| format!("{:02X}", b)).collect();
		format!("X'{}'", hex)
	}

	/// Render a value as an inline SQL literal
	///
	/// Numbers are unquoted, text is single-quoted, nulls are `NULL`.
	fn render_literal(&self, value: &Value) -> String {
		match value {
			Value::Bool(Some(b)) => self.render_bool(*b),
			Value::Int(Some(i)) => i.to_string(),
			Value::BigInt(Some(i)) => i.to_string(),
			Value::Double(Some(f)) => render_real(*f),
			Value::String(Some(s)) => self.render_text(s),
			Value::Bytes(Some(b)) => self.render_blob(b),
			_ => "NULL".to_string(),
		}
	}

	/// Clause appended to restrict a statement to a single row
	fn single_row_clause(&self) -> &'static str {
		"LIMIT 1"
	}
}

/// Render a float so it always reads back as a real, never as an integer.
fn render_real(value: f64) -> String {
	if value.is_finite() && value.fract() == 0.0 {
		format!("{:.1}", value)
	} else {
		value.to_string()
	}
}
