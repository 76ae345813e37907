//! SQL Writer helper for constructing SQL strings
//!
//! This module provides the `SqlWriter` type which helps build SQL strings
//! with proper spacing and parameter slot management. Parameters are written
//! as dialect placeholders and their byte spans are remembered, so the same
//! statement can later be rendered with literals inlined for logging.

use std::ops::Range;

use crate::dialect::Dialect;

/// SQL Writer for constructing SQL strings
///
/// # Examples
///
/// ```rust
/// use pklookup_query::{SqlWriter, SqliteDialect, Dialect};
///
/// let dialect = SqliteDialect::new();
/// let mut writer = SqlWriter::new();
/// writer.push("WHERE");
/// writer.push_space();
/// writer.push_qualified("e", "Id", &dialect);
/// writer.push(" = ");
/// writer.push_parameter(|i| dialect.format_placeholder(i));
///
/// assert_eq!(writer.sql(), r#"WHERE "e"."Id" = ?"#);
/// assert_eq!(writer.parameter_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SqlWriter {
	/// The SQL string being constructed
	sql: String,
	/// Byte spans of the parameter placeholders, in order
	parameters: Vec<Range<usize>>,
	/// Current parameter index (1-based for PostgreSQL)
	param_index: usize,
}

impl SqlWriter {
	/// Create a new SQL writer
	pub fn new() -> Self {
		Self {
			sql: String::new(),
			parameters: Vec::new(),
			param_index: 1,
		}
	}

	/// Push a string to SQL
	pub fn push(&mut self, s: &str) {
		self.sql.push_str(s);
	}

	/// Push a space to SQL, unless the SQL is empty or already ends in whitespace
	pub fn push_space(&mut self) {
		if !self.sql.is_empty() && !self.sql.ends_with(char::is_whitespace) {
			self.sql.push(' ');
		}
	}

	/// Push an identifier (escaped)
	pub fn push_identifier<F>(&mut self, ident: &str, escape_fn: F)
	where
		F: FnOnce(&str) -> String,
	{
		self.sql.push_str(&escape_fn(ident));
	}

	/// Push an alias-qualified column, e.g. `"e"."Id"`
	pub fn push_qualified(&mut self, alias: &str, column: &str, dialect: &dyn Dialect) {
		self.sql.push_str(&dialect.escape_identifier(alias));
		self.sql.push('.');
		self.sql.push_str(&dialect.escape_identifier(column));
	}

	/// Push a parameter placeholder and remember its span
	///
	/// Returns the 1-based index of the parameter.
	pub fn push_parameter<F>(&mut self, format_fn: F) -> usize
	where
		F: FnOnce(usize) -> String,
	{
		let index = self.param_index;
		let start = self.sql.len();
		self.sql.push_str(&format_fn(index));
		self.parameters.push(start..self.sql.len());
		self.param_index += 1;
		index
	}

	/// Push a list of items with a separator
	pub fn push_list<I, T, F>(&mut self, items: I, separator: &str, mut f: F)
	where
		I: IntoIterator<Item = T>,
		F: FnMut(&mut Self, T),
	{
		let mut first = true;
		for item in items {
			if !first {
				self.sql.push_str(separator);
			}
			f(self, item);
			first = false;
		}
	}

	/// Get current SQL string
	pub fn sql(&self) -> &str {
		&self.sql
	}

	/// Byte spans of the placeholders written so far
	pub fn parameters(&self) -> &[Range<usize>] {
		&self.parameters
	}

	/// Number of placeholders written so far
	pub fn parameter_count(&self) -> usize {
		self.parameters.len()
	}

	/// Consume writer and return the SQL and the placeholder spans
	pub fn finish(self) -> (String, Vec<Range<usize>>) {
		(self.sql, self.parameters)
	}
}

impl Default for SqlWriter {
	fn default() -> Self {
		Self::new()
	}
}
