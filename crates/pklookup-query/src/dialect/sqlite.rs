//! SQLite dialect

use super::Dialect;

/// SQLite rendering policy
///
/// Identifiers are double-quoted, parameters use `?`, booleans are stored
/// as integers and therefore rendered as `1`/`0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
	/// Create a new SQLite dialect
	pub fn new() -> Self {
		Self
	}
}

impl Dialect for SqliteDialect {
	fn name(&self) -> &'static str {
		"sqlite"
	}

	fn escape_identifier(&self, ident: &str) -> String {
		format!("\"{}\"", ident.replace('"', "\"\""))
	}

	fn format_placeholder(&self, _index: usize) -> String {
		"?".to_string()
	}

	fn render_bool(&self, value: bool) -> String {
		if value { "1" } else { "0" }.to_string()
	}
}
