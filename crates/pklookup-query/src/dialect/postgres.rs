//! PostgreSQL dialect

use super::Dialect;

/// PostgreSQL rendering policy
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
	/// Create a new PostgreSQL dialect
	pub fn new() -> Self {
		Self
	}
}

impl Dialect for PostgresDialect {
	fn name(&self) -> &'static str {
		"postgres"
	}

	fn escape_identifier(&self, ident: &str) -> String {
		format!("\"{}\"", ident.replace('"', "\"\""))
	}

	fn format_placeholder(&self, index: usize) -> String {
		format!("${}", index)
	}

	fn render_blob(&self, value: &[u8]) -> String {
		let hex: String = value.iter().map(|b| format!("{:02x}", b)).collect();
		format!("'\\x{}'::bytea", hex)
	}
}
