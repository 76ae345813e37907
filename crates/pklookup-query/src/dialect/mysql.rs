//! MySQL dialect

use super::Dialect;

/// MySQL rendering policy
///
/// Identifiers are backtick-quoted. Backslash is an escape character inside
/// MySQL string literals, so it is doubled along with single quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
	/// Create a new MySQL dialect
	pub fn new() -> Self {
		Self
	}
}

impl Dialect for MySqlDialect {
	fn name(&self) -> &'static str {
		"mysql"
	}

	fn escape_identifier(&self, ident: &str) -> String {
		format!("`{}`", ident.replace('`', "``"))
	}

	fn format_placeholder(&self, _index: usize) -> String {
		"?".to_string()
	}

	fn render_text(&self, value: &str) -> String {
		format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Value;
	use rstest::rstest;

	#[rstest]
	#[case::plain("IntKey", "`IntKey`")]
	#[case::embedded_tick("we`ird", "`we``ird`")]
	fn test_escape_identifier(#[case] ident: &str, #[case] expected: &str) {
		assert_eq!(MySqlDialect::new().escape_identifier(ident), expected);
	}

	#[rstest]
	fn test_text_escapes_backslash() {
		let dialect = MySqlDialect::new();
		assert_eq!(dialect.render_literal(&Value::from(r"a\b'c")), r"'a\\b''c'");
	}
}
