//! # pklookup-query
//!
//! SQL building blocks for the pklookup key-lookup engine.
//!
//! This crate holds the pieces that do not know anything about entities:
//!
//! - [`value`]: typed SQL values and their semantic [`ValueType`] tags
//! - [`writer`]: [`SqlWriter`], a string builder that tracks parameter slots
//! - [`dialect`]: the literal-rendering policy ([`Dialect`]) with
//!   [`SqliteDialect`], [`PostgresDialect`] and [`MySqlDialect`]
//!
//! ## Backend Differences
//!
//! | Feature | SQLite | PostgreSQL | MySQL |
//! |---------|--------|------------|-------|
//! | Identifier quoting | `"name"` | `"name"` | `` `name` `` |
//! | Placeholders | `?` | `$1, $2, ...` | `?` |
//! | Boolean literals | `1` / `0` | `TRUE` / `FALSE` | `TRUE` / `FALSE` |
//! | Single row clause | `LIMIT 1` | `LIMIT 1` | `LIMIT 1` |
//!
//! ## Example
//!
//! ```rust
//! use pklookup_query::prelude::*;
//!
//! let dialect = SqliteDialect::new();
//! let mut writer = SqlWriter::new();
//! writer.push("SELECT");
//! writer.push_space();
//! writer.push_qualified("e", "Id", &dialect);
//! writer.push(" FROM ");
//! writer.push_identifier("IntKey", |s| dialect.escape_identifier(s));
//!
//! assert_eq!(writer.sql(), r#"SELECT "e"."Id" FROM "IntKey""#);
//! assert_eq!(dialect.render_literal(&Value::from("Cat")), "'Cat'");
//! ```

pub mod dialect;
pub mod value;
pub mod writer;

pub use dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use value::{IntoValue, Value, ValueType, Values};
pub use writer::SqlWriter;

/// Commonly used items.
pub mod prelude {
	pub use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
	pub use crate::value::{IntoValue, Value, ValueType, Values};
	pub use crate::writer::SqlWriter;
}
