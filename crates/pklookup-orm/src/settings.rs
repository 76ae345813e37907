//! Settings for the lookup engine
//!
//! Settings are read from TOML. Every field has a default, so an empty
//! document is a valid configuration:
//!
//! ```toml
//! [database]
//! url = "sqlite://find.db"
//! foreign_keys = true
//!
//! [sql]
//! dialect = "sqlite"
//! layout = "multiline"
//! ```

use std::path::Path;
use std::sync::Arc;

use pklookup_query::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
use serde::{Deserialize, Serialize};

use crate::compiler::ClauseLayout;

/// Environment variable overriding `database.url`
pub const DATABASE_URL_ENV: &str = "PKLOOKUP_DATABASE_URL";

/// Errors raised while loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to read settings file: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

/// Top-level settings
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub database: DatabaseSettings,
	pub sql: SqlSettings,
}

impl Settings {
	/// Parse settings from a TOML document
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Read settings from a TOML file
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let source = std::fs::read_to_string(path.as_ref())?;
		Self::from_toml_str(&source)
	}

	/// Apply overrides from the process environment
	pub fn apply_env(self) -> Self {
		self.apply_env_from(|name| std::env::var(name).ok())
	}

	/// Apply overrides from an arbitrary variable source
	pub fn apply_env_from<F>(mut self, lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(url) = lookup(DATABASE_URL_ENV) {
			tracing::debug!(variable = DATABASE_URL_ENV, "database url overridden from environment");
			self.database.url = url;
		}
		self
	}

	/// Check values serde cannot
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.database.url.trim().is_empty() {
			return Err(SettingsError::Invalid("database.url must not be empty".into()));
		}
		if self.database.max_connections == 0 {
			return Err(SettingsError::Invalid(
				"database.max_connections must be at least 1".into(),
			));
		}
		if self.sql.dialect != DialectKind::Sqlite {
			tracing::warn!(
				dialect = ?self.sql.dialect,
				"statements are rendered for a non-SQLite dialect but executed against SQLite"
			);
		}
		Ok(())
	}
}

/// `[database]` section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	/// sqlx connection URL
	pub url: String,
	/// Issue `PRAGMA foreign_keys=ON;` on every new connection
	pub foreign_keys: bool,
	pub max_connections: u32,
	pub busy_timeout_ms: u64,
	/// Create the database file when it does not exist
	pub create_if_missing: bool,
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			url: "sqlite::memory:".to_string(),
			foreign_keys: true,
			max_connections: 1,
			busy_timeout_ms: 5000,
			create_if_missing: true,
		}
	}
}

impl DatabaseSettings {
	/// Settings for a SQLite file
	pub fn sqlite_file(path: impl AsRef<Path>) -> Self {
		Self {
			url: format!("sqlite://{}", path.as_ref().display()),
			..Self::default()
		}
	}
}

/// `[sql]` section
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
	pub dialect: DialectKind,
	pub layout: ClauseLayout,
	/// Emit each recorded statement as a tracing event
	pub log_statements: bool,
}

/// Rendering dialect selected at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
	#[default]
	Sqlite,
	Postgres,
	Mysql,
}

impl DialectKind {
	pub fn dialect(self) -> Arc<dyn Dialect> {
		match self {
			Self::Sqlite => Arc::new(SqliteDialect::new()),
			Self::Postgres => Arc::new(PostgresDialect::new()),
			Self::Mysql => Arc::new(MySqlDialect::new()),
		}
	}
}
