//! # pklookup
//!
//! Find-by-primary-key for entities stored in SQLite.
//!
//! pklookup compiles a lookup of an entity type by its key into one
//! backend-specific `SELECT ... WHERE <key predicates> LIMIT 1`, caches the
//! compiled statement per entity shape, and skips the database entirely when
//! the session already tracks the entity.
//!
//! ## Crates
//!
//! - [`query`] - SQL values, the SQL writer and literal-rendering dialects
//! - [`orm`] - model metadata, the lookup compiler, identity map and session
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use pklookup::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> pklookup::Result<()> {
//! let model = ModelBuilder::new()
//!     .entity(
//!         EntityDef::new("CompositeKey")
//!             .property(Property::new("Id1", ValueType::Integer))
//!             .property(Property::new("Id2", ValueType::Text))
//!             .property(Property::new("Foo", ValueType::Text))
//!             .key(["Id1", "Id2"]),
//!     )
//!     .build()?;
//!
//! let settings = Settings::from_file("pklookup.toml")?.apply_env();
//! let mut session = Session::from_settings(Arc::new(model), &settings)?;
//!
//! let found = session.find("CompositeKey", (77, "Dog")).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub use pklookup_orm as orm;
pub use pklookup_query as query;

pub use pklookup_orm::{
	ClauseLayout, Database, EntityDef, EntityRecord, KeyLookupCompiler, KeyValue, LookupError,
	LookupMode, Model, ModelBuilder, ModelError, Property, QueryCache, QueryLog, Result, Session,
	Settings, SettingsError,
};
pub use pklookup_query::{Dialect, SqliteDialect, Value, ValueType};

/// Prelude module for convenient imports
pub mod prelude {
	pub use crate::{
		ClauseLayout,
		Database,
		Dialect,
		EntityDef,
		EntityRecord,
		KeyLookupCompiler,
		KeyValue,
		LookupError,
		LookupMode,
		Model,
		ModelBuilder,
		Property,
		QueryCache,
		QueryLog,
		Session,
		Settings,
		SqliteDialect,
		Value,
		ValueType,
	};
}
