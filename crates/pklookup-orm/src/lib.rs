//! # pklookup-orm
//!
//! Primary-key lookups for entity types mapped to SQLite tables.
//!
//! ## Features
//!
//! - **Single, composite and shadow keys**: one parameter per key column
//! - **Table-per-hierarchy**: discriminator predicates for polymorphic and
//!   concrete lookups
//! - **Plan cache**: each `(shape, mode)` is compiled once per process
//! - **Identity map**: tracked entities are returned without issuing SQL
//! - **Query log**: every statement sent to SQLite is captured
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pklookup_orm::metadata::{EntityDef, ModelBuilder, Property};
//! use pklookup_orm::{Session, Settings};
//! use pklookup_query::ValueType;
//!
//! # async fn example() -> pklookup_orm::Result<()> {
//! let model = ModelBuilder::new()
//!     .entity(
//!         EntityDef::new("IntKey")
//!             .property(Property::new("Id", ValueType::Integer))
//!             .property(Property::new("Foo", ValueType::Text))
//!             .key(["Id"]),
//!     )
//!     .build()?;
//!
//! let settings = Settings::from_toml_str("[database]\nurl = \"sqlite://find.db\"")?;
//! let mut session = Session::from_settings(Arc::new(model), &settings)?;
//!
//! if let Some(record) = session.find("IntKey", 77).await? {
//!     println!("{:?}", record.get("Foo"));
//! }
//! println!("{}", session.log().sql());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod compiler;
pub mod database;
pub mod error;
pub mod identity_map;
pub mod key;
pub mod log;
pub mod metadata;
pub mod record;
pub mod session;
pub mod settings;
pub mod shape;

pub use cache::{CacheKey, CacheStats, QueryCache};
pub use compiler::{BoundQuery, ClauseLayout, CompiledQuery, KeyLookupCompiler, LookupMode};
pub use database::{Database, FOREIGN_KEYS_PRAGMA};
pub use error::{LookupError, Result};
pub use identity_map::{IdentityKey, IdentityMap};
pub use key::KeyValue;
pub use log::QueryLog;
pub use metadata::{EntityDef, Model, ModelBuilder, ModelError, Property};
pub use record::EntityRecord;
pub use session::Session;
pub use settings::{DatabaseSettings, DialectKind, Settings, SettingsError, SqlSettings};
pub use shape::{ColumnShape, DiscriminatorShape, EntityShape, ShapeId};
