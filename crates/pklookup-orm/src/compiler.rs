//! Key lookup compiler
//!
//! Compiles a lookup-by-key against an [`EntityShape`] into a single
//! parameterized `SELECT`, memoized per shape and lookup mode. Binding a key
//! to a compiled plan yields the parameter values plus the statement with
//! literals inlined, which is what the query log records.
//!
//! ```rust
//! use pklookup_orm::compiler::{KeyLookupCompiler, LookupMode};
//! use pklookup_orm::metadata::{EntityDef, ModelBuilder, Property};
//! use pklookup_orm::{KeyValue, QueryCache};
//! use pklookup_query::ValueType;
//! use std::sync::Arc;
//!
//! let model = ModelBuilder::new()
//!     .entity(
//!         EntityDef::new("IntKey")
//!             .property(Property::new("Id", ValueType::Integer))
//!             .property(Property::new("Foo", ValueType::Text))
//!             .key(["Id"]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let compiler = KeyLookupCompiler::sqlite().with_cache(Arc::new(QueryCache::new()));
//! let plan = compiler
//!     .compile(model.shape("IntKey").unwrap(), LookupMode::Polymorphic)
//!     .unwrap();
//! let bound = plan.bind(&KeyValue::from(77)).unwrap();
//!
//! assert_eq!(
//!     bound.logged_sql(),
//!     r#"SELECT "e"."Id", "e"."Foo" FROM "IntKey" AS "e" WHERE "e"."Id" = 77 LIMIT 1"#
//! );
//! ```

use std::ops::Range;
use std::sync::Arc;

use pklookup_query::{Dialect, SqlWriter, SqliteDialect, ValueType, Values};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, QueryCache};
use crate::error::{LookupError, Result};
use crate::key::KeyValue;
use crate::settings::SqlSettings;
use crate::shape::{EntityShape, ShapeId};

/// Table alias used by every compiled lookup
pub const TABLE_ALIAS: &str = "e";

/// How the discriminator of a hierarchy type constrains the lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupMode {
	/// Match rows of exactly the requested type
	Concrete,
	/// Match rows of the requested type or any of its descendants
	Polymorphic,
}

/// How the clauses of a compiled statement are separated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseLayout {
	/// One line, clauses separated by a space
	#[default]
	Compact,
	/// One clause per line
	Multiline,
}

impl ClauseLayout {
	fn separator(self) -> &'static str {
		match self {
			Self::Compact => " ",
			Self::Multiline => "\n",
		}
	}
}

enum Operand<'a> {
	Parameter,
	Literal(&'a str),
}

enum Predicate<'a> {
	Equals { column: &'a str, operand: Operand<'a> },
	In { column: &'a str, values: &'a [String] },
}

/// Compiles and caches key lookups for one dialect
#[derive(Debug, Clone)]
pub struct KeyLookupCompiler {
	dialect: Arc<dyn Dialect>,
	layout: ClauseLayout,
	cache: Arc<QueryCache>,
}

impl KeyLookupCompiler {
	/// Create a compiler backed by the process-wide plan cache
	pub fn new(dialect: Arc<dyn Dialect>) -> Self {
		Self {
			dialect,
			layout: ClauseLayout::default(),
			cache: QueryCache::global(),
		}
	}

	/// Compiler for the SQLite dialect
	pub fn sqlite() -> Self {
		Self::new(Arc::new(SqliteDialect::new()))
	}

	/// Compiler configured from the `[sql]` settings section
	pub fn from_settings(settings: &SqlSettings) -> Self {
		Self::new(settings.dialect.dialect()).with_layout(settings.layout)
	}

	pub fn with_layout(mut self, layout: ClauseLayout) -> Self {
		self.layout = layout;
		self
	}

	/// Use a private plan cache instead of the global one
	pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
		self.cache = cache;
		self
	}

	pub fn dialect(&self) -> &Arc<dyn Dialect> {
		&self.dialect
	}

	pub fn layout(&self) -> ClauseLayout {
		self.layout
	}

	pub fn cache(&self) -> &Arc<QueryCache> {
		&self.cache
	}

	/// Compile a lookup of `shape` by key, reusing a cached plan when present
	///
	/// # Errors
	///
	/// Returns [`LookupError::UnknownDiscriminator`] if `mode` is
	/// [`LookupMode::Concrete`] and the shape belongs to no discriminated
	/// hierarchy.
	pub fn compile(&self, shape: &EntityShape, mode: LookupMode) -> Result<Arc<CompiledQuery>> {
		let key = CacheKey {
			shape: shape.id(),
			mode,
			dialect: self.dialect.name(),
			layout: self.layout,
		};
		self.cache
			.get_or_try_insert_with(key, || self.compile_uncached(shape, mode))
	}

	fn compile_uncached(&self, shape: &EntityShape, mode: LookupMode) -> Result<CompiledQuery> {
		let dialect = self.dialect.as_ref();
		let discriminator_literals: Vec<String> = match (shape.discriminator(), mode) {
			(Some(discriminator), LookupMode::Concrete) => {
				vec![dialect.render_text(discriminator.value())]
			}
			(Some(discriminator), LookupMode::Polymorphic) => discriminator
				.hierarchy_values()
				.iter()
				.map(|value| dialect.render_text(value))
				.collect(),
			(None, LookupMode::Concrete) => {
				return Err(LookupError::UnknownDiscriminator {
					entity: shape.entity().to_string(),
				});
			}
			(None, LookupMode::Polymorphic) => Vec::new(),
		};

		let mut predicates = Vec::with_capacity(shape.key_arity() + 1);
		if let Some(discriminator) = shape.discriminator() {
			match discriminator_literals.as_slice() {
				[single] => predicates.push(Predicate::Equals {
					column: discriminator.column(),
					operand: Operand::Literal(single),
				}),
				literals => predicates.push(Predicate::In {
					column: discriminator.column(),
					values: literals,
				}),
			}
		}

		for column in shape.key_columns() {
			predicates.push(Predicate::Equals {
				column: column.name(),
				operand: Operand::Parameter,
			});
		}

		let separator = self.layout.separator();
		let mut writer = SqlWriter::new();

		writer.push("SELECT ");
		writer.push_list(shape.columns(), ", ", |w, column| {
			w.push_qualified(TABLE_ALIAS, column.name(), dialect);
		});
		writer.push(separator);
		writer.push("FROM ");
		writer.push_identifier(shape.table(), |s| dialect.escape_identifier(s));
		writer.push(" AS ");
		writer.push_identifier(TABLE_ALIAS, |s| dialect.escape_identifier(s));
		writer.push(separator);
		writer.push("WHERE ");

		let wrap = predicates.len() > 1;
		writer.push_list(predicates, " AND ", |w, predicate| match predicate {
			Predicate::Equals { column, operand } => {
				if wrap {
					w.push("(");
				}
				w.push_qualified(TABLE_ALIAS, column, dialect);
				w.push(" = ");
				match operand {
					Operand::Parameter => {
						w.push_parameter(|i| dialect.format_placeholder(i));
					}
					Operand::Literal(literal) => w.push(literal),
				}
				if wrap {
					w.push(")");
				}
			}
			Predicate::In { column, values } => {
				w.push_qualified(TABLE_ALIAS, column, dialect);
				w.push(" IN (");
				w.push_list(values, ", ", |w, value| w.push(value));
				w.push(")");
			}
		});
		writer.push(separator);
		writer.push(dialect.single_row_clause());

		let (sql, spans) = writer.finish();
		let parameters = shape
			.key_columns()
			.zip(spans)
			.map(|(column, span)| ParameterSlot {
				column: column.name().to_string(),
				value_type: column.value_type(),
				span,
			})
			.collect();

		tracing::trace!(entity = shape.entity(), mode = ?mode, sql = %sql, "compiled key lookup");

		Ok(CompiledQuery {
			entity: shape.entity().to_string(),
			shape_id: shape.id(),
			mode,
			sql,
			parameters,
			dialect: Arc::clone(&self.dialect),
		})
	}
}

/// Position of one key parameter in a compiled statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSlot {
	column: String,
	value_type: ValueType,
	span: Range<usize>,
}

impl ParameterSlot {
	pub fn column(&self) -> &str {
		&self.column
	}

	pub fn value_type(&self) -> ValueType {
		self.value_type
	}

	/// Byte range of the placeholder in the compiled SQL
	pub fn span(&self) -> Range<usize> {
		self.span.clone()
	}
}

/// A compiled, reusable key lookup
#[derive(Debug)]
pub struct CompiledQuery {
	entity: String,
	shape_id: ShapeId,
	mode: LookupMode,
	sql: String,
	parameters: Vec<ParameterSlot>,
	dialect: Arc<dyn Dialect>,
}

impl CompiledQuery {
	pub fn entity(&self) -> &str {
		&self.entity
	}

	pub fn shape_id(&self) -> ShapeId {
		self.shape_id
	}

	pub fn mode(&self) -> LookupMode {
		self.mode
	}

	/// Parameterized SQL text
	pub fn sql(&self) -> &str {
		&self.sql
	}

	/// Key parameter slots in key declaration order
	pub fn parameters(&self) -> &[ParameterSlot] {
		&self.parameters
	}

	/// Bind key values to this plan
	///
	/// # Errors
	///
	/// Returns [`LookupError::ShapeMismatch`] on an arity mismatch and
	/// [`LookupError::KeyTypeMismatch`] when a component's type differs from
	/// its column.
	pub fn bind(&self, key: &KeyValue) -> Result<BoundQuery> {
		if key.len() != self.parameters.len() {
			return Err(LookupError::ShapeMismatch {
				entity: self.entity.clone(),
				expected: self.parameters.len(),
				actual: key.len(),
			});
		}
		for (slot, value) in self.parameters.iter().zip(key.values()) {
			if slot.value_type != value.value_type() {
				return Err(LookupError::KeyTypeMismatch {
					entity: self.entity.clone(),
					column: slot.column.clone(),
					expected: slot.value_type,
					actual: value.value_type(),
				});
			}
		}

		let mut logged_sql = self.sql.clone();
		for (slot, value) in self.parameters.iter().zip(key.values()).rev() {
			logged_sql.replace_range(slot.span(), &self.dialect.render_literal(value));
		}

		Ok(BoundQuery {
			sql: self.sql.clone(),
			values: Values::from(key.values().to_vec()),
			logged_sql,
		})
	}
}

/// A compiled lookup with key values attached
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
	sql: String,
	values: Values,
	logged_sql: String,
}

impl BoundQuery {
	/// Parameterized SQL sent to the backend
	pub fn sql(&self) -> &str {
		&self.sql
	}

	/// Parameter values in placeholder order
	pub fn values(&self) -> &Values {
		&self.values
	}

	/// SQL with the key literals inlined
	pub fn logged_sql(&self) -> &str {
		&self.logged_sql
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::{EntityDef, Model, ModelBuilder, Property};
	use pklookup_query::{MySqlDialect, PostgresDialect, Value};
	use pretty_assertions::assert_eq;
	use rstest::{fixture, rstest};

	#[fixture]
	fn model() -> Model {
		ModelBuilder::new()
			.entity(
				EntityDef::new("IntKey")
					.property(Property::new("Id", ValueType::Integer))
					.property(Property::new("Foo", ValueType::Text))
					.key(["Id"]),
			)
			.entity(
				EntityDef::new("CompositeKey")
					.property(Property::new("Id1", ValueType::Integer))
					.property(Property::new("Id2", ValueType::Text))
					.property(Property::new("Foo", ValueType::Text))
					.key(["Id1", "Id2"]),
			)
			.entity(
				EntityDef::new("BaseType")
					.property(Property::new("Id", ValueType::Integer))
					.property(Property::new("Foo", ValueType::Text))
					.key(["Id"])
					.discriminator_column("Discriminator"),
			)
			.entity(
				EntityDef::new("DerivedType")
					.base("BaseType")
					.property(Property::new("Boo", ValueType::Text)),
			)
			.build()
			.unwrap()
	}

	fn compiler() -> KeyLookupCompiler {
		KeyLookupCompiler::sqlite().with_cache(Arc::new(QueryCache::new()))
	}

	fn logged(
		compiler: &KeyLookupCompiler,
		model: &Model,
		entity: &str,
		mode: LookupMode,
		key: impl Into<KeyValue>,
	) -> String {
		compiler
			.compile(model.shape(entity).unwrap(), mode)
			.unwrap()
			.bind(&key.into())
			.unwrap()
			.logged_sql()
			.to_string()
	}

	#[rstest]
	fn test_int_key(model: Model) {
		assert_eq!(
			logged(&compiler(), &model, "IntKey", LookupMode::Polymorphic, 77),
			r#"SELECT "e"."Id", "e"."Foo" FROM "IntKey" AS "e" WHERE "e"."Id" = 77 LIMIT 1"#
		);
	}

	#[rstest]
	fn test_parameterized_sql(model: Model) {
		let plan = compiler()
			.compile(model.shape("IntKey").unwrap(), LookupMode::Polymorphic)
			.unwrap();
		let bound = plan.bind(&KeyValue::from(77)).unwrap();

		assert_eq!(
			plan.sql(),
			r#"SELECT "e"."Id", "e"."Foo" FROM "IntKey" AS "e" WHERE "e"."Id" = ? LIMIT 1"#
		);
		assert_eq!(bound.sql(), plan.sql());
		assert_eq!(bound.values(), &Values::from(vec![Value::from(77)]));
		assert_eq!(plan.parameters()[0].column(), "Id");
	}

	#[rstest]
	fn test_composite_key(model: Model) {
		assert_eq!(
			logged(&compiler(), &model, "CompositeKey", LookupMode::Polymorphic, (77, "Dog")),
			r#"SELECT "e"."Id1", "e"."Id2", "e"."Foo" FROM "CompositeKey" AS "e" WHERE ("e"."Id1" = 77) AND ("e"."Id2" = 'Dog') LIMIT 1"#
		);
	}

	#[rstest]
	fn test_polymorphic_base_type(model: Model) {
		assert_eq!(
			logged(&compiler(), &model, "BaseType", LookupMode::Polymorphic, 77),
			r#"SELECT "e"."Id", "e"."Discriminator", "e"."Foo", "e"."Boo" FROM "BaseType" AS "e" WHERE "e"."Discriminator" IN ('DerivedType', 'BaseType') AND ("e"."Id" = 77) LIMIT 1"#
		);
	}

	#[rstest]
	#[case::polymorphic(LookupMode::Polymorphic)]
	#[case::concrete(LookupMode::Concrete)]
	fn test_derived_type_collapses_to_equality(model: Model, #[case] mode: LookupMode) {
		assert_eq!(
			logged(&compiler(), &model, "DerivedType", mode, 78),
			r#"SELECT "e"."Id", "e"."Discriminator", "e"."Foo", "e"."Boo" FROM "BaseType" AS "e" WHERE ("e"."Discriminator" = 'DerivedType') AND ("e"."Id" = 78) LIMIT 1"#
		);
	}

	#[rstest]
	fn test_concrete_base_type(model: Model) {
		assert_eq!(
			logged(&compiler(), &model, "BaseType", LookupMode::Concrete, 77),
			r#"SELECT "e"."Id", "e"."Discriminator", "e"."Foo", "e"."Boo" FROM "BaseType" AS "e" WHERE ("e"."Discriminator" = 'BaseType') AND ("e"."Id" = 77) LIMIT 1"#
		);
	}

	#[rstest]
	fn test_multiline_layout(model: Model) {
		let compiler = compiler().with_layout(ClauseLayout::Multiline);
		assert_eq!(
			logged(&compiler, &model, "IntKey", LookupMode::Polymorphic, 77),
			"SELECT \"e\".\"Id\", \"e\".\"Foo\"\nFROM \"IntKey\" AS \"e\"\nWHERE \"e\".\"Id\" = 77\nLIMIT 1"
		);
	}

	#[rstest]
	fn test_concrete_without_discriminator(model: Model) {
		let err = compiler()
			.compile(model.shape("IntKey").unwrap(), LookupMode::Concrete)
			.unwrap_err();

		assert!(matches!(err, LookupError::UnknownDiscriminator { entity } if entity == "IntKey"));
	}

	#[rstest]
	fn test_bind_arity_mismatch(model: Model) {
		let plan = compiler()
			.compile(model.shape("CompositeKey").unwrap(), LookupMode::Polymorphic)
			.unwrap();
		let err = plan.bind(&KeyValue::from(77)).unwrap_err();

		assert!(matches!(
			err,
			LookupError::ShapeMismatch {
				expected: 2,
				actual: 1,
				..
			}
		));
	}

	#[rstest]
	fn test_bind_type_mismatch(model: Model) {
		let plan = compiler()
			.compile(model.shape("IntKey").unwrap(), LookupMode::Polymorphic)
			.unwrap();
		let err = plan.bind(&KeyValue::from("77")).unwrap_err();

		assert!(matches!(err, LookupError::KeyTypeMismatch { column, .. } if column == "Id"));
	}

	#[rstest]
	fn test_plan_is_cached_per_shape_and_mode(model: Model) {
		let compiler = compiler();
		let shape = model.shape("BaseType").unwrap();

		let first = compiler.compile(shape, LookupMode::Polymorphic).unwrap();
		let second = compiler.compile(shape, LookupMode::Polymorphic).unwrap();
		let concrete = compiler.compile(shape, LookupMode::Concrete).unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(first.sql(), second.sql());
		assert_ne!(first.sql(), concrete.sql());

		let stats = compiler.cache().stats();
		assert_eq!(stats.total_entries, 2);
		assert_eq!(stats.hits, 1);
		assert_eq!(stats.misses, 2);
	}

	#[rstest]
	fn test_recompile_is_byte_identical(model: Model) {
		let shape = model.shape("CompositeKey").unwrap();
		let first = compiler().compile(shape, LookupMode::Polymorphic).unwrap();
		let second = compiler().compile(shape, LookupMode::Polymorphic).unwrap();

		assert!(!Arc::ptr_eq(&first, &second));
		assert_eq!(first.sql().as_bytes(), second.sql().as_bytes());
	}

	#[rstest]
	fn test_layouts_are_cached_separately(model: Model) {
		let cache = Arc::new(QueryCache::new());
		let compact = KeyLookupCompiler::sqlite().with_cache(Arc::clone(&cache));
		let multiline = compact.clone().with_layout(ClauseLayout::Multiline);
		let shape = model.shape("IntKey").unwrap();

		let a = compact.compile(shape, LookupMode::Polymorphic).unwrap();
		let b = multiline.compile(shape, LookupMode::Polymorphic).unwrap();

		assert_ne!(a.sql(), b.sql());
		assert_eq!(cache.len(), 2);
	}

	#[rstest]
	fn test_concurrent_compilation_converges(model: Model) {
		let compiler = compiler();
		let shape = model.shape("BaseType").unwrap();

		let sqls: Vec<String> = std::thread::scope(|scope| {
			let handles: Vec<_> = (0..8)
				.map(|_| {
					scope.spawn(|| {
						compiler
							.compile(shape, LookupMode::Polymorphic)
							.unwrap()
							.sql()
							.to_string()
					})
				})
				.collect();
			handles.into_iter().map(|h| h.join().unwrap()).collect()
		});

		assert!(sqls.windows(2).all(|pair| pair[0] == pair[1]));
		assert_eq!(compiler.cache().len(), 1);
	}

	#[rstest]
	fn test_postgres_placeholders(model: Model) {
		let compiler = KeyLookupCompiler::new(Arc::new(PostgresDialect::new()))
			.with_cache(Arc::new(QueryCache::new()));
		let plan = compiler
			.compile(model.shape("CompositeKey").unwrap(), LookupMode::Polymorphic)
			.unwrap();

		assert_eq!(
			plan.sql(),
			r#"SELECT "e"."Id1", "e"."Id2", "e"."Foo" FROM "CompositeKey" AS "e" WHERE ("e"."Id1" = $1) AND ("e"."Id2" = $2) LIMIT 1"#
		);
		assert_eq!(
			plan.bind(&KeyValue::from((77, "Dog"))).unwrap().logged_sql(),
			r#"SELECT "e"."Id1", "e"."Id2", "e"."Foo" FROM "CompositeKey" AS "e" WHERE ("e"."Id1" = 77) AND ("e"."Id2" = 'Dog') LIMIT 1"#
		);
	}

	#[rstest]
	fn test_mysql_quoting(model: Model) {
		let compiler = KeyLookupCompiler::new(Arc::new(MySqlDialect::new()))
			.with_cache(Arc::new(QueryCache::new()));

		assert_eq!(
			logged(&compiler, &model, "IntKey", LookupMode::Polymorphic, 77),
			"SELECT `e`.`Id`, `e`.`Foo` FROM `IntKey` AS `e` WHERE `e`.`Id` = 77 LIMIT 1"
		);
	}
}
