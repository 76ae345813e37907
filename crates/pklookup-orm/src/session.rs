//! Unit-of-work session
//!
//! A [`Session`] owns an identity map and answers lookups by key: tracked
//! entities are returned without touching the database, everything else is
//! compiled once, bound and executed.

use std::sync::Arc;

use pklookup_query::Value;
use serde::de::DeserializeOwned;

use crate::compiler::{KeyLookupCompiler, LookupMode};
use crate::database::{Database, decode_row};
use crate::error::{LookupError, Result};
use crate::identity_map::{IdentityKey, IdentityMap};
use crate::key::KeyValue;
use crate::log::QueryLog;
use crate::metadata::Model;
use crate::record::EntityRecord;
use crate::settings::{DialectKind, Settings, SettingsError};
use crate::shape::EntityShape;

/// Session tracking loaded entities for one unit of work
#[derive(Debug)]
pub struct Session {
	model: Arc<Model>,
	database: Database,
	compiler: Arc<KeyLookupCompiler>,
	identity_map: IdentityMap,
}

impl Session {
	pub fn new(model: Arc<Model>, database: Database, compiler: Arc<KeyLookupCompiler>) -> Self {
		Self {
			model,
			database,
			compiler,
			identity_map: IdentityMap::new(),
		}
	}

	/// Build the database handle and compiler from `settings`
	///
	/// # Errors
	///
	/// Fails with [`SettingsError::Invalid`] unless the SQL dialect is SQLite,
	/// since the session executes against a SQLite pool.
	pub fn from_settings(model: Arc<Model>, settings: &Settings) -> Result<Self> {
		settings.validate()?;
		if settings.sql.dialect != DialectKind::Sqlite {
			return Err(SettingsError::Invalid(format!(
				"sql.dialect {:?} cannot be executed by a SQLite session",
				settings.sql.dialect
			))
			.into());
		}
		let log = QueryLog::new().with_tracing(settings.sql.log_statements);
		let database = Database::connect(&settings.database, log)?;
		let compiler = Arc::new(KeyLookupCompiler::from_settings(&settings.sql));
		Ok(Self::new(model, database, compiler))
	}

	pub fn model(&self) -> &Arc<Model> {
		&self.model
	}

	pub fn database(&self) -> &Database {
		&self.database
	}

	pub fn compiler(&self) -> &Arc<KeyLookupCompiler> {
		&self.compiler
	}

	/// Log of the SQL this session has issued
	pub fn log(&self) -> &QueryLog {
		self.database.log()
	}

	pub fn identity_map(&self) -> &IdentityMap {
		&self.identity_map
	}

	/// Track `record` without issuing SQL
	///
	/// # Errors
	///
	/// Fails if the record's type is unknown, its key does not match the
	/// type's key columns, or a key component is `NULL`.
	pub fn attach(&mut self, record: EntityRecord) -> Result<()> {
		let shape = Arc::clone(self.shape(record.entity_type())?);
		let key = record.key_values(&shape);
		shape.check_key(&key)?;
		let identity = IdentityKey::new(shape.root(), &key).ok_or_else(|| LookupError::NullKey {
			entity: record.entity_type().to_string(),
		})?;

		tracing::trace!(entity = record.entity_type(), "attached record");
		self.identity_map.attach(identity, record);
		Ok(())
	}

	/// Find `entity` or any of its descendants by key
	pub async fn find(
		&mut self,
		entity: &str,
		key: impl Into<KeyValue>,
	) -> Result<Option<EntityRecord>> {
		self.lookup(entity, key.into(), LookupMode::Polymorphic).await
	}

	/// Find a row of exactly type `entity` by key
	///
	/// # Errors
	///
	/// Returns [`LookupError::UnknownDiscriminator`] when `entity` is not part
	/// of a discriminated hierarchy, whether or not it is tracked.
	pub async fn find_concrete(
		&mut self,
		entity: &str,
		key: impl Into<KeyValue>,
	) -> Result<Option<EntityRecord>> {
		self.lookup(entity, key.into(), LookupMode::Concrete).await
	}

	/// Find `entity` by key and deserialize its non-shadow properties into `T`
	pub async fn find_as<T: DeserializeOwned>(
		&mut self,
		entity: &str,
		key: impl Into<KeyValue>,
	) -> Result<Option<T>> {
		let Some(record) = self.find(entity, key).await? else {
			return Ok(None);
		};
		let shape = Arc::clone(self.shape(record.entity_type())?);
		record.deserialize(&shape).map(Some)
	}

	/// Stop tracking every entity
	pub fn clear(&mut self) {
		self.identity_map.clear();
	}

	fn shape(&self, entity: &str) -> Result<&Arc<EntityShape>> {
		self.model
			.shape(entity)
			.ok_or_else(|| LookupError::UnknownEntity(entity.to_string()))
	}

	fn tracked_matches(&self, tracked: &EntityRecord, requested: &str, mode: LookupMode) -> bool {
		match mode {
			LookupMode::Concrete => tracked.entity_type() == requested,
			LookupMode::Polymorphic => self.model.is_assignable(tracked.entity_type(), requested),
		}
	}

	async fn lookup(
		&mut self,
		entity: &str,
		key: KeyValue,
		mode: LookupMode,
	) -> Result<Option<EntityRecord>> {
		let shape = Arc::clone(self.shape(entity)?);
		shape.check_key(key.values())?;
		if mode == LookupMode::Concrete && shape.discriminator().is_none() {
			return Err(LookupError::UnknownDiscriminator {
				entity: entity.to_string(),
			});
		}

		let Some(identity) = IdentityKey::new(shape.root(), key.values()) else {
			tracing::debug!(entity, "key has a null component; nothing to look up");
			return Ok(None);
		};

		if let Some(tracked) = self.identity_map.get(&identity) {
			if self.tracked_matches(tracked, entity, mode) {
				tracing::debug!(entity, tracked = tracked.entity_type(), "identity map hit");
				return Ok(Some(tracked.clone()));
			}
			tracing::debug!(
				entity,
				tracked = tracked.entity_type(),
				"tracked entity has an incompatible type; querying the store"
			);
		}

		let plan = self.compiler.compile(&shape, mode)?;
		let bound = plan.bind(&key)?;
		let Some(row) = self.database.fetch_optional(&bound).await? else {
			return Ok(None);
		};

		let record = self.materialize(&shape, decode_row(&row, &shape)?)?;

		if let Some(tracked) = self.identity_map.get(&identity) {
			if tracked.entity_type() != record.entity_type() {
				return Err(LookupError::IdentityConflict {
					entity: record.entity_type().to_string(),
					tracked: tracked.entity_type().to_string(),
				});
			}
			return Ok(Some(tracked.clone()));
		}

		self.identity_map.attach(identity, record.clone());
		Ok(Some(record))
	}

	/// Resolve the concrete type of a decoded row and build its record
	fn materialize(&self, shape: &EntityShape, values: Vec<Value>) -> Result<EntityRecord> {
		let entity_type = match shape.discriminator() {
			Some(discriminator) => {
				let stored = shape
					.columns()
					.iter()
					.position(|column| column.name() == discriminator.column())
					.and_then(|index| values.get(index))
					.and_then(Value::as_str);
				let resolved =
					stored.and_then(|value| self.model.entity_for_discriminator(shape.root(), value));
				match resolved {
					Some(entity_type) => entity_type.to_string(),
					None => {
						return Err(LookupError::UnknownDiscriminatorValue {
							root: shape.root().to_string(),
							value: stored.unwrap_or("NULL").to_string(),
						});
					}
				}
			}
			None => shape.entity().to_string(),
		};

		// Columns of sibling or descendant types stay off the record.
		let mut record = EntityRecord::new(entity_type);
		for (column, value) in shape.columns().iter().zip(values) {
			if self.model.is_assignable(record.entity_type(), column.declared_by()) {
				record.set(column.name(), value);
			}
		}
		Ok(record)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::{EntityDef, ModelBuilder, Property};
	use crate::settings::DatabaseSettings;
	use pklookup_query::ValueType;
	use rstest::{fixture, rstest};

	#[fixture]
	fn model() -> Arc<Model> {
		let model = ModelBuilder::new()
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
			.unwrap();
		Arc::new(model)
	}

	fn session(model: Arc<Model>) -> Session {
		let database = Database::connect(&DatabaseSettings::default(), QueryLog::new()).unwrap();
		Session::new(model, database, Arc::new(KeyLookupCompiler::sqlite()))
	}

	fn row(discriminator: Value) -> Vec<Value> {
		vec![
			Value::BigInt(Some(78)),
			discriminator,
			Value::from("Foo"),
			Value::null(ValueType::Text),
		]
	}

	#[rstest]
	#[tokio::test]
	async fn test_materialize_resolves_concrete_type(model: Arc<Model>) {
		let session = session(Arc::clone(&model));
		let shape = model.shape("BaseType").unwrap();

		let record = session
			.materialize(shape, row(Value::from("DerivedType")))
			.unwrap();

		assert_eq!(record.entity_type(), "DerivedType");
		assert_eq!(record.get("Id"), Some(&Value::BigInt(Some(78))));
		assert_eq!(record.get("Boo"), Some(&Value::null(ValueType::Text)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_materialize_drops_descendant_columns(model: Arc<Model>) {
		let session = session(Arc::clone(&model));
		let shape = model.shape("BaseType").unwrap();

		let record = session
			.materialize(shape, row(Value::from("BaseType")))
			.unwrap();

		assert_eq!(record.entity_type(), "BaseType");
		assert_eq!(
			record.values().keys().collect::<Vec<_>>(),
			vec!["Id", "Discriminator", "Foo"]
		);
	}

	#[rstest]
	#[case::unknown(Value::from("Mystery"), "Mystery")]
	#[case::null(Value::null(ValueType::Text), "NULL")]
	#[tokio::test]
	async fn test_materialize_rejects_unknown_discriminator(
		model: Arc<Model>,
		#[case] discriminator: Value,
		#[case] expected: &str,
	) {
		let session = session(Arc::clone(&model));
		let shape = model.shape("BaseType").unwrap();

		let err = session.materialize(shape, row(discriminator)).unwrap_err();

		assert!(matches!(
			err,
			LookupError::UnknownDiscriminatorValue { root, value }
				if root == "BaseType" && value == expected
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_attach_checks_key_types(model: Arc<Model>) {
		let mut session = session(model);

		let err = session
			.attach(EntityRecord::new("BaseType").with("Id", "not a number"))
			.unwrap_err();

		assert!(matches!(err, LookupError::KeyTypeMismatch { .. }));
		assert!(session.identity_map().is_empty());
	}

	#[rstest]
	#[case::postgres(DialectKind::Postgres)]
	#[case::mysql(DialectKind::Mysql)]
	#[tokio::test]
	async fn test_from_settings_requires_sqlite_dialect(
		model: Arc<Model>,
		#[case] dialect: DialectKind,
	) {
		let mut settings = Settings::default();
		settings.sql.dialect = dialect;

		let err = Session::from_settings(model, &settings).unwrap_err();

		assert!(matches!(err, LookupError::Settings(SettingsError::Invalid(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_forgets_tracked_entities(model: Arc<Model>) {
		let mut session = session(model);
		session
			.attach(EntityRecord::new("DerivedType").with("Id", 78))
			.unwrap();
		assert_eq!(session.identity_map().len(), 1);

		session.clear();

		assert!(session.identity_map().is_empty());
	}
}
