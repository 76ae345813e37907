//! Materialized entity rows

use indexmap::IndexMap;
use pklookup_query::Value;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::shape::EntityShape;

/// One entity instance: its concrete type and its column values in
/// projection order
///
/// ```rust
/// use pklookup_orm::EntityRecord;
/// use pklookup_query::Value;
///
/// let record = EntityRecord::new("IntKey")
///     .with("Id", 77)
///     .with("Foo", "Smokey");
///
/// assert_eq!(record.entity_type(), "IntKey");
/// assert_eq!(record.get("Foo"), Some(&Value::from("Smokey")));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityRecord {
	entity_type: String,
	values: IndexMap<String, Value>,
}

impl EntityRecord {
	pub fn new(entity_type: impl Into<String>) -> Self {
		Self {
			entity_type: entity_type.into(),
			values: IndexMap::new(),
		}
	}

	/// Builder-style [`set`](Self::set)
	pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
		self.set(column, value);
		self
	}

	pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
		self.values.insert(column.into(), value.into());
	}

	pub fn get(&self, column: &str) -> Option<&Value> {
		self.values.get(column)
	}

	/// Concrete entity type of this instance
	pub fn entity_type(&self) -> &str {
		&self.entity_type
	}

	pub fn values(&self) -> &IndexMap<String, Value> {
		&self.values
	}

	/// Key components of this record for `shape`, in key order
	///
	/// Missing columns read as typed `NULL`.
	pub fn key_values(&self, shape: &EntityShape) -> Vec<Value> {
		shape
			.key_columns()
			.map(|column| {
				self.values
					.get(column.name())
					.cloned()
					.unwrap_or_else(|| Value::null(column.value_type()))
			})
			.collect()
	}

	/// JSON object of the non-shadow columns mapped by `shape`
	pub fn to_json(&self, shape: &EntityShape) -> serde_json::Value {
		let object = shape
			.columns()
			.iter()
			.filter(|column| !column.is_shadow())
			.filter_map(|column| {
				self.values
					.get(column.name())
					.map(|value| (column.name().to_string(), value.to_json()))
			})
			.collect();
		serde_json::Value::Object(object)
	}

	/// Deserialize the non-shadow columns into `T`
	pub fn deserialize<T: DeserializeOwned>(&self, shape: &EntityShape) -> Result<T> {
		Ok(serde_json::from_value(self.to_json(shape))?)
	}
}
