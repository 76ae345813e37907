//! Immutable entity shapes
//!
//! An [`EntityShape`] is everything the lookup compiler needs to know about
//! one entity type: its table, the ordered column list it materializes, its
//! key columns and, for table-per-hierarchy types, the discriminator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use pklookup_query::{Value, ValueType};

use crate::error::{LookupError, Result};
use crate::metadata::Property;

static NEXT_SHAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a derived shape
///
/// Two models built from the same declarations still get distinct ids, so
/// cached plans never leak between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u64);

impl ShapeId {
	pub(crate) fn next() -> Self {
		Self(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ShapeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "shape#{}", self.0)
	}
}

/// A mapped column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
	name: String,
	value_type: ValueType,
	shadow: bool,
	declared_by: String,
}

impl ColumnShape {
	pub(crate) fn new(name: String, value_type: ValueType, shadow: bool, declared_by: String) -> Self {
		Self {
			name,
			value_type,
			shadow,
			declared_by,
		}
	}

	pub(crate) fn from_property(property: &Property, declared_by: &str) -> Self {
		Self::new(
			property.name().to_string(),
			property.value_type(),
			property.is_shadow(),
			declared_by.to_string(),
		)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value_type(&self) -> ValueType {
		self.value_type
	}

	/// Shadow columns are read and written but not exposed on the entity
	pub fn is_shadow(&self) -> bool {
		self.shadow
	}

	/// Entity type that declares this column
	pub fn declared_by(&self) -> &str {
		&self.declared_by
	}
}

/// Discriminator of a type inside a table-per-hierarchy tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorShape {
	column: String,
	value: String,
	hierarchy_values: Vec<String>,
}

impl DiscriminatorShape {
	pub(crate) fn new(column: String, value: String, hierarchy_values: Vec<String>) -> Self {
		Self {
			column,
			value,
			hierarchy_values,
		}
	}

	pub fn column(&self) -> &str {
		&self.column
	}

	/// Value stored for rows of exactly this type
	pub fn value(&self) -> &str {
		&self.value
	}

	/// Values of this type and all of its descendants, descendants first
	pub fn hierarchy_values(&self) -> &[String] {
		&self.hierarchy_values
	}
}

/// Derived metadata for one entity type
#[derive(Debug, Clone)]
pub struct EntityShape {
	id: ShapeId,
	entity: String,
	root: String,
	table: String,
	columns: Vec<ColumnShape>,
	key: Vec<usize>,
	discriminator: Option<DiscriminatorShape>,
}

impl EntityShape {
	pub(crate) fn new(
		id: ShapeId,
		entity: String,
		root: String,
		table: String,
		columns: Vec<ColumnShape>,
		key_columns: Vec<String>,
		discriminator: Option<DiscriminatorShape>,
	) -> Self {
		let key = key_columns
			.iter()
			.filter_map(|name| columns.iter().position(|c| c.name() == name))
			.collect();
		Self {
			id,
			entity,
			root,
			table,
			columns,
			key,
			discriminator,
		}
	}

	pub fn id(&self) -> ShapeId {
		self.id
	}

	/// Entity type name
	pub fn entity(&self) -> &str {
		&self.entity
	}

	/// Root of the hierarchy this type belongs to (itself when not derived)
	pub fn root(&self) -> &str {
		&self.root
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	/// Columns in projection order
	pub fn columns(&self) -> &[ColumnShape] {
		&self.columns
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(ColumnShape::name).collect()
	}

	/// Key columns in declaration order
	pub fn key_columns(&self) -> impl Iterator<Item = &ColumnShape> {
		self.key.iter().map(|&i| &self.columns[i])
	}

	pub fn key_column_names(&self) -> Vec<&str> {
		self.key_columns().map(ColumnShape::name).collect()
	}

	pub fn key_arity(&self) -> usize {
		self.key.len()
	}

	pub fn discriminator(&self) -> Option<&DiscriminatorShape> {
		self.discriminator.as_ref()
	}

	/// Check a key's arity and component types against this shape
	pub fn check_key(&self, values: &[Value]) -> Result<()> {
		if values.len() != self.key.len() {
			return Err(LookupError::ShapeMismatch {
				entity: self.entity.clone(),
				expected: self.key.len(),
				actual: values.len(),
			});
		}
		for (column, value) in self.key_columns().zip(values) {
			if column.value_type() != value.value_type() {
				return Err(LookupError::KeyTypeMismatch {
					entity: self.entity.clone(),
					column: column.name().to_string(),
					expected: column.value_type(),
					actual: value.value_type(),
				});
			}
		}
		Ok(())
	}
}
