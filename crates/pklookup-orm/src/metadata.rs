//! # Model metadata
//!
//! Entity types are declared with [`EntityDef`] and registered on a
//! [`ModelBuilder`]. Building the model validates the declarations, flattens
//! each table-per-hierarchy tree once, and derives an immutable
//! [`EntityShape`] for every entity type.
//!
//! ```rust
//! use pklookup_orm::metadata::{EntityDef, ModelBuilder, Property};
//! use pklookup_query::ValueType;
//!
//! let model = ModelBuilder::new()
//!     .entity(
//!         EntityDef::new("BaseType")
//!             .property(Property::new("Id", ValueType::Integer))
//!             .property(Property::new("Foo", ValueType::Text))
//!             .key(["Id"])
//!             .discriminator_column("Discriminator"),
//!     )
//!     .entity(
//!         EntityDef::new("DerivedType")
//!             .base("BaseType")
//!             .property(Property::new("Boo", ValueType::Text)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let shape = model.shape("BaseType").unwrap();
//! assert_eq!(shape.column_names(), vec!["Id", "Discriminator", "Foo", "Boo"]);
//! assert!(model.is_assignable("DerivedType", "BaseType"));
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use pklookup_query::ValueType;

use crate::shape::{ColumnShape, DiscriminatorShape, EntityShape, ShapeId};

/// Errors raised while building a model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
	#[error("Entity '{0}' is declared more than once")]
	DuplicateEntity(String),

	#[error("Entity '{entity}' derives from unknown type '{base}'")]
	UnknownBase { entity: String, base: String },

	#[error("Inheritance cycle detected at entity '{0}'")]
	InheritanceCycle(String),

	#[error("Entity '{0}' is a hierarchy root but declares no key")]
	MissingKey(String),

	#[error("Entity '{0}' derives from another type and cannot declare its own key")]
	KeyOnDerived(String),

	#[error("Key column '{column}' is not a property of entity '{entity}'")]
	UnknownKeyProperty { entity: String, column: String },

	#[error("Column '{column}' is mapped twice in the hierarchy of '{entity}'")]
	DuplicateColumn { entity: String, column: String },

	#[error("Entity '{0}' derives from another type and cannot declare a discriminator column")]
	DiscriminatorOnDerived(String),

	#[error("Hierarchy '{0}' has derived types but no discriminator column")]
	MissingDiscriminator(String),

	#[error("Discriminator value '{value}' is used twice in hierarchy '{root}'")]
	DuplicateDiscriminatorValue { root: String, value: String },
}

/// A mapped property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
	name: String,
	value_type: ValueType,
	shadow: bool,
}

impl Property {
	/// Create a property exposed on the entity
	pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
		Self {
			name: name.into(),
			value_type,
			shadow: false,
		}
	}

	/// Mark the property as shadow state: mapped, but not exposed on the entity
	pub fn shadow(mut self) -> Self {
		self.shadow = true;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value_type(&self) -> ValueType {
		self.value_type
	}

	pub fn is_shadow(&self) -> bool {
		self.shadow
	}
}

/// Declaration of one entity type
#[derive(Debug, Clone, Default)]
pub struct EntityDef {
	name: String,
	table: Option<String>,
	base: Option<String>,
	properties: Vec<Property>,
	key: Vec<String>,
	discriminator_column: Option<String>,
	discriminator_value: Option<String>,
}

impl EntityDef {
	/// Start declaring an entity type
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	/// Table name; defaults to the entity name. Ignored on derived types.
	pub fn table(mut self, table: impl Into<String>) -> Self {
		self.table = Some(table.into());
		self
	}

	/// Declare the base type this entity derives from
	pub fn base(mut self, base: impl Into<String>) -> Self {
		self.base = Some(base.into());
		self
	}

	/// Add a mapped property
	pub fn property(mut self, property: Property) -> Self {
		self.properties.push(property);
		self
	}

	/// Declare the key columns in order
	pub fn key<I, S>(mut self, columns: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.key = columns.into_iter().map(Into::into).collect();
		self
	}

	/// Declare the discriminator column of a hierarchy root
	///
	/// The column is mapped as a shadow text property.
	pub fn discriminator_column(mut self, column: impl Into<String>) -> Self {
		self.discriminator_column = Some(column.into());
		self
	}

	/// Discriminator value stored for this type; defaults to the entity name
	pub fn discriminator_value(mut self, value: impl Into<String>) -> Self {
		self.discriminator_value = Some(value.into());
		self
	}
}

#[derive(Debug)]
struct EntityType {
	def: EntityDef,
	root: String,
	children: Vec<String>,
	discriminator_value: Option<String>,
}

/// Builder collecting entity declarations
#[derive(Debug, Default)]
pub struct ModelBuilder {
	defs: Vec<EntityDef>,
}

impl ModelBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an entity type
	pub fn entity(mut self, def: EntityDef) -> Self {
		self.defs.push(def);
		self
	}

	/// Validate the declarations and derive all shapes
	pub fn build(self) -> Result<Model, ModelError> {
		let mut entities: IndexMap<String, EntityType> = IndexMap::new();
		for def in self.defs {
			let name = def.name.clone();
			if entities.contains_key(&name) {
				return Err(ModelError::DuplicateEntity(name));
			}
			entities.insert(
				name.clone(),
				EntityType {
					def,
					root: name,
					children: Vec::new(),
					discriminator_value: None,
				},
			);
		}

		resolve_roots(&mut entities)?;

		let names: Vec<String> = entities.keys().cloned().collect();
		for name in &names {
			let Some(base) = entities[name].def.base.clone() else {
				continue;
			};
			if let Some(parent) = entities.get_mut(&base) {
				parent.children.push(name.clone());
			}
		}

		for entity in entities.values() {
			validate_entity(entity)?;
		}

		let mut shapes = HashMap::new();
		let roots: Vec<String> = names
			.iter()
			.filter(|name| entities[*name].def.base.is_none())
			.cloned()
			.collect();
		for root in &roots {
			assign_discriminator_values(&mut entities, root)?;
			let columns = hierarchy_columns(&entities, root)?;
			let table = entities[root]
				.def
				.table
				.clone()
				.unwrap_or_else(|| root.clone());
			let key = &entities[root].def.key;
			let discriminator_column = entities[root].def.discriminator_column.clone();

			for member in descendants_pre_order(&entities, root) {
				let discriminator = match (&discriminator_column, &entities[&member].discriminator_value)
				{
					(Some(column), Some(value)) => {
						let mut hierarchy_values = Vec::new();
						for descendant in descendants_post_order(&entities, &member) {
							if let Some(v) = &entities[&descendant].discriminator_value {
								hierarchy_values.push(v.clone());
							}
						}
						Some(DiscriminatorShape::new(
							column.clone(),
							value.clone(),
							hierarchy_values,
						))
					}
					_ => None,
				};
				let shape = EntityShape::new(
					ShapeId::next(),
					member.clone(),
					root.clone(),
					table.clone(),
					columns.clone(),
					key.clone(),
					discriminator,
				);
				tracing::trace!(entity = %member, table = %table, "derived entity shape");
				shapes.insert(member, Arc::new(shape));
			}
		}

		let discriminators = entities
			.iter()
			.filter_map(|(name, entity)| {
				entity
					.discriminator_value
					.as_ref()
					.map(|value| ((entity.root.clone(), value.clone()), name.clone()))
			})
			.collect();
		let bases = entities
			.iter()
			.map(|(name, entity)| (name.clone(), entity.def.base.clone()))
			.collect();

		Ok(Model {
			shapes,
			discriminators,
			bases,
		})
	}
}

fn resolve_roots(entities: &mut IndexMap<String, EntityType>) -> Result<(), ModelError> {
	let names: Vec<String> = entities.keys().cloned().collect();
	for name in &names {
		let mut seen = HashSet::new();
		let mut current = name.clone();
		seen.insert(current.clone());
		while let Some(base) = entities[&current].def.base.clone() {
			if !entities.contains_key(&base) {
				return Err(ModelError::UnknownBase {
					entity: current,
					base,
				});
			}
			if !seen.insert(base.clone()) {
				return Err(ModelError::InheritanceCycle(name.clone()));
			}
			current = base;
		}
		if let Some(entity) = entities.get_mut(name) {
			entity.root = current;
		}
	}
	Ok(())
}

fn validate_entity(entity: &EntityType) -> Result<(), ModelError> {
	let def = &entity.def;
	if def.base.is_some() {
		if !def.key.is_empty() {
			return Err(ModelError::KeyOnDerived(def.name.clone()));
		}
		if def.discriminator_column.is_some() {
			return Err(ModelError::DiscriminatorOnDerived(def.name.clone()));
		}
		return Ok(());
	}

	if def.key.is_empty() {
		return Err(ModelError::MissingKey(def.name.clone()));
	}
	for column in &def.key {
		if !def.properties.iter().any(|p| p.name() == column) {
			return Err(ModelError::UnknownKeyProperty {
				entity: def.name.clone(),
				column: column.clone(),
			});
		}
	}
	if !entity.children.is_empty() && def.discriminator_column.is_none() {
		return Err(ModelError::MissingDiscriminator(def.name.clone()));
	}
	Ok(())
}

fn assign_discriminator_values(
	entities: &mut IndexMap<String, EntityType>,
	root: &str,
) -> Result<(), ModelError> {
	if entities[root].def.discriminator_column.is_none() {
		return Ok(());
	}
	let mut used = HashSet::new();
	for member in descendants_pre_order(entities, root) {
		let Some(entity) = entities.get_mut(&member) else {
			continue;
		};
		let value = entity
			.def
			.discriminator_value
			.clone()
			.unwrap_or_else(|| member.clone());
		if !used.insert(value.clone()) {
			return Err(ModelError::DuplicateDiscriminatorValue {
				root: root.to_string(),
				value,
			});
		}
		entity.discriminator_value = Some(value);
	}
	Ok(())
}

/// Key columns, then the discriminator, then the root's remaining
/// properties, then each descendant's own properties (pre-order).
fn hierarchy_columns(
	entities: &IndexMap<String, EntityType>,
	root: &str,
) -> Result<Vec<ColumnShape>, ModelError> {
	let root_def = &entities[root].def;
	let mut columns: Vec<ColumnShape> = Vec::new();
	let push = |columns: &mut Vec<ColumnShape>, column: ColumnShape| {
		if columns.iter().any(|c| c.name() == column.name()) {
			return Err(ModelError::DuplicateColumn {
				entity: root.to_string(),
				column: column.name().to_string(),
			});
		}
		columns.push(column);
		Ok(())
	};

	for key in &root_def.key {
		if let Some(property) = root_def.properties.iter().find(|p| p.name() == key) {
			push(&mut columns, ColumnShape::from_property(property, root))?;
		}
	}
	if let Some(column) = &root_def.discriminator_column {
		push(
			&mut columns,
			ColumnShape::new(column.clone(), ValueType::Text, true, root.to_string()),
		)?;
	}
	for member in descendants_pre_order(entities, root) {
		for property in &entities[&member].def.properties {
			if member == root && root_def.key.iter().any(|k| k == property.name()) {
				continue;
			}
			push(&mut columns, ColumnShape::from_property(property, &member))?;
		}
	}
	Ok(columns)
}

fn descendants_pre_order(entities: &IndexMap<String, EntityType>, name: &str) -> Vec<String> {
	let mut out = vec![name.to_string()];
	for child in &entities[name].children {
		out.extend(descendants_pre_order(entities, child));
	}
	out
}

/// Descendants before the type itself, e.g. `DerivedType, BaseType`.
fn descendants_post_order(entities: &IndexMap<String, EntityType>, name: &str) -> Vec<String> {
	let mut out = Vec::new();
	for child in &entities[name].children {
		out.extend(descendants_post_order(entities, child));
	}
	out.push(name.to_string());
	out
}

/// Immutable model metadata
#[derive(Debug)]
pub struct Model {
	shapes: HashMap<String, Arc<EntityShape>>,
	discriminators: HashMap<(String, String), String>,
	bases: HashMap<String, Option<String>>,
}

impl Model {
	/// Start building a model
	pub fn builder() -> ModelBuilder {
		ModelBuilder::new()
	}

	/// Shape of an entity type
	pub fn shape(&self, entity: &str) -> Option<&Arc<EntityShape>> {
		self.shapes.get(entity)
	}

	/// Entity type owning a discriminator value within a hierarchy
	pub fn entity_for_discriminator(&self, root: &str, value: &str) -> Option<&str> {
		self.discriminators
			.get(&(root.to_string(), value.to_string()))
			.map(String::as_str)
	}

	/// Whether an instance of `actual` can be returned for a lookup of `requested`
	pub fn is_assignable(&self, actual: &str, requested: &str) -> bool {
		let mut current = Some(actual);
		while let Some(name) = current {
			if name == requested {
				return true;
			}
			current = self.bases.get(name).and_then(|base| base.as_deref());
		}
		false
	}

	/// Names of all entity types
	pub fn entity_names(&self) -> impl Iterator<Item = &str> {
		self.bases.keys().map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	fn hierarchy() -> ModelBuilder {
		ModelBuilder::new()
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
	}

	#[rstest]
	fn test_hierarchy_column_order() {
		let model = hierarchy().build().unwrap();

		for entity in ["BaseType", "DerivedType"] {
			let shape = model.shape(entity).unwrap();
			assert_eq!(shape.table(), "BaseType");
			assert_eq!(shape.column_names(), vec!["Id", "Discriminator", "Foo", "Boo"]);
			assert_eq!(shape.key_column_names(), vec!["Id"]);
		}
	}

	#[rstest]
	fn test_columns_record_declaring_entity() {
		let model = hierarchy().build().unwrap();
		let shape = model.shape("DerivedType").unwrap();

		let declared: Vec<(&str, &str)> = shape
			.columns()
			.iter()
			.map(|column| (column.name(), column.declared_by()))
			.collect();

		assert_eq!(
			declared,
			vec![
				("Id", "BaseType"),
				("Discriminator", "BaseType"),
				("Foo", "BaseType"),
				("Boo", "DerivedType"),
			]
		);
	}

	#[rstest]
	fn test_discriminator_sets() {
		let model = hierarchy().build().unwrap();

		let base = model.shape("BaseType").unwrap().discriminator().unwrap();
		assert_eq!(base.value(), "BaseType");
		assert_eq!(base.hierarchy_values(), ["DerivedType", "BaseType"]);

		let derived = model.shape("DerivedType").unwrap().discriminator().unwrap();
		assert_eq!(derived.value(), "DerivedType");
		assert_eq!(derived.hierarchy_values(), ["DerivedType"]);
	}

	#[rstest]
	fn test_deep_hierarchy_post_order() {
		let model = hierarchy()
			.entity(
				EntityDef::new("Leaf")
					.base("DerivedType")
					.property(Property::new("Zed", ValueType::Integer))
					.discriminator_value("L"),
			)
			.entity(EntityDef::new("Sibling").base("BaseType"))
			.build()
			.unwrap();

		let base = model.shape("BaseType").unwrap();
		assert_eq!(
			base.discriminator().unwrap().hierarchy_values(),
			["L", "DerivedType", "Sibling", "BaseType"]
		);
		assert_eq!(base.column_names(), vec!["Id", "Discriminator", "Foo", "Boo", "Zed"]);
		assert_eq!(model.entity_for_discriminator("BaseType", "L"), Some("Leaf"));
		assert!(model.is_assignable("Leaf", "BaseType"));
		assert!(!model.is_assignable("Sibling", "DerivedType"));
	}

	#[rstest]
	fn test_composite_key_order() {
		let model = ModelBuilder::new()
			.entity(
				EntityDef::new("CompositeKey")
					.property(Property::new("Foo", ValueType::Text))
					.property(Property::new("Id2", ValueType::Text))
					.property(Property::new("Id1", ValueType::Integer))
					.key(["Id1", "Id2"]),
			)
			.build()
			.unwrap();

		let shape = model.shape("CompositeKey").unwrap();
		assert_eq!(shape.column_names(), vec!["Id1", "Id2", "Foo"]);
		assert!(shape.discriminator().is_none());
	}

	#[rstest]
	fn test_shapes_get_distinct_ids() {
		let first = hierarchy().build().unwrap();
		let second = hierarchy().build().unwrap();

		assert_ne!(
			first.shape("BaseType").unwrap().id(),
			second.shape("BaseType").unwrap().id()
		);
		assert_ne!(
			first.shape("BaseType").unwrap().id(),
			first.shape("DerivedType").unwrap().id()
		);
	}

	#[rstest]
	#[case::duplicate(
		hierarchy().entity(EntityDef::new("BaseType")),
		ModelError::DuplicateEntity("BaseType".into())
	)]
	#[case::unknown_base(
		hierarchy().entity(EntityDef::new("Orphan").base("Nope")),
		ModelError::UnknownBase { entity: "Orphan".into(), base: "Nope".into() }
	)]
	#[case::key_on_derived(
		hierarchy().entity(EntityDef::new("Bad").base("BaseType").key(["Id"])),
		ModelError::KeyOnDerived("Bad".into())
	)]
	#[case::missing_key(
		ModelBuilder::new().entity(EntityDef::new("NoKey").property(Property::new("Foo", ValueType::Text))),
		ModelError::MissingKey("NoKey".into())
	)]
	#[case::unknown_key_property(
		ModelBuilder::new().entity(EntityDef::new("E").key(["Id"])),
		ModelError::UnknownKeyProperty { entity: "E".into(), column: "Id".into() }
	)]
	#[case::duplicate_column(
		hierarchy().entity(
			EntityDef::new("Clash").base("BaseType").property(Property::new("Foo", ValueType::Text))
		),
		ModelError::DuplicateColumn { entity: "BaseType".into(), column: "Foo".into() }
	)]
	#[case::duplicate_discriminator(
		hierarchy().entity(EntityDef::new("Other").base("BaseType").discriminator_value("BaseType")),
		ModelError::DuplicateDiscriminatorValue { root: "BaseType".into(), value: "BaseType".into() }
	)]
	fn test_build_errors(#[case] builder: ModelBuilder, #[case] expected: ModelError) {
		assert_eq!(builder.build().unwrap_err(), expected);
	}

	#[rstest]
	fn test_missing_discriminator() {
		let err = ModelBuilder::new()
			.entity(
				EntityDef::new("Animal")
					.property(Property::new("Id", ValueType::Integer))
					.key(["Id"]),
			)
			.entity(EntityDef::new("Cat").base("Animal"))
			.build()
			.unwrap_err();

		assert_eq!(err, ModelError::MissingDiscriminator("Animal".into()));
	}

	#[rstest]
	fn test_inheritance_cycle() {
		let err = ModelBuilder::new()
			.entity(EntityDef::new("A").base("B"))
			.entity(EntityDef::new("B").base("A"))
			.build()
			.unwrap_err();

		assert!(matches!(err, ModelError::InheritanceCycle(_)));
	}
}
