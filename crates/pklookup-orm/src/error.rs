//! Error types for key lookups

use pklookup_query::ValueType;

use crate::metadata::ModelError;
use crate::settings::SettingsError;

/// Result type for lookup operations
pub type Result<T> = std::result::Result<T, LookupError>;

/// Errors that can occur while compiling or executing a key lookup
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
	/// The key has a different number of components than the entity's key
	#[error("Key for entity '{entity}' has {actual} value(s), expected {expected}")]
	ShapeMismatch {
		entity: String,
		expected: usize,
		actual: usize,
	},

	/// A key component's type does not match its column
	#[error("Key column '{column}' of entity '{entity}' is {expected}, got {actual}")]
	KeyTypeMismatch {
		entity: String,
		column: String,
		expected: ValueType,
		actual: ValueType,
	},

	/// Concrete lookup requested for a type outside any discriminated hierarchy
	#[error("Entity '{entity}' has no discriminator value in the model")]
	UnknownDiscriminator { entity: String },

	/// Entity name not present in the model
	#[error("Unknown entity type '{0}'")]
	UnknownEntity(String),

	/// A stored row carries a discriminator value no type in the hierarchy owns
	#[error("Discriminator value '{value}' does not belong to hierarchy '{root}'")]
	UnknownDiscriminatorValue { root: String, value: String },

	/// A record cannot be tracked because part of its key is missing
	#[error("Record of entity '{entity}' has a null key component")]
	NullKey { entity: String },

	/// A row collides with an entry of an unrelated type already tracked under the same key
	#[error("Row for '{entity}' conflicts with a tracked '{tracked}' with the same key")]
	IdentityConflict { entity: String, tracked: String },

	/// Model metadata is invalid
	#[error("Model error: {0}")]
	Model(#[from] ModelError),

	/// Settings could not be loaded
	#[error("Settings error: {0}")]
	Settings(#[from] SettingsError),

	/// Database error, propagated unchanged
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	/// Deserialization error
	#[error("Failed to deserialize record: {0}")]
	Deserialization(#[from] serde_json::Error),
}
