//! SQL values and their semantic types.

use std::fmt;

/// Semantic type of a column or key component.
///
/// The type decides how a literal is rendered (quoted or not) and how a
/// stored value is decoded back out of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
	/// `0`/`1` or `TRUE`/`FALSE`, depending on the dialect
	Boolean,
	/// Signed integer, rendered unquoted
	Integer,
	/// Floating point, rendered unquoted
	Real,
	/// Text, rendered single-quoted
	Text,
	/// Binary data, rendered as a hex blob literal
	Blob,
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Boolean => "boolean",
			Self::Integer => "integer",
			Self::Real => "real",
			Self::Text => "text",
			Self::Blob => "blob",
		};
		f.write_str(name)
	}
}

/// Core value representation for SQL parameters and literals.
///
/// All variants use `Option<T>`; a `None` value is SQL `NULL` of that type.
/// Heap-allocated payloads are boxed to keep the enum small.
///
/// ```rust
/// use pklookup_query::{Value, ValueType};
///
/// let id = Value::from(77);
/// assert_eq!(id.value_type(), ValueType::Integer);
/// assert!(!id.is_null());
/// assert!(Value::null(ValueType::Text).is_null());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	/// Boolean value
	Bool(Option<bool>),
	/// 32-bit signed integer
	Int(Option<i32>),
	/// 64-bit signed integer
	BigInt(Option<i64>),
	/// 64-bit floating point
	Double(Option<f64>),
	/// String value (boxed)
	String(Option<Box<String>>),
	/// Binary data (boxed)
	Bytes(Option<Box<Vec<u8>>>),
}

impl Value {
	/// A typed `NULL`.
	#[must_use]
	pub fn null(value_type: ValueType) -> Self {
		match value_type {
			ValueType::Boolean => Self::Bool(None),
			ValueType::Integer => Self::BigInt(None),
			ValueType::Real => Self::Double(None),
			ValueType::Text => Self::String(None),
			ValueType::Blob => Self::Bytes(None),
		}
	}

	/// Returns `true` if this value is null.
	#[must_use]
	pub fn is_null(&self) -> bool {
		match self {
			Self::Bool(v) => v.is_none(),
			Self::Int(v) => v.is_none(),
			Self::BigInt(v) => v.is_none(),
			Self::Double(v) => v.is_none(),
			Self::String(v) => v.is_none(),
			Self::Bytes(v) => v.is_none(),
		}
	}

	/// The semantic type tag of this value.
	#[must_use]
	pub fn value_type(&self) -> ValueType {
		match self {
			Self::Bool(_) => ValueType::Boolean,
			Self::Int(_) | Self::BigInt(_) => ValueType::Integer,
			Self::Double(_) => ValueType::Real,
			Self::String(_) => ValueType::Text,
			Self::Bytes(_) => ValueType::Blob,
		}
	}

	/// Integer payload widened to `i64`, if this is a non-null integer.
	#[must_use]
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Int(Some(v)) => Some(i64::from(*v)),
			Self::BigInt(Some(v)) => Some(*v),
			_ => None,
		}
	}

	/// Text payload, if this is a non-null string.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(Some(v)) => Some(v.as_str()),
			_ => None,
		}
	}

	/// Convert to a JSON value for serde-based materialization.
	///
	/// Blobs become arrays of bytes, the same shape serde uses for `Vec<u8>`.
	#[must_use]
	pub fn to_json(&self) -> serde_json::Value {
		match self {
			Self::Bool(Some(b)) => serde_json::Value::Bool(*b),
			Self::Int(Some(i)) => serde_json::Value::from(*i),
			Self::BigInt(Some(i)) => serde_json::Value::from(*i),
			Self::Double(Some(f)) => serde_json::Number::from_f64(*f)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Self::String(Some(s)) => serde_json::Value::String(s.as_ref().clone()),
			Self::Bytes(Some(b)) => serde_json::Value::from(b.as_ref().clone()),
			_ => serde_json::Value::Null,
		}
	}
}

impl Default for Value {
	/// Returns the default value, which is a null string.
	fn default() -> Self {
		Self::String(None)
	}
}

/// Conversion into a [`Value`].
pub trait IntoValue {
	/// Convert `self` into a [`Value`].
	fn into_value(self) -> Value;
}

macro_rules! impl_into_value {
	($ty:ty, $variant:ident) => {
		impl IntoValue for $ty {
			fn into_value(self) -> Value {
				Value::$variant(Some(self))
			}
		}

		impl IntoValue for Option<$ty> {
			fn into_value(self) -> Value {
				Value::$variant(self)
			}
		}

		impl From<$ty> for Value {
			fn from(v: $ty) -> Self {
				v.into_value()
			}
		}

		impl From<Option<$ty>> for Value {
			fn from(v: Option<$ty>) -> Self {
				v.into_value()
			}
		}
	};
}

impl_into_value!(bool, Bool);
impl_into_value!(i32, Int);
impl_into_value!(i64, BigInt);
impl_into_value!(f64, Double);

impl IntoValue for String {
	fn into_value(self) -> Value {
		Value::String(Some(Box::new(self)))
	}
}

impl IntoValue for &str {
	fn into_value(self) -> Value {
		Value::String(Some(Box::new(self.to_string())))
	}
}

impl IntoValue for Vec<u8> {
	fn into_value(self) -> Value {
		Value::Bytes(Some(Box::new(self)))
	}
}

impl IntoValue for Value {
	fn into_value(self) -> Value {
		self
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		v.into_value()
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		v.into_value()
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		v.into_value()
	}
}

/// Ordered collection of parameter values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Values(pub Vec<Value>);

impl Values {
	/// Create an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a value.
	pub fn push(&mut self, value: Value) {
		self.0.push(value);
	}

	/// Number of values.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the collection is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterate over the values in order.
	pub fn iter(&self) -> std::slice::Iter<'_, Value> {
		self.0.iter()
	}
}

impl From<Vec<Value>> for Values {
	fn from(values: Vec<Value>) -> Self {
		Self(values)
	}
}

impl IntoIterator for Values {
	type Item = Value;
	type IntoIter = std::vec::IntoIter<Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a Values {
	type Item = &'a Value;
	type IntoIter = std::slice::Iter<'a, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
