//! Key values supplied to lookups

use pklookup_query::{IntoValue, Value};

/// An ordered tuple of key components
///
/// Scalars convert into single-component keys; tuples convert into
/// composite keys in declaration order.
///
/// ```rust
/// use pklookup_orm::KeyValue;
///
/// let single = KeyValue::from(77);
/// assert_eq!(single.len(), 1);
///
/// let composite = KeyValue::from((77, "Dog"));
/// assert_eq!(composite.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyValue(Vec<Value>);

impl KeyValue {
	pub fn new(values: Vec<Value>) -> Self {
		Self(values)
	}

	pub fn values(&self) -> &[Value] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Whether any component is `NULL`
	pub fn has_null(&self) -> bool {
		self.0.iter().any(Value::is_null)
	}

	pub fn into_values(self) -> Vec<Value> {
		self.0
	}
}

macro_rules! impl_scalar_key {
	($($ty:ty),* $(,)?) => {
		$(
			impl From<$ty> for KeyValue {
				fn from(v: $ty) -> Self {
					Self(vec![v.into_value()])
				}
			}
		)*
	};
}

impl_scalar_key!(
	bool,
	i32,
	i64,
	f64,
	Option<i32>,
	Option<i64>,
	String,
	&str,
	Vec<u8>,
	Value,
);

impl From<Vec<Value>> for KeyValue {
	fn from(values: Vec<Value>) -> Self {
		Self(values)
	}
}

impl<A: IntoValue, B: IntoValue> From<(A, B)> for KeyValue {
	fn from((a, b): (A, B)) -> Self {
		Self(vec![a.into_value(), b.into_value()])
	}
}

impl<A: IntoValue, B: IntoValue, C: IntoValue> From<(A, B, C)> for KeyValue {
	fn from((a, b, c): (A, B, C)) -> Self {
		Self(vec![a.into_value(), b.into_value(), c.into_value()])
	}
}
