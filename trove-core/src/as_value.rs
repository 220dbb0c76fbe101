use crate::{Error, Result, Value, ValueKind};
use std::any;

/// Conversion between a Rust field type and its [`Value`] cell.
///
/// `KIND` ties the type to its entry in the coercion table. Reading goes through
/// [`ValueKind::coerce`] first, so `try_from_value` accepts any cell the table accepts
/// for that kind (an integer stored as text, a boolean stored as `1`, ...).
///
/// # Examples
/// ```rust
/// use trove_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Integer(42));
/// let n: i32 = AsValue::try_from_value(Value::Text("42".into())).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    const KIND: ValueKind;
    fn as_value(&self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn canonical<T: AsValue>(value: Value) -> Result<Value> {
    T::KIND.coerce(any::type_name::<T>(), &value)
}

fn unexpected<T>(value: Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>(),
    ))
}

macro_rules! impl_as_value {
    ($source:ty, $kind:path, $variant:path) => {
        impl AsValue for $source {
            const KIND: ValueKind = $kind;
            fn as_value(&self) -> Value {
                $variant(*self as _)
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match canonical::<Self>(value)? {
                    $variant(v) => Ok(v as _),
                    v => Err(unexpected::<Self>(v)),
                }
            }
        }
    };
}

impl_as_value!(i16, ValueKind::Short, Value::Integer);
impl_as_value!(i32, ValueKind::Int, Value::Integer);
impl_as_value!(i64, ValueKind::Long, Value::Integer);
impl_as_value!(f32, ValueKind::Float, Value::Real);
impl_as_value!(f64, ValueKind::Double, Value::Real);
impl_as_value!(bool, ValueKind::Bool, Value::Boolean);

impl AsValue for String {
    const KIND: ValueKind = ValueKind::Text;
    fn as_value(&self) -> Value {
        Value::Text(self.clone())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match canonical::<Self>(value)? {
            Value::Text(v) => Ok(v),
            v => Err(unexpected::<Self>(v)),
        }
    }
}

impl AsValue for char {
    const KIND: ValueKind = ValueKind::Char;
    fn as_value(&self) -> Value {
        Value::Text(self.to_string())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match canonical::<Self>(value)? {
            Value::Text(v) => v
                .chars()
                .next()
                .ok_or_else(|| unexpected::<Self>(Value::Text(v.clone()))),
            v => Err(unexpected::<Self>(v)),
        }
    }
}

impl AsValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Blob;
    fn as_value(&self) -> Value {
        Value::Blob(self.as_slice().into())
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match canonical::<Self>(value)? {
            Value::Blob(v) => Ok(v.into_vec()),
            v => Err(unexpected::<Self>(v)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    const KIND: ValueKind = T::KIND.nullable();
    fn as_value(&self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}
