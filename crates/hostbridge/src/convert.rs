//! Conversion between native Rust values and host values.
//!
//! [`FromValue`] extracts a Rust value from a host argument with the host's
//! weak-mode coercion rules; [`IntoValue`] turns a Rust return value into a
//! host value. [`to_host_value`] hands a value back to the engine in the form
//! the requested access needs.

use hostbridge_runtime::{AccessType, Value};

use crate::error::{NativeError, NativeResult};

/// Hand a value to the engine.
///
/// Plain reads, and values nobody else holds, are returned by value. A
/// write-mode fetch of a shared value is returned as a reference so writes
/// through it reach the shared storage.
pub fn to_host_value(value: Value, access: AccessType) -> Value {
    if !access.is_write() {
        return value.into_deref();
    }
    match value {
        Value::Reference(_) => value,
        other if other.is_shared() => Value::new_reference(other),
        other => other,
    }
}

/// Extract a Rust value from a host value
pub trait FromValue: Sized {
    /// Convert, coercing where the host would
    fn from_value(value: &Value) -> NativeResult<Self>;
}

/// Turn a Rust value into a host value
pub trait IntoValue {
    /// Convert
    fn into_value(self) -> Value;
}

fn mismatch(expected: &str, value: &Value) -> NativeError {
    NativeError::TypeMismatch {
        expected: expected.to_string(),
        got: value.type_name().to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value.deref(), Value::Array(_) | Value::Object(_))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> NativeResult<Self> {
        Ok(value.deref())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> NativeResult<Self> {
        if !is_scalar(value) {
            return Err(mismatch("bool", value));
        }
        Ok(value.to_bool())
    }
}

/// Whole doubles that fit in an `i64`; `i64::MAX as f64` rounds up to 2^63
fn is_whole_i64(d: f64) -> bool {
    d.fract() == 0.0 && d >= i64::MIN as f64 && d < -(i64::MIN as f64)
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> NativeResult<Self> {
        match value.deref() {
            Value::Long(i) => Ok(i),
            Value::Bool(b) => Ok(b as i64),
            Value::Null => Ok(0),
            Value::Double(d) if is_whole_i64(d) => Ok(d as i64),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .or_else(|_| {
                    s.trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|d| is_whole_i64(*d))
                        .map(|d| d as i64)
                        .ok_or(())
                })
                .map_err(|_| mismatch("int", value)),
            _ => Err(mismatch("int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> NativeResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| {
            NativeError::ArgumentError(format!("value {} is out of range for a 32-bit integer", wide))
        })
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> NativeResult<Self> {
        match value.deref() {
            Value::Double(d) => Ok(d),
            Value::Long(i) => Ok(i as f64),
            Value::Bool(b) => Ok(b as i64 as f64),
            Value::Null => Ok(0.0),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| mismatch("float", value)),
            _ => Err(mismatch("float", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> NativeResult<Self> {
        value.coerce_string().ok_or_else(|| mismatch("string", value))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> NativeResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Long(self as i64)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Long(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Double(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::Array(self.into_iter().map(IntoValue::into_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_runtime::HostArray;

    #[test]
    fn test_read_returns_plain_value() {
        let reference = Value::new_reference(Value::Long(3));
        let _alias = reference.clone();
        assert_eq!(to_host_value(reference, AccessType::Read), Value::Long(3));
    }

    #[test]
    fn test_write_fetch_of_shared_value_is_reference() {
        let reference = Value::new_reference(Value::Long(3));
        let alias = reference.clone();
        let fetched = to_host_value(alias, AccessType::Write);
        assert!(fetched.is_reference());

        let plain = to_host_value(Value::Long(3), AccessType::Write);
        assert!(!plain.is_reference());
    }

    #[test]
    fn test_weak_integer_coercion() {
        assert_eq!(i64::from_value(&Value::string(" 12 ")).unwrap(), 12);
        assert_eq!(i64::from_value(&Value::Double(4.0)).unwrap(), 4);
        assert!(i64::from_value(&Value::Double(4.5)).is_err());
        assert!(i64::from_value(&Value::string("twelve")).is_err());
        assert!(i32::from_value(&Value::Long(i64::MAX)).is_err());
    }

    #[test]
    fn test_out_of_range_double_is_rejected() {
        assert!(i64::from_value(&Value::Double(1e19)).is_err());
        assert!(i64::from_value(&Value::Double(-1e19)).is_err());
        assert!(i64::from_value(&Value::Double(9_223_372_036_854_775_808.0)).is_err());
        assert!(i64::from_value(&Value::string("1e19")).is_err());
        assert!(i64::from_value(&Value::Double(f64::INFINITY)).is_err());
        assert!(i64::from_value(&Value::Double(f64::NAN)).is_err());
        assert_eq!(i64::from_value(&Value::Double(i64::MIN as f64)).unwrap(), i64::MIN);
        assert_eq!(i64::from_value(&Value::Double(-4e18)).unwrap(), -4_000_000_000_000_000_000);
    }

    #[test]
    fn test_string_and_option() {
        assert_eq!(String::from_value(&Value::Long(7)).unwrap(), "7");
        assert!(String::from_value(&Value::Array(HostArray::new())).is_err());
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Long(1)).unwrap(), Some(1));
    }

    #[test]
    fn test_into_value() {
        assert_eq!(().into_value(), Value::Null);
        assert_eq!(Some("x").into_value(), Value::string("x"));
        assert_eq!(None::<i64>.into_value(), Value::Null);
        let list = vec![1i64, 2].into_value();
        assert_eq!(list.type_name(), "array");
    }
}
