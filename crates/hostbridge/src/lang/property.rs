//! Explicit properties backed by a fixed value or by native accessors

use std::any::Any;
use std::fmt;

use hostbridge_runtime::{Scalar, Value, ValueType};

use super::Modifier;
use crate::convert::{FromValue, IntoValue};
use crate::error::{NativeError, NativeResult};

/// Value kinds an explicit property can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// null
    Null,
    /// bool
    Bool,
    /// int
    Integer,
    /// float
    Float,
    /// string
    String,
}

impl PropertyKind {
    fn of(value: &Scalar) -> Self {
        match value.value_type() {
            ValueType::Bool => PropertyKind::Bool,
            ValueType::Long => PropertyKind::Integer,
            ValueType::Double => PropertyKind::Float,
            ValueType::String => PropertyKind::String,
            _ => PropertyKind::Null,
        }
    }
}

/// Rust types usable as explicit property values
pub trait PropertyValue: FromValue + IntoValue + 'static {
    /// Host kind of the type
    const KIND: PropertyKind;
}

impl PropertyValue for bool {
    const KIND: PropertyKind = PropertyKind::Bool;
}

impl PropertyValue for i64 {
    const KIND: PropertyKind = PropertyKind::Integer;
}

impl PropertyValue for f64 {
    const KIND: PropertyKind = PropertyKind::Float;
}

impl PropertyValue for String {
    const KIND: PropertyKind = PropertyKind::String;
}

/// Erased property getter
pub type Getter = Box<dyn Fn(&dyn Any) -> NativeResult<Value> + Send + Sync>;
/// Erased property setter
pub type Setter = Box<dyn Fn(&mut dyn Any, &Value) -> NativeResult<()> + Send + Sync>;

enum Access {
    Fixed(Scalar),
    Accessors { getter: Getter, setter: Option<Setter> },
}

/// Explicit property of a native class.
///
/// Explicit properties take precedence over magic property hooks and over
/// the host's property table. A property is read-only when it holds a fixed
/// value, has no setter, or carries the `CONST` flag.
pub struct PropertyDescriptor {
    kind: PropertyKind,
    flags: Modifier,
    access: Access,
}

impl PropertyDescriptor {
    /// Read-only property with a fixed value
    pub fn fixed(value: impl Into<Scalar>, flags: Modifier) -> Self {
        let value = value.into();
        Self {
            kind: PropertyKind::of(&value),
            flags,
            access: Access::Fixed(value),
        }
    }

    /// Property backed by a native getter and an optional setter
    pub fn accessor<T, V>(getter: fn(&T) -> V, setter: Option<fn(&mut T, V)>, flags: Modifier) -> Self
    where
        T: 'static,
        V: PropertyValue,
    {
        let get: Getter = Box::new(move |native: &dyn Any| {
            let native = native.downcast_ref::<T>().ok_or_else(foreign_instance::<T>)?;
            Ok(getter(native).into_value())
        });
        let set = setter.map(|setter| -> Setter {
            Box::new(move |native: &mut dyn Any, value: &Value| {
                let native = native.downcast_mut::<T>().ok_or_else(foreign_instance::<T>)?;
                setter(native, V::from_value(value)?);
                Ok(())
            })
        });
        Self {
            kind: V::KIND,
            flags,
            access: Access::Accessors {
                getter: get,
                setter: set,
            },
        }
    }

    /// Value kind
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Access flags
    pub fn flags(&self) -> Modifier {
        self.flags
    }

    /// Check if writes are refused
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(Modifier::CONST)
            || match &self.access {
                Access::Fixed(_) => true,
                Access::Accessors { setter, .. } => setter.is_none(),
            }
    }

    /// Read the property of `native`
    pub fn get(&self, native: &dyn Any) -> NativeResult<Value> {
        match &self.access {
            Access::Fixed(value) => Ok(value.to_value()),
            Access::Accessors { getter, .. } => getter(native),
        }
    }

    /// Write the property of `native`; returns `false` if the property is
    /// read-only and nothing was written
    pub fn set(&self, native: &mut dyn Any, value: &Value) -> NativeResult<bool> {
        if self.is_read_only() {
            return Ok(false);
        }
        match &self.access {
            Access::Accessors {
                setter: Some(setter),
                ..
            } => {
                setter(native, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn foreign_instance<T>() -> NativeError {
    NativeError::TypeMismatch {
        expected: std::any::type_name::<T>().to_string(),
        got: "foreign native instance".to_string(),
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i64,
    }

    fn counter_value(counter: &Counter) -> i64 {
        counter.value
    }

    fn set_counter_value(counter: &mut Counter, value: i64) {
        counter.value = value;
    }

    #[test]
    fn test_fixed_property_is_read_only() {
        let property = PropertyDescriptor::fixed("v1", Modifier::PUBLIC);
        let mut native = Counter { value: 0 };
        assert_eq!(property.kind(), PropertyKind::String);
        assert_eq!(property.get(&native).unwrap(), Value::string("v1"));
        assert!(!property.set(&mut native, &Value::string("v2")).unwrap());
        assert_eq!(property.get(&native).unwrap(), Value::string("v1"));
    }

    #[test]
    fn test_accessor_property() {
        let property = PropertyDescriptor::accessor::<Counter, i64>(
            counter_value,
            Some(set_counter_value),
            Modifier::PUBLIC,
        );
        let mut native = Counter { value: 1 };
        assert_eq!(property.kind(), PropertyKind::Integer);
        assert!(property.set(&mut native, &Value::string("7")).unwrap());
        assert_eq!(native.value, 7);
        assert_eq!(property.get(&native).unwrap(), Value::Long(7));

        let err = property.set(&mut native, &Value::string("seven")).unwrap_err();
        assert!(matches!(err, NativeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_getter_only_property_refuses_writes() {
        let property = PropertyDescriptor::accessor::<Counter, i64>(
            counter_value,
            None,
            Modifier::PUBLIC,
        );
        let mut native = Counter { value: 3 };
        assert!(property.is_read_only());
        assert!(!property.set(&mut native, &Value::Long(9)).unwrap());
        assert_eq!(native.value, 3);
    }
}
