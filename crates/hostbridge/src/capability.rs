//! Capability traits
//!
//! A native type opts into a host behavior by implementing the matching trait
//! and enabling it on its [`Class`](crate::lang::Class) builder. The set of
//! enabled capabilities is fixed when the class is built and stored as
//! [`Capabilities`] flags, so dispatch never has to probe the type at call
//! time.
//!
//! Hooks with a default body return [`NativeError::NotImplemented`], which
//! makes the bridge fall back to the host's default behavior.

use std::cmp::Ordering;

use bitflags::bitflags;
use hostbridge_runtime::Value;

use crate::error::{NativeError, NativeResult};
use crate::vm::Parameters;

bitflags! {
    /// Capabilities a native class provides
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        /// `count($o)`
        const COUNTABLE = 1 << 0;
        /// `$o[...]`
        const ARRAY_ACCESS = 1 << 1;
        /// `__get` / `__set` / `__isset` / `__unset`
        const MAGIC_PROPERTIES = 1 << 2;
        /// `__call`
        const MAGIC_CALL = 1 << 3;
        /// `__callStatic`
        const MAGIC_CALL_STATIC = 1 << 4;
        /// `__invoke`
        const INVOKABLE = 1 << 5;
        /// `(int)`, `(float)`, `(bool)`, `(string)`
        const CASTABLE = 1 << 6;
        /// `__destruct`
        const DESTRUCTIBLE = 1 << 7;
        /// `<=>`
        const COMPARABLE = 1 << 8;
        /// `clone $o`
        const CLONABLE = 1 << 9;
    }
}

/// Objects usable with `count()`
pub trait Countable {
    /// Number of elements
    fn count(&mut self) -> NativeResult<i64>;
}

/// Objects usable with index syntax
pub trait ArrayAccess {
    /// `isset($o[offset])`
    fn offset_exists(&mut self, offset: &Value) -> NativeResult<bool>;

    /// `$o[offset]`
    fn offset_get(&mut self, offset: &Value) -> NativeResult<Value>;

    /// `$o[offset] = value`; `offset` is `None` for `$o[] = value`
    fn offset_set(&mut self, offset: Option<&Value>, value: Value) -> NativeResult<()>;

    /// `unset($o[offset])`
    fn offset_unset(&mut self, offset: &Value) -> NativeResult<()>;
}

/// Undeclared property access
pub trait MagicProperties {
    /// `__get`
    fn magic_get(&mut self, _name: &str) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `__set`
    fn magic_set(&mut self, _name: &str, _value: Value) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `__isset`
    fn magic_isset(&mut self, _name: &str) -> NativeResult<bool> {
        Err(NativeError::NotImplemented)
    }

    /// `__unset`
    fn magic_unset(&mut self, _name: &str) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }
}

/// Calls to undeclared instance methods
pub trait MagicCall {
    /// `__call`
    fn magic_call(&mut self, name: &str, params: &Parameters) -> NativeResult<Value>;
}

/// Calls to undeclared static methods
pub trait MagicStaticCall {
    /// `__callStatic`
    fn magic_call_static(name: &str, params: &Parameters) -> NativeResult<Value>;
}

/// Objects callable as functions
pub trait Invokable {
    /// `__invoke`
    fn invoke(&mut self, params: &Parameters) -> NativeResult<Value>;
}

/// Objects with custom conversions
pub trait Castable {
    /// `(int)`
    fn cast_to_integer(&mut self) -> NativeResult<i64> {
        Err(NativeError::NotImplemented)
    }

    /// `(float)`
    fn cast_to_double(&mut self) -> NativeResult<f64> {
        Err(NativeError::NotImplemented)
    }

    /// `(bool)`
    fn cast_to_bool(&mut self) -> NativeResult<bool> {
        Err(NativeError::NotImplemented)
    }

    /// `(string)`
    fn cast_to_string(&mut self) -> NativeResult<String> {
        Err(NativeError::NotImplemented)
    }
}

/// Objects with a destructor visible to the host
pub trait Destructible {
    /// `__destruct`
    fn destruct(&mut self) -> NativeResult<()>;
}

/// Objects with a custom ordering
pub trait Comparable {
    /// Compare with another instance of the same class
    fn compare(&self, other: &Self) -> NativeResult<Ordering>;
}
