//! Native class descriptions
//!
//! [`ClassDescription`] is the type-erased view the bridge has of a native
//! class: how to construct and clone instances, and one hook per capability.
//! Instances travel as `dyn Any`; every hook defaults to
//! [`NativeError::NotImplemented`].
//!
//! [`NativeHooks<T>`] is the description built by [`Class<T>`]: a table of
//! monomorphized thunks that downcast the instance back to `T` and call the
//! capability trait methods.
//!
//! [`Class<T>`]: crate::lang::Class

use std::any::{type_name, Any};
use std::cmp::Ordering;
use std::marker::PhantomData;

use hostbridge_runtime::Value;

use crate::capability::{
    ArrayAccess, Capabilities, Castable, Comparable, Countable, Destructible, Invokable,
    MagicCall, MagicProperties, MagicStaticCall,
};
use crate::error::{NativeError, NativeResult};
use crate::vm::Parameters;

/// Type-erased native instance
pub type NativeInstance = Box<dyn Any>;

/// Type-erased description of a native class
#[allow(unused_variables)]
pub trait ClassDescription: Send + Sync {
    /// Create a new native instance; `None` when the class cannot be instantiated
    fn construct(&self) -> Option<NativeInstance> {
        None
    }

    /// Copy a native instance
    fn clone_instance(&self, native: &dyn Any) -> NativeResult<NativeInstance> {
        Err(NativeError::NotImplemented)
    }

    /// Capabilities the class provides
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// `count($o)`
    fn count(&self, native: &mut dyn Any) -> NativeResult<i64> {
        Err(NativeError::NotImplemented)
    }

    /// `isset($o[offset])`
    fn offset_exists(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<bool> {
        Err(NativeError::NotImplemented)
    }

    /// `$o[offset]`
    fn offset_get(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `$o[offset] = value`
    fn offset_set(&self, native: &mut dyn Any, offset: Option<&Value>, value: Value) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `unset($o[offset])`
    fn offset_unset(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `__get`
    fn magic_get(&self, native: &mut dyn Any, name: &str) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `__set`
    fn magic_set(&self, native: &mut dyn Any, name: &str, value: Value) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `__isset`
    fn magic_isset(&self, native: &mut dyn Any, name: &str) -> NativeResult<bool> {
        Err(NativeError::NotImplemented)
    }

    /// `__unset`
    fn magic_unset(&self, native: &mut dyn Any, name: &str) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `__call`
    fn magic_call(&self, native: &mut dyn Any, name: &str, params: &Parameters) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `__callStatic`
    fn magic_call_static(&self, name: &str, params: &Parameters) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `__invoke`
    fn invoke(&self, native: &mut dyn Any, params: &Parameters) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `(int)`
    fn cast_to_integer(&self, native: &mut dyn Any) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `(float)`
    fn cast_to_double(&self, native: &mut dyn Any) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `(bool)`
    fn cast_to_bool(&self, native: &mut dyn Any) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `(string)`
    fn cast_to_string(&self, native: &mut dyn Any) -> NativeResult<Value> {
        Err(NativeError::NotImplemented)
    }

    /// `__destruct`
    fn destruct(&self, native: &mut dyn Any) -> NativeResult<()> {
        Err(NativeError::NotImplemented)
    }

    /// `<=>` between two instances of the class
    fn compare(&self, left: &dyn Any, right: &dyn Any) -> NativeResult<Ordering> {
        Err(NativeError::NotImplemented)
    }
}

/// Description of classes with no native instances (interfaces)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInstances;

impl ClassDescription for NoInstances {}

// ============================================================================
// Typed hooks
// ============================================================================

fn downcast<T: 'static>(native: &mut dyn Any) -> NativeResult<&mut T> {
    native.downcast_mut::<T>().ok_or_else(|| NativeError::TypeMismatch {
        expected: type_name::<T>().to_string(),
        got: "foreign native instance".to_string(),
    })
}

fn downcast_ref<T: 'static>(native: &dyn Any) -> NativeResult<&T> {
    native.downcast_ref::<T>().ok_or_else(|| NativeError::TypeMismatch {
        expected: type_name::<T>().to_string(),
        got: "foreign native instance".to_string(),
    })
}

struct PropertyHooks<T> {
    get: fn(&mut T, &str) -> NativeResult<Value>,
    set: fn(&mut T, &str, Value) -> NativeResult<()>,
    isset: fn(&mut T, &str) -> NativeResult<bool>,
    unset: fn(&mut T, &str) -> NativeResult<()>,
}

struct OffsetHooks<T> {
    exists: fn(&mut T, &Value) -> NativeResult<bool>,
    get: fn(&mut T, &Value) -> NativeResult<Value>,
    set: fn(&mut T, Option<&Value>, Value) -> NativeResult<()>,
    unset: fn(&mut T, &Value) -> NativeResult<()>,
}

struct CastHooks<T> {
    integer: fn(&mut T) -> NativeResult<i64>,
    double: fn(&mut T) -> NativeResult<f64>,
    bool: fn(&mut T) -> NativeResult<bool>,
    string: fn(&mut T) -> NativeResult<String>,
}

/// Description of the native type `T`, filled in by `Class<T>`
pub struct NativeHooks<T: 'static> {
    constructor: Option<fn() -> Option<T>>,
    capabilities: Capabilities,
    clone: Option<fn(&T) -> T>,
    count: Option<fn(&mut T) -> NativeResult<i64>>,
    offsets: Option<OffsetHooks<T>>,
    properties: Option<PropertyHooks<T>>,
    magic_call: Option<fn(&mut T, &str, &Parameters) -> NativeResult<Value>>,
    magic_call_static: Option<fn(&str, &Parameters) -> NativeResult<Value>>,
    invoke: Option<fn(&mut T, &Parameters) -> NativeResult<Value>>,
    casts: Option<CastHooks<T>>,
    destruct: Option<fn(&mut T) -> NativeResult<()>>,
    compare: Option<fn(&T, &T) -> NativeResult<Ordering>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> NativeHooks<T> {
    /// Hooks with the given constructor and no capabilities
    pub fn new(constructor: Option<fn() -> Option<T>>) -> Self {
        Self {
            constructor,
            capabilities: Capabilities::empty(),
            clone: None,
            count: None,
            offsets: None,
            properties: None,
            magic_call: None,
            magic_call_static: None,
            invoke: None,
            casts: None,
            destruct: None,
            compare: None,
            _marker: PhantomData,
        }
    }

    /// Enable cloning
    pub fn set_clone(&mut self)
    where
        T: Clone,
    {
        self.clone = Some(T::clone);
        self.capabilities |= Capabilities::CLONABLE;
    }

    /// Enable `count()`
    pub fn set_countable(&mut self)
    where
        T: Countable,
    {
        self.count = Some(T::count);
        self.capabilities |= Capabilities::COUNTABLE;
    }

    /// Enable index access
    pub fn set_array_access(&mut self)
    where
        T: ArrayAccess,
    {
        self.offsets = Some(OffsetHooks {
            exists: T::offset_exists,
            get: T::offset_get,
            set: T::offset_set,
            unset: T::offset_unset,
        });
        self.capabilities |= Capabilities::ARRAY_ACCESS;
    }

    /// Enable `__get` / `__set` / `__isset` / `__unset`
    pub fn set_magic_properties(&mut self)
    where
        T: MagicProperties,
    {
        self.properties = Some(PropertyHooks {
            get: T::magic_get,
            set: T::magic_set,
            isset: T::magic_isset,
            unset: T::magic_unset,
        });
        self.capabilities |= Capabilities::MAGIC_PROPERTIES;
    }

    /// Enable magic instance calls
    pub fn set_magic_call(&mut self)
    where
        T: MagicCall,
    {
        self.magic_call = Some(T::magic_call);
        self.capabilities |= Capabilities::MAGIC_CALL;
    }

    /// Enable magic static calls
    pub fn set_magic_call_static(&mut self)
    where
        T: MagicStaticCall,
    {
        self.magic_call_static = Some(T::magic_call_static);
        self.capabilities |= Capabilities::MAGIC_CALL_STATIC;
    }

    /// Enable `$o(...)`
    pub fn set_invokable(&mut self)
    where
        T: Invokable,
    {
        self.invoke = Some(T::invoke);
        self.capabilities |= Capabilities::INVOKABLE;
    }

    /// Enable custom conversions
    pub fn set_castable(&mut self)
    where
        T: Castable,
    {
        self.casts = Some(CastHooks {
            integer: T::cast_to_integer,
            double: T::cast_to_double,
            bool: T::cast_to_bool,
            string: T::cast_to_string,
        });
        self.capabilities |= Capabilities::CASTABLE;
    }

    /// Enable the host-visible destructor
    pub fn set_destructible(&mut self)
    where
        T: Destructible,
    {
        self.destruct = Some(T::destruct);
        self.capabilities |= Capabilities::DESTRUCTIBLE;
    }

    /// Enable custom comparison
    pub fn set_comparable(&mut self)
    where
        T: Comparable,
    {
        self.compare = Some(T::compare);
        self.capabilities |= Capabilities::COMPARABLE;
    }
}

impl<T: 'static> ClassDescription for NativeHooks<T> {
    fn construct(&self) -> Option<NativeInstance> {
        let constructor = self.constructor?;
        constructor().map(|native| Box::new(native) as NativeInstance)
    }

    fn clone_instance(&self, native: &dyn Any) -> NativeResult<NativeInstance> {
        let clone = self.clone.ok_or(NativeError::NotImplemented)?;
        Ok(Box::new(clone(downcast_ref::<T>(native)?)))
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn count(&self, native: &mut dyn Any) -> NativeResult<i64> {
        let count = self.count.ok_or(NativeError::NotImplemented)?;
        count(downcast::<T>(native)?)
    }

    fn offset_exists(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<bool> {
        let hooks = self.offsets.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.exists)(downcast::<T>(native)?, offset)
    }

    fn offset_get(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<Value> {
        let hooks = self.offsets.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.get)(downcast::<T>(native)?, offset)
    }

    fn offset_set(&self, native: &mut dyn Any, offset: Option<&Value>, value: Value) -> NativeResult<()> {
        let hooks = self.offsets.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.set)(downcast::<T>(native)?, offset, value)
    }

    fn offset_unset(&self, native: &mut dyn Any, offset: &Value) -> NativeResult<()> {
        let hooks = self.offsets.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.unset)(downcast::<T>(native)?, offset)
    }

    fn magic_get(&self, native: &mut dyn Any, name: &str) -> NativeResult<Value> {
        let hooks = self.properties.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.get)(downcast::<T>(native)?, name)
    }

    fn magic_set(&self, native: &mut dyn Any, name: &str, value: Value) -> NativeResult<()> {
        let hooks = self.properties.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.set)(downcast::<T>(native)?, name, value)
    }

    fn magic_isset(&self, native: &mut dyn Any, name: &str) -> NativeResult<bool> {
        let hooks = self.properties.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.isset)(downcast::<T>(native)?, name)
    }

    fn magic_unset(&self, native: &mut dyn Any, name: &str) -> NativeResult<()> {
        let hooks = self.properties.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.unset)(downcast::<T>(native)?, name)
    }

    fn magic_call(&self, native: &mut dyn Any, name: &str, params: &Parameters) -> NativeResult<Value> {
        let hook = self.magic_call.ok_or(NativeError::NotImplemented)?;
        hook(downcast::<T>(native)?, name, params)
    }

    fn magic_call_static(&self, name: &str, params: &Parameters) -> NativeResult<Value> {
        let hook = self.magic_call_static.ok_or(NativeError::NotImplemented)?;
        hook(name, params)
    }

    fn invoke(&self, native: &mut dyn Any, params: &Parameters) -> NativeResult<Value> {
        let hook = self.invoke.ok_or(NativeError::NotImplemented)?;
        hook(downcast::<T>(native)?, params)
    }

    fn cast_to_integer(&self, native: &mut dyn Any) -> NativeResult<Value> {
        let hooks = self.casts.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.integer)(downcast::<T>(native)?).map(Value::Long)
    }

    fn cast_to_double(&self, native: &mut dyn Any) -> NativeResult<Value> {
        let hooks = self.casts.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.double)(downcast::<T>(native)?).map(Value::Double)
    }

    fn cast_to_bool(&self, native: &mut dyn Any) -> NativeResult<Value> {
        let hooks = self.casts.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.bool)(downcast::<T>(native)?).map(Value::Bool)
    }

    fn cast_to_string(&self, native: &mut dyn Any) -> NativeResult<Value> {
        let hooks = self.casts.as_ref().ok_or(NativeError::NotImplemented)?;
        (hooks.string)(downcast::<T>(native)?).map(Value::String)
    }

    fn destruct(&self, native: &mut dyn Any) -> NativeResult<()> {
        let hook = self.destruct.ok_or(NativeError::NotImplemented)?;
        hook(downcast::<T>(native)?)
    }

    fn compare(&self, left: &dyn Any, right: &dyn Any) -> NativeResult<Ordering> {
        let hook = self.compare.ok_or(NativeError::NotImplemented)?;
        hook(downcast_ref::<T>(left)?, downcast_ref::<T>(right)?)
    }
}
