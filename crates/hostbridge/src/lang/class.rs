//! `Class<T>` builder
//!
//! Collects methods, properties, members and capabilities of a native type
//! `T` and produces its [`ClassHandle`](crate::vm::ClassHandle).

use std::sync::Arc;

use hostbridge_runtime::Scalar;
use rustc_hash::FxHashMap;

use super::{
    Arguments, ClassKind, Constant, Member, Method, MethodCallback, Modifier, PropertyDescriptor, PropertyValue,
};
use crate::capability::{
    ArrayAccess, Castable, Comparable, Countable, Destructible, Invokable, MagicCall, MagicProperties,
    MagicStaticCall,
};
use crate::convert::IntoValue;
use crate::description::NativeHooks;
use crate::error::NativeResult;
use crate::vm::{ClassHandle, ClassMetadata, ClassParts, Parameters};

fn default_instance<T: Default>() -> Option<T> {
    Some(T::default())
}

/// Builder for a native class backed by the Rust type `T`
///
/// ```ignore
/// let counter = Class::<Counter>::new("Counter")
///     .countable()
///     .method("increment", Counter::increment, Modifier::PUBLIC, Arguments::new())
///     .build();
/// ```
pub struct Class<T: 'static> {
    name: String,
    kind: ClassKind,
    hooks: NativeHooks<T>,
    methods: Vec<Method>,
    properties: FxHashMap<String, PropertyDescriptor>,
    members: Vec<Member>,
    parent: Option<ClassHandle>,
    interfaces: Vec<ClassHandle>,
}

impl<T: Default + 'static> Class<T> {
    /// Class whose instances start as `T::default()`
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_constructor(name, default_instance::<T>)
    }
}

impl<T: 'static> Class<T> {
    /// Class with a custom constructor; returning `None` refuses instantiation
    pub fn with_constructor(name: impl Into<String>, constructor: fn() -> Option<T>) -> Self {
        Self::from_hooks(name, NativeHooks::new(Some(constructor)))
    }

    /// Class the host can never instantiate on its own
    pub fn uninstantiable(name: impl Into<String>) -> Self {
        Self::from_hooks(name, NativeHooks::new(None))
    }

    fn from_hooks(name: impl Into<String>, hooks: NativeHooks<T>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Regular,
            hooks,
            methods: Vec::new(),
            properties: FxHashMap::default(),
            members: Vec::new(),
            parent: None,
            interfaces: Vec::new(),
        }
    }

    /// Declare the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.kind = ClassKind::Abstract;
        self
    }

    /// Declare the class final
    pub fn final_class(mut self) -> Self {
        self.kind = ClassKind::Final;
        self
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    /// Objects support `clone`
    pub fn clonable(mut self) -> Self
    where
        T: Clone,
    {
        self.hooks.set_clone();
        self
    }

    /// Objects support `count()`
    pub fn countable(mut self) -> Self
    where
        T: Countable,
    {
        self.hooks.set_countable();
        self
    }

    /// Objects support index access
    pub fn array_access(mut self) -> Self
    where
        T: ArrayAccess,
    {
        self.hooks.set_array_access();
        self
    }

    /// Undeclared properties go to the native magic hooks
    pub fn magic_properties(mut self) -> Self
    where
        T: MagicProperties,
    {
        self.hooks.set_magic_properties();
        self
    }

    /// Undeclared instance methods go to the native magic hook
    pub fn magic_call(mut self) -> Self
    where
        T: MagicCall,
    {
        self.hooks.set_magic_call();
        self
    }

    /// Undeclared static methods go to the native magic hook
    pub fn magic_call_static(mut self) -> Self
    where
        T: MagicStaticCall,
    {
        self.hooks.set_magic_call_static();
        self
    }

    /// Objects can be called as functions
    pub fn invokable(mut self) -> Self
    where
        T: Invokable,
    {
        self.hooks.set_invokable();
        self
    }

    /// Conversions go to the native hooks
    pub fn castable(mut self) -> Self
    where
        T: Castable,
    {
        self.hooks.set_castable();
        self
    }

    /// The host-visible destructor runs native code
    pub fn destructible(mut self) -> Self
    where
        T: Destructible,
    {
        self.hooks.set_destructible();
        self
    }

    /// Comparison of two objects of the class goes to native code
    pub fn comparable(mut self) -> Self
    where
        T: Comparable,
    {
        self.hooks.set_comparable();
        self
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Instance method running on the native instance
    pub fn method<R>(
        mut self,
        name: impl Into<String>,
        callback: fn(&mut T, &Parameters) -> NativeResult<R>,
        flags: Modifier,
        arguments: Arguments,
    ) -> Self
    where
        R: IntoValue + 'static,
    {
        let body: MethodCallback = Arc::new(move |params: &Parameters| {
            params
                .with_native::<T, R>(|native| callback(native, params))
                .map(IntoValue::into_value)
        });
        self.methods.push(Method::new(name, body, flags - Modifier::STATIC, arguments));
        self
    }

    /// Static method
    pub fn static_method<R>(
        mut self,
        name: impl Into<String>,
        callback: fn(&Parameters) -> NativeResult<R>,
        flags: Modifier,
        arguments: Arguments,
    ) -> Self
    where
        R: IntoValue + 'static,
    {
        let body: MethodCallback =
            Arc::new(move |params: &Parameters| callback(params).map(IntoValue::into_value));
        self.methods.push(Method::new(name, body, flags | Modifier::STATIC, arguments));
        self
    }

    /// Method without a body; makes the class implicitly abstract
    pub fn abstract_method(mut self, name: impl Into<String>, flags: Modifier, arguments: Arguments) -> Self {
        self.methods.push(Method::abstract_method(name, flags, arguments));
        self
    }

    /// Add a prepared method record
    pub fn register_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    // ========================================================================
    // Properties and constants
    // ========================================================================

    /// Property stored in the host property table with a default value
    pub fn register_property(mut self, name: impl Into<String>, value: impl Into<Scalar>, flags: Modifier) -> Self {
        self.members.push(Member::property(name, value, flags));
        self
    }

    /// Class constant
    pub fn register_constant(mut self, constant: Constant) -> Self {
        self.members.push(constant.into());
        self
    }

    /// Explicit property backed by native accessors; without a setter the
    /// property is read-only
    pub fn property<V: PropertyValue>(
        mut self,
        name: impl Into<String>,
        getter: fn(&T) -> V,
        setter: Option<fn(&mut T, V)>,
        flags: Modifier,
    ) -> Self {
        self.properties
            .insert(name.into(), PropertyDescriptor::accessor(getter, setter, flags));
        self
    }

    /// Explicit read-only property with a fixed value
    pub fn fixed_property(mut self, name: impl Into<String>, value: impl Into<Scalar>, flags: Modifier) -> Self {
        self.properties
            .insert(name.into(), PropertyDescriptor::fixed(value, flags));
        self
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Extend a native class
    pub fn extends(mut self, parent: &ClassHandle) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Implement a native interface
    pub fn implements(mut self, interface: &ClassHandle) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Finish the class
    pub fn build(self) -> ClassHandle {
        ClassMetadata::new(ClassParts {
            name: self.name,
            kind: self.kind,
            methods: self.methods,
            properties: self.properties,
            members: self.members,
            parent: self.parent,
            interfaces: self.interfaces,
            description: Box::new(self.hooks),
        })
    }
}
