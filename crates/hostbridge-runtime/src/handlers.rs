//! Object callback tables
//!
//! Every dynamic operation the engine performs on an object goes through the
//! object's [`ObjectHandlers`]. Optional slots left as `None` mean the
//! operation is not supported by objects of that kind; the engine then
//! applies its own fallback (a warning, an exception or a neutral result).
//!
//! [`std_object_handlers`] is the table of ordinary objects. Its functions are
//! public so that other tables can delegate to them.

use std::ptr::NonNull;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::array::ArrayKey;
use crate::class::ClassRef;
use crate::error::{ErrorLevel, HostError, HostResult};
use crate::executor;
use crate::function::{Callee, ExecuteData};
use crate::object::{ObjectHeader, ObjectRef};
use crate::value::Value;

/// How a property or dimension is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Plain read (`$o->p`)
    Read,
    /// Fetch for writing (`$o->p[] = 1`)
    Write,
    /// Fetch for read-modify-write (`$o->p .= "x"`)
    ReadWrite,
    /// Fetch for unset (`unset($o->p[0])`)
    Unset,
    /// Silent read inside `isset()` / `empty()`
    IsSet,
}

impl AccessType {
    /// Check if the caller may write through the fetched value
    pub fn is_write(self) -> bool {
        matches!(self, AccessType::Write | AccessType::ReadWrite | AccessType::Unset)
    }
}

/// Which question a property "has" check answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HasCheck {
    /// `isset()`: present and not null
    Isset,
    /// `!empty()`: present and truthy
    NotEmpty,
    /// `property_exists()`: present at all
    Exists,
}

/// Target kind of an object cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    /// `(int)`
    Long,
    /// `(float)`
    Double,
    /// `(bool)`
    Bool,
    /// `(string)`
    String,
}

impl CastType {
    /// Name used in host messages
    pub fn name(self) -> &'static str {
        match self {
            CastType::Long => "int",
            CastType::Double => "float",
            CastType::Bool => "bool",
            CastType::String => "string",
        }
    }
}

/// Release the allocation behind a header
pub type FreeObjFn = unsafe fn(NonNull<ObjectHeader>);
/// Run the object's destructor
pub type DtorObjFn = fn(&ObjectRef) -> HostResult<()>;
/// Produce a copy of the object
pub type CloneObjFn = fn(&ObjectRef) -> HostResult<ObjectRef>;
/// Read a property
pub type ReadPropertyFn = fn(&ObjectRef, &str, AccessType) -> HostResult<Value>;
/// Write a property
pub type WritePropertyFn = fn(&ObjectRef, &str, Value) -> HostResult<()>;
/// Check a property
pub type HasPropertyFn = fn(&ObjectRef, &str, HasCheck) -> HostResult<bool>;
/// Remove a property
pub type UnsetPropertyFn = fn(&ObjectRef, &str) -> HostResult<()>;
/// Read an index
pub type ReadDimensionFn = fn(&ObjectRef, &Value, AccessType) -> HostResult<Value>;
/// Write an index; `None` appends
pub type WriteDimensionFn = fn(&ObjectRef, Option<&Value>, Value) -> HostResult<()>;
/// Check an index; the flag asks for a non-empty value instead of a non-null one
pub type HasDimensionFn = fn(&ObjectRef, &Value, bool) -> HostResult<bool>;
/// Remove an index
pub type UnsetDimensionFn = fn(&ObjectRef, &Value) -> HostResult<()>;
/// Count elements; `None` means the object cannot be counted
pub type CountElementsFn = fn(&ObjectRef) -> HostResult<Option<i64>>;
/// Resolve an instance method
pub type GetMethodFn = fn(&ObjectRef, &str) -> HostResult<Option<Callee>>;
/// Resolve the function used when the object is called
pub type GetClosureFn = fn(&ObjectRef) -> HostResult<Option<Callee>>;
/// Convert the object; `None` means the conversion is not supported
pub type CastObjectFn = fn(&ObjectRef, CastType) -> HostResult<Option<Value>>;
/// Compare two objects, returning -1, 0 or 1
pub type CompareObjectsFn = fn(&ObjectRef, &ObjectRef) -> HostResult<i32>;

/// Per-class object callback table
#[derive(Clone)]
pub struct ObjectHandlers {
    /// Byte offset of the header inside the allocation that embeds it
    pub offset: usize,
    /// Release the allocation
    pub free_obj: FreeObjFn,
    /// Destructor
    pub dtor_obj: DtorObjFn,
    /// Copy; `None` makes objects uncloneable
    pub clone_obj: Option<CloneObjFn>,
    /// Property read
    pub read_property: ReadPropertyFn,
    /// Property write
    pub write_property: WritePropertyFn,
    /// Property check
    pub has_property: HasPropertyFn,
    /// Property removal
    pub unset_property: UnsetPropertyFn,
    /// Index read
    pub read_dimension: Option<ReadDimensionFn>,
    /// Index write
    pub write_dimension: Option<WriteDimensionFn>,
    /// Index check
    pub has_dimension: Option<HasDimensionFn>,
    /// Index removal
    pub unset_dimension: Option<UnsetDimensionFn>,
    /// Element count
    pub count_elements: Option<CountElementsFn>,
    /// Method lookup
    pub get_method: GetMethodFn,
    /// Callable lookup
    pub get_closure: Option<GetClosureFn>,
    /// Conversion
    pub cast_object: Option<CastObjectFn>,
    /// Comparison
    pub compare_objects: Option<CompareObjectsFn>,
}

static STD_OBJECT_HANDLERS: Lazy<Arc<ObjectHandlers>> = Lazy::new(|| {
    Arc::new(ObjectHandlers {
        offset: 0,
        free_obj: std_free_obj,
        dtor_obj: std_dtor_obj,
        clone_obj: Some(std_clone_obj),
        read_property: std_read_property,
        write_property: std_write_property,
        has_property: std_has_property,
        unset_property: std_unset_property,
        read_dimension: None,
        write_dimension: None,
        has_dimension: None,
        unset_dimension: None,
        count_elements: None,
        get_method: std_get_method,
        get_closure: Some(std_get_closure),
        cast_object: Some(std_cast_object),
        compare_objects: Some(std_compare_objects),
    })
});

/// Callback table of ordinary objects
pub fn std_object_handlers() -> Arc<ObjectHandlers> {
    STD_OBJECT_HANDLERS.clone()
}

/// Allocate an ordinary object of `ce`
pub fn std_create_object(ce: &ClassRef) -> HostResult<ObjectRef> {
    let header = Box::new(ObjectHeader::new(ce.clone(), std_object_handlers()));
    let ptr = NonNull::from(Box::leak(header));
    // SAFETY: freshly leaked box with refcount 1, released by `std_free_obj`.
    Ok(unsafe { ObjectRef::from_raw(ptr) })
}

/// Release an ordinary object allocated by [`std_create_object`]
///
/// # Safety
///
/// `ptr` must come from [`std_create_object`] and must not be used afterwards.
pub unsafe fn std_free_obj(ptr: NonNull<ObjectHeader>) {
    drop(Box::from_raw(ptr.as_ptr()));
}

/// Call a declared `__destruct`, if any
pub fn std_dtor_obj(object: &ObjectRef) -> HostResult<()> {
    if let Some(destructor) = object.class().find_function("__destruct") {
        let mut frame = bound_frame(object, "__destruct", Vec::new());
        destructor.call(&mut frame)?;
    }
    Ok(())
}

/// Copy an ordinary object: same class and handlers, properties duplicated,
/// then a declared `__clone` runs on the copy
pub fn std_clone_obj(object: &ObjectRef) -> HostResult<ObjectRef> {
    let header = ObjectHeader::new(object.class().clone(), object.handlers().clone());
    *header.properties().borrow_mut() = object.properties().borrow().clone();
    let ptr = NonNull::from(Box::leak(Box::new(header)));
    // SAFETY: freshly leaked box with refcount 1.
    let copy = unsafe { ObjectRef::from_raw(ptr) };
    if let Some(hook) = copy.class().find_function("__clone") {
        let mut frame = bound_frame(&copy, "__clone", Vec::new());
        hook.call(&mut frame)?;
    }
    Ok(copy)
}

/// Read from the property table
///
/// Reads of undefined properties report a notice and yield null (silently for
/// `IsSet`). Write fetches turn the slot into a reference and hand it out so
/// the caller can modify the property in place.
pub fn std_read_property(object: &ObjectRef, name: &str, access: AccessType) -> HostResult<Value> {
    let key = ArrayKey::Str(name.to_string());
    let mut properties = object.properties().borrow_mut();
    if access.is_write() {
        let slot = properties.get(&key).cloned().unwrap_or(Value::Null);
        let reference = match slot {
            Value::Reference(_) => slot,
            other => Value::new_reference(other),
        };
        properties.insert(key, reference.clone());
        return Ok(reference);
    }
    match properties.get(&key) {
        Some(value) => Ok(value.deref()),
        None => {
            drop(properties);
            if access != AccessType::IsSet {
                executor::report(
                    ErrorLevel::Notice,
                    format!("Undefined property: {}::${}", object.class().name(), name),
                );
            }
            Ok(Value::Null)
        }
    }
}

/// Write to the property table, through an existing reference slot if present
pub fn std_write_property(object: &ObjectRef, name: &str, value: Value) -> HostResult<()> {
    let key = ArrayKey::Str(name.to_string());
    let value = value.into_deref();
    let previous = {
        let mut properties = object.properties().borrow_mut();
        match properties.get(&key) {
            Some(Value::Reference(cell)) => Some(cell.replace(value)),
            _ => properties.insert(key, value),
        }
    };
    // The old value may be the last handle of an object whose destructor
    // touches this property table.
    drop(previous);
    Ok(())
}

/// Check the property table
pub fn std_has_property(object: &ObjectRef, name: &str, check: HasCheck) -> HostResult<bool> {
    let properties = object.properties().borrow();
    let Some(value) = properties.get(&ArrayKey::Str(name.to_string())) else {
        return Ok(false);
    };
    Ok(match check {
        HasCheck::Exists => true,
        HasCheck::Isset => !value.is_null(),
        HasCheck::NotEmpty => value.to_bool(),
    })
}

/// Remove from the property table
pub fn std_unset_property(object: &ObjectRef, name: &str) -> HostResult<()> {
    let removed = object
        .properties()
        .borrow_mut()
        .remove(&ArrayKey::Str(name.to_string()));
    drop(removed);
    Ok(())
}

/// Find a declared method
pub fn std_get_method(object: &ObjectRef, name: &str) -> HostResult<Option<Callee>> {
    Ok(object.class().find_function(name).map(Callee::Function))
}

/// Find a declared static method
pub fn std_get_static_method(ce: &ClassRef, name: &str) -> HostResult<Option<Callee>> {
    Ok(ce.find_function(name).map(Callee::Function))
}

/// Objects with a declared `__invoke` are callable
pub fn std_get_closure(object: &ObjectRef) -> HostResult<Option<Callee>> {
    Ok(object.class().find_function("__invoke").map(Callee::Function))
}

/// Objects are truthy; `(string)` needs a declared `__toString`
pub fn std_cast_object(object: &ObjectRef, target: CastType) -> HostResult<Option<Value>> {
    match target {
        CastType::Bool => Ok(Some(Value::Bool(true))),
        CastType::String => {
            let Some(to_string) = object.class().find_function("__tostring") else {
                return Ok(None);
            };
            let mut frame = bound_frame(object, "__toString", Vec::new());
            match to_string.call(&mut frame)?.into_deref() {
                Value::String(s) => Ok(Some(Value::String(s))),
                _ => Err(HostError::exception(
                    "Error",
                    format!("{}::__toString(): Return value must be of type string", object.class().name()),
                )),
            }
        }
        CastType::Long | CastType::Double => Ok(None),
    }
}

/// Compare property by property; objects of different classes are
/// uncomparable and yield 1
pub fn std_compare_objects(left: &ObjectRef, right: &ObjectRef) -> HostResult<i32> {
    if left.ptr_eq(right) {
        return Ok(0);
    }
    if left.class().id() != right.class().id() {
        return Ok(1);
    }
    let left_props = left.properties().borrow().clone();
    let right_props = right.properties().borrow().clone();
    if left_props.len() != right_props.len() {
        return Ok(left_props.len().cmp(&right_props.len()) as i32);
    }
    for (key, value) in left_props.iter() {
        let Some(other) = right_props.get(key) else {
            return Ok(1);
        };
        let result = match (value.as_object(), other.as_object()) {
            (Some(a), Some(b)) => compare_nested(&a, &b)?,
            _ => value.loose_compare(other),
        };
        if result != 0 {
            return Ok(result);
        }
    }
    Ok(0)
}

fn compare_nested(left: &ObjectRef, right: &ObjectRef) -> HostResult<i32> {
    match left.handlers().compare_objects {
        Some(compare) => compare(left, right),
        None => std_compare_objects(left, right),
    }
}

/// Frame for calling a method on `object`
pub fn bound_frame(object: &ObjectRef, function_name: &str, args: Vec<Value>) -> ExecuteData {
    ExecuteData {
        function_name: function_name.to_string(),
        this: Some(object.clone()),
        called_scope: Some(object.class().name().to_string()),
        args,
    }
}
