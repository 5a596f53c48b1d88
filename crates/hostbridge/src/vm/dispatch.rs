//! Host callback table of native objects
//!
//! Every host operation on a native object lands here. Each callback
//! recovers the class metadata and the native instance, forwards to the
//! class description when the class has the matching capability, and falls
//! back to the host's default behavior when it does not, or when the
//! native hook reports `NotImplemented`.

use std::any::Any;

use hostbridge_runtime::handlers::{
    std_get_closure, std_get_method, std_get_static_method, std_object_handlers,
};
use hostbridge_runtime::{
    AccessType, CastType, Callee, ClassRef, HasCheck, HostError, HostResult, ObjectHandlers, ObjectRef, Value,
};

use super::magic::{CallContext, CallKind};
use super::{anchor, binder, ClassHandle};
use crate::capability::Capabilities;
use crate::convert::to_host_value;
use crate::error::{NativeError, NativeResult};

/// Callback table for objects of a class with `capabilities`.
///
/// Dimension and count slots are always installed so that classes without
/// the capability still follow the host defaults through the bridge.
pub fn build_handlers(capabilities: Capabilities) -> ObjectHandlers {
    ObjectHandlers {
        offset: binder::header_offset(),
        free_obj: binder::free_object,
        dtor_obj: destruct_object,
        clone_obj: capabilities
            .contains(Capabilities::CLONABLE)
            .then_some(clone_object as fn(&ObjectRef) -> HostResult<ObjectRef>),
        read_property,
        write_property,
        has_property,
        unset_property,
        read_dimension: Some(read_dimension),
        write_dimension: Some(write_dimension),
        has_dimension: Some(has_dimension),
        unset_dimension: Some(unset_dimension),
        count_elements: Some(count_elements),
        get_method,
        get_closure: Some(get_closure),
        cast_object: Some(cast_object),
        compare_objects: Some(compare_objects),
    }
}

/// Run a native hook on the instance of `object`; `Ok(None)` when the hook
/// reports `NotImplemented`
pub(crate) fn call_hook<R>(
    object: &ObjectRef,
    hook: impl FnOnce(&mut dyn Any) -> NativeResult<R>,
) -> HostResult<Option<R>> {
    not_implemented_as_none(binder::with_native(object, hook)?)
}

pub(crate) fn not_implemented_as_none<R>(result: NativeResult<R>) -> HostResult<Option<R>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(NativeError::NotImplemented) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn metadata_of(object: &ObjectRef) -> HostResult<ClassHandle> {
    anchor::recover(object.class())
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Allocation hook installed on every native class record
pub fn create_object(class: &ClassRef) -> HostResult<ObjectRef> {
    let metadata = anchor::recover(class)?;
    binder::create(&metadata, class)
}

fn destruct_object(object: &ObjectRef) -> HostResult<()> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::DESTRUCTIBLE) {
        let destructed = call_hook(object, |native| metadata.description().destruct(native))?;
        if destructed.is_some() {
            return Ok(());
        }
    }
    (std_object_handlers().dtor_obj)(object)
}

fn clone_object(object: &ObjectRef) -> HostResult<ObjectRef> {
    let metadata = metadata_of(object)?;
    let copy = binder::with_native(object, |native| metadata.description().clone_instance(&*native))?;
    match not_implemented_as_none(copy)? {
        Some(native) => {
            let clone = binder::create_with(&metadata, object.class(), native);
            *clone.properties().borrow_mut() = object.properties().borrow().clone();
            Ok(clone)
        }
        None => Err(HostError::exception(
            "Error",
            format!("Trying to clone an uncloneable object of class {}", object.class().name()),
        )),
    }
}

// ============================================================================
// Properties
// ============================================================================

fn read_property(object: &ObjectRef, name: &str, access: AccessType) -> HostResult<Value> {
    let metadata = metadata_of(object)?;
    if let Some(property) = metadata.property(name) {
        if let Some(value) = call_hook(object, |native| property.get(&*native))? {
            return Ok(to_host_value(value, access));
        }
    } else if metadata.has_capability(Capabilities::MAGIC_PROPERTIES) {
        if let Some(value) = call_hook(object, |native| metadata.description().magic_get(native, name))? {
            return Ok(to_host_value(value, access));
        }
    }
    (std_object_handlers().read_property)(object, name, access)
}

fn write_property(object: &ObjectRef, name: &str, value: Value) -> HostResult<()> {
    let metadata = metadata_of(object)?;
    if let Some(property) = metadata.property(name) {
        match call_hook(object, |native| property.set(native, &value))? {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(HostError::fatal(format!(
                    "Unable to write to read-only property {}",
                    name
                )))
            }
            None => {}
        }
    } else if metadata.has_capability(Capabilities::MAGIC_PROPERTIES) {
        let copy = value.clone();
        if call_hook(object, |native| metadata.description().magic_set(native, name, copy))?.is_some() {
            return Ok(());
        }
    }
    (std_object_handlers().write_property)(object, name, value)
}

fn satisfies(value: &Value, check: HasCheck) -> bool {
    match check {
        HasCheck::Exists => true,
        HasCheck::Isset => !value.is_null(),
        HasCheck::NotEmpty => !value.is_empty(),
    }
}

fn has_property(object: &ObjectRef, name: &str, check: HasCheck) -> HostResult<bool> {
    let metadata = metadata_of(object)?;
    if let Some(property) = metadata.property(name) {
        if check == HasCheck::Exists {
            return Ok(true);
        }
        if let Some(value) = call_hook(object, |native| property.get(&*native))? {
            return Ok(satisfies(&value, check));
        }
    } else if metadata.has_capability(Capabilities::MAGIC_PROPERTIES) {
        let description = metadata.description();
        let answer = call_hook(object, |native| {
            if !description.magic_isset(native, name)? {
                return Ok(false);
            }
            if check == HasCheck::Exists {
                return Ok(true);
            }
            let value = description.magic_get(native, name)?;
            Ok(satisfies(&value, check))
        })?;
        if let Some(answer) = answer {
            return Ok(answer);
        }
    }
    (std_object_handlers().has_property)(object, name, check)
}

fn unset_property(object: &ObjectRef, name: &str) -> HostResult<()> {
    let metadata = metadata_of(object)?;
    if metadata.property(name).is_some() {
        return Err(HostError::fatal(format!("Property {} can not be unset", name)));
    }
    if metadata.has_capability(Capabilities::MAGIC_PROPERTIES)
        && call_hook(object, |native| metadata.description().magic_unset(native, name))?.is_some()
    {
        return Ok(());
    }
    (std_object_handlers().unset_property)(object, name)
}

// ============================================================================
// Dimensions
// ============================================================================

fn read_dimension(object: &ObjectRef, offset: &Value, access: AccessType) -> HostResult<Value> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::ARRAY_ACCESS) {
        if let Some(value) = call_hook(object, |native| metadata.description().offset_get(native, offset))? {
            return Ok(to_host_value(value, access));
        }
    }
    match std_object_handlers().read_dimension {
        Some(read) => read(object, offset, access),
        None => Ok(Value::Null),
    }
}

fn write_dimension(object: &ObjectRef, offset: Option<&Value>, value: Value) -> HostResult<()> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::ARRAY_ACCESS) {
        let copy = value.clone();
        if call_hook(object, |native| metadata.description().offset_set(native, offset, copy))?.is_some() {
            return Ok(());
        }
    }
    match std_object_handlers().write_dimension {
        Some(write) => write(object, offset, value),
        None => Ok(()),
    }
}

fn has_dimension(object: &ObjectRef, offset: &Value, check_empty: bool) -> HostResult<bool> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::ARRAY_ACCESS) {
        let description = metadata.description();
        let answer = call_hook(object, |native| {
            if !description.offset_exists(native, offset)? {
                return Ok(false);
            }
            if !check_empty {
                return Ok(true);
            }
            Ok(!description.offset_get(native, offset)?.is_empty())
        })?;
        if let Some(answer) = answer {
            return Ok(answer);
        }
    }
    match std_object_handlers().has_dimension {
        Some(has) => has(object, offset, check_empty),
        None => Ok(false),
    }
}

fn unset_dimension(object: &ObjectRef, offset: &Value) -> HostResult<()> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::ARRAY_ACCESS)
        && call_hook(object, |native| metadata.description().offset_unset(native, offset))?.is_some()
    {
        return Ok(());
    }
    match std_object_handlers().unset_dimension {
        Some(unset) => unset(object, offset),
        None => Ok(()),
    }
}

fn count_elements(object: &ObjectRef) -> HostResult<Option<i64>> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::COUNTABLE) {
        if let Some(count) = call_hook(object, |native| metadata.description().count(native))? {
            return Ok(Some(count));
        }
    }
    match std_object_handlers().count_elements {
        Some(count) => count(object),
        None => Ok(None),
    }
}

// ============================================================================
// Calls
// ============================================================================

fn get_method(object: &ObjectRef, name: &str) -> HostResult<Option<Callee>> {
    if let Some(callee) = std_get_method(object, name)? {
        return Ok(Some(callee));
    }
    let metadata = metadata_of(object)?;
    let context = CallContext::new(&metadata, name, object.class().name(), CallKind::Instance);
    Ok(Some(Callee::ViaHandler(Box::new(context))))
}

/// Static method lookup hook installed on every native class record
pub fn get_static_method(class: &ClassRef, name: &str) -> HostResult<Option<Callee>> {
    if let Some(callee) = std_get_static_method(class, name)? {
        return Ok(Some(callee));
    }
    let metadata = anchor::recover(class)?;
    let context = CallContext::new(&metadata, name, class.name(), CallKind::Static);
    Ok(Some(Callee::ViaHandler(Box::new(context))))
}

fn get_closure(object: &ObjectRef) -> HostResult<Option<Callee>> {
    if let Some(callee) = std_get_closure(object)? {
        return Ok(Some(callee));
    }
    let metadata = metadata_of(object)?;
    let context = CallContext::new(&metadata, "__invoke", object.class().name(), CallKind::Invoke);
    Ok(Some(Callee::ViaHandler(Box::new(context))))
}

// ============================================================================
// Conversion and comparison
// ============================================================================

fn cast_object(object: &ObjectRef, target: CastType) -> HostResult<Option<Value>> {
    let metadata = metadata_of(object)?;
    if metadata.has_capability(Capabilities::CASTABLE) {
        let description = metadata.description();
        let cast = call_hook(object, |native| match target {
            CastType::Long => description.cast_to_integer(native),
            CastType::Double => description.cast_to_double(native),
            CastType::Bool => description.cast_to_bool(native),
            CastType::String => description.cast_to_string(native),
        })?;
        if cast.is_some() {
            return Ok(cast);
        }
    }
    match std_object_handlers().cast_object {
        Some(cast) => cast(object, target),
        None => Ok(None),
    }
}

fn compare_objects(left: &ObjectRef, right: &ObjectRef) -> HostResult<i32> {
    if left.ptr_eq(right) {
        return Ok(0);
    }
    if left.class().id() == right.class().id() && binder::is_bound(right) {
        let metadata = metadata_of(left)?;
        if metadata.has_capability(Capabilities::COMPARABLE) {
            let description = metadata.description();
            let ordering = binder::with_natives(left, right, |a, b| description.compare(a, b))?;
            if let Some(ordering) = not_implemented_as_none(ordering)? {
                return Ok(ordering as i32);
            }
        }
    }
    match std_object_handlers().compare_objects {
        Some(compare) => compare(left, right),
        None => Ok(1),
    }
}
