//! Object binder
//!
//! A native object is a single allocation holding the native instance and
//! the host object header. The header is what the host sees; the binder is
//! recovered from it by subtracting the header offset carried in the
//! object's callback table.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::mem::offset_of;
use std::ptr::{self, NonNull};

use hostbridge_runtime::{ClassRef, HostError, HostResult, ObjectHeader, ObjectRef};

use super::ClassMetadata;
use crate::description::NativeInstance;

/// Allocation pairing a native instance with its host header
#[repr(C)]
pub struct ObjectBinder {
    native: RefCell<NativeInstance>,
    header: ObjectHeader,
}

/// Offset of the header inside [`ObjectBinder`]
pub fn header_offset() -> usize {
    offset_of!(ObjectBinder, header)
}

/// Construct a native instance and bind it to a new host object of `class`
pub(crate) fn create(metadata: &ClassMetadata, class: &ClassRef) -> HostResult<ObjectRef> {
    let native = metadata
        .description()
        .construct()
        .ok_or_else(|| HostError::fatal(format!("Unable to instantiate {}", class.name())))?;
    Ok(create_with(metadata, class, native))
}

/// Bind an existing native instance to a new host object of `class`
pub(crate) fn create_with(metadata: &ClassMetadata, class: &ClassRef, native: NativeInstance) -> ObjectRef {
    let binder = Box::new(ObjectBinder {
        native: RefCell::new(native),
        header: ObjectHeader::new(class.clone(), metadata.handlers()),
    });
    let raw = Box::into_raw(binder);
    // SAFETY: `raw` is a live allocation; the header pointer is derived from
    // it so it keeps the provenance of the whole binder for `free_object`.
    unsafe {
        let header = NonNull::new_unchecked(ptr::addr_of_mut!((*raw).header));
        ObjectRef::from_raw(header)
    }
}

/// Binder behind `object`; fails for objects the bridge did not allocate
pub fn retrieve(object: &ObjectRef) -> HostResult<&ObjectBinder> {
    let offset = object.handlers().offset;
    if offset != header_offset() {
        return Err(HostError::fatal(format!(
            "Object of class {} is not bound to a native instance",
            object.class().name()
        )));
    }
    // SAFETY: the offset matches, so the header lives inside an `ObjectBinder`
    // created by `create_with`; the binder outlives the handle.
    unsafe {
        let binder = object.as_ptr().as_ptr().byte_sub(offset) as *const ObjectBinder;
        Ok(&*binder)
    }
}

/// Check if `object` was allocated by the bridge
pub fn is_bound(object: &ObjectRef) -> bool {
    object.handlers().offset == header_offset()
}

/// Release a binder allocation.
///
/// # Safety
///
/// `header` must come from [`create_with`] and must not be used afterwards.
pub(crate) unsafe fn free_object(header: NonNull<ObjectHeader>) {
    let offset = header.as_ref().handlers().offset;
    let binder = header.as_ptr().byte_sub(offset) as *mut ObjectBinder;
    drop(Box::from_raw(binder));
}

impl ObjectBinder {
    /// Host header
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Check the concrete type of the native instance
    pub fn holds<T: 'static>(&self) -> bool {
        self.native.try_borrow().map(|native| native.is::<T>()).unwrap_or(false)
    }
}

/// Run `f` on the native instance of `object`.
///
/// Native code re-entering the same object while `f` runs is a fatal error.
pub fn with_native<R>(object: &ObjectRef, f: impl FnOnce(&mut dyn Any) -> R) -> HostResult<R> {
    let binder = retrieve(object)?;
    let mut slot = binder.native.try_borrow_mut().map_err(|_| {
        HostError::fatal(format!(
            "Native instance of {} is already in use",
            object.class().name()
        ))
    })?;
    Ok(f(&mut **slot))
}

/// Run `f` on the native instances of two objects (which may be the same)
pub fn with_natives<R>(
    left: &ObjectRef,
    right: &ObjectRef,
    f: impl FnOnce(&dyn Any, &dyn Any) -> R,
) -> HostResult<R> {
    let left_slot = borrow_shared(left)?;
    let right_slot = borrow_shared(right)?;
    Ok(f(&**left_slot, &**right_slot))
}

fn borrow_shared(object: &ObjectRef) -> HostResult<Ref<'_, NativeInstance>> {
    retrieve(object)?.native.try_borrow().map_err(|_| {
        HostError::fatal(format!(
            "Native instance of {} is already in use",
            object.class().name()
        ))
    })
}
