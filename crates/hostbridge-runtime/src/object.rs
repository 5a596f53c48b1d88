//! Object headers and handles
//!
//! Every host object starts with an [`ObjectHeader`]. Allocators are free to
//! embed the header inside a larger structure; the header's `offset` (carried
//! by its [`ObjectHandlers`]) tells the owner where the header sits so the
//! enclosing structure can be recovered from the header pointer.
//!
//! [`ObjectRef`] is a reference-counted handle. When the last handle goes away
//! the host runs the release protocol: `dtor_obj` at most once, then
//! `free_obj` exactly once.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bitflags::bitflags;

use crate::array::{ArrayKey, HostArray};
use crate::class::ClassRef;
use crate::executor;
use crate::handlers::ObjectHandlers;

/// Global counter for object handles
static NEXT_HANDLE: AtomicU32 = AtomicU32::new(1);

bitflags! {
    /// Release protocol state of an object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u8 {
        /// `dtor_obj` has run (or was skipped)
        const DESTRUCTOR_CALLED = 1 << 0;
        /// `free_obj` has run
        const FREE_CALLED = 1 << 1;
    }
}

/// Common header of every host object
#[repr(C)]
pub struct ObjectHeader {
    refcount: Cell<u32>,
    handle: u32,
    flags: Cell<ObjectFlags>,
    ce: ClassRef,
    handlers: Arc<ObjectHandlers>,
    properties: RefCell<HostArray>,
}

impl ObjectHeader {
    /// Create a header with one reference and the class's default properties
    pub fn new(ce: ClassRef, handlers: Arc<ObjectHandlers>) -> Self {
        let mut properties = HostArray::new();
        for info in ce.default_properties() {
            properties.insert(ArrayKey::Str(info.name), info.default.to_value());
        }
        Self {
            refcount: Cell::new(1),
            handle: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            flags: Cell::new(ObjectFlags::empty()),
            ce,
            handlers,
            properties: RefCell::new(properties),
        }
    }

    /// Object handle number
    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Class of the object
    pub fn class(&self) -> &ClassRef {
        &self.ce
    }

    /// Callback table of the object
    pub fn handlers(&self) -> &Arc<ObjectHandlers> {
        &self.handlers
    }

    /// Dynamic property table
    pub fn properties(&self) -> &RefCell<HostArray> {
        &self.properties
    }

    /// Release protocol state
    pub fn flags(&self) -> ObjectFlags {
        self.flags.get()
    }

    fn set_flag(&self, flag: ObjectFlags) {
        self.flags.set(self.flags.get() | flag);
    }
}

/// Reference-counted handle to a host object
pub struct ObjectRef {
    ptr: NonNull<ObjectHeader>,
}

impl ObjectRef {
    /// Adopt a freshly allocated header.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live, initialized header whose reference count
    /// already accounts for the returned handle, and the header's
    /// `handlers.free_obj` must be able to release the allocation behind it.
    pub unsafe fn from_raw(ptr: NonNull<ObjectHeader>) -> Self {
        Self { ptr }
    }

    /// Raw header pointer (ownership is not transferred)
    pub fn as_ptr(&self) -> NonNull<ObjectHeader> {
        self.ptr
    }

    /// Object header
    pub fn header(&self) -> &ObjectHeader {
        // SAFETY: the header stays alive while any handle exists.
        unsafe { self.ptr.as_ref() }
    }

    /// Class of the object
    pub fn class(&self) -> &ClassRef {
        &self.header().ce
    }

    /// Callback table of the object
    pub fn handlers(&self) -> &Arc<ObjectHandlers> {
        &self.header().handlers
    }

    /// Object handle number
    pub fn handle(&self) -> u32 {
        self.header().handle
    }

    /// Current number of handles
    pub fn refcount(&self) -> u32 {
        self.header().refcount.get()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.ptr == other.ptr
    }

    /// Dynamic property table
    pub fn properties(&self) -> &RefCell<HostArray> {
        &self.header().properties
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        let header = self.header();
        header.refcount.set(header.refcount.get() + 1);
        Self { ptr: self.ptr }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        let count = {
            let header = self.header();
            let count = header.refcount.get().saturating_sub(1);
            header.refcount.set(count);
            count
        };
        if count == 0 {
            // SAFETY: this was the last handle, nothing else observes the header.
            unsafe { release(self.ptr) };
        }
    }
}

/// Run the release protocol on an object with no remaining handles.
///
/// The destructor runs on a temporary handle; if it stores the object
/// somewhere, the object survives and is released again later, this time
/// skipping straight to `free_obj`.
unsafe fn release(ptr: NonNull<ObjectHeader>) {
    let header = ptr.as_ref();
    if !header.flags().contains(ObjectFlags::DESTRUCTOR_CALLED) {
        header.set_flag(ObjectFlags::DESTRUCTOR_CALLED);
        header.refcount.set(1);
        let guard = ObjectRef { ptr };
        let dtor_obj = guard.handlers().dtor_obj;
        if let Err(error) = dtor_obj(&guard) {
            executor::raise(error);
        }
        drop(guard);
        return;
    }
    if header.flags().contains(ObjectFlags::FREE_CALLED) {
        return;
    }
    header.set_flag(ObjectFlags::FREE_CALLED);
    let handlers = header.handlers.clone();
    (handlers.free_obj)(ptr);
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object({})#{}", self.class().name(), self.handle())
    }
}
