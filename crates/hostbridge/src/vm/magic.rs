//! Magic call forwarding
//!
//! When the host cannot find a declared method, the bridge hands back a
//! [`CallContext`]: a function descriptor flagged `CALL_VIA_HANDLER` that
//! lives for exactly one call. Invoking it forwards the method name and the
//! arguments to the native magic hooks; dropping it (on any path) is counted
//! in the class's [`CallStats`](super::CallStats).

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use hostbridge_runtime::{
    AccFlags, AccessType, CallViaHandler, ExecuteData, HostError, HostResult, InternalFunction, Value,
};

use super::dispatch::{call_hook, not_implemented_as_none};
use super::{CallStats, ClassHandle, ClassMetadata, Parameters};
use crate::convert::to_host_value;

/// Which native hook a context forwards to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Undeclared method called on an object
    Instance,
    /// Undeclared method called on the class
    Static,
    /// Object called as a function
    Invoke,
}

/// One-shot descriptor for an undeclared method
pub struct CallContext {
    function: InternalFunction,
    kind: CallKind,
    class: Weak<ClassMetadata>,
    stats: Arc<CallStats>,
}

impl CallContext {
    /// Allocate a descriptor for `name` called in `scope`
    pub fn new(metadata: &ClassHandle, name: &str, scope: &str, kind: CallKind) -> Self {
        let mut flags = AccFlags::PUBLIC | AccFlags::CALL_VIA_HANDLER;
        if kind == CallKind::Static {
            flags |= AccFlags::STATIC;
        }
        let stats = metadata.call_stats().clone();
        stats.allocated.fetch_add(1, Ordering::SeqCst);
        Self {
            function: InternalFunction {
                name: name.to_string(),
                handler: None,
                flags,
                scope: Some(scope.to_string()),
                arg_info: Vec::new(),
                required_num_args: 0,
            },
            kind,
            class: Arc::downgrade(metadata),
            stats,
        }
    }

    /// Hook the context forwards to
    pub fn kind(&self) -> CallKind {
        self.kind
    }

    fn forward(&self, metadata: &ClassMetadata, params: &Parameters) -> HostResult<Option<Value>> {
        let description = metadata.description();
        let name = self.function.name.as_str();
        match (self.kind, params.object()) {
            (CallKind::Invoke, Some(object)) => call_hook(object, |native| description.invoke(native, params)),
            (CallKind::Invoke, None) => Ok(None),
            (_, Some(object)) => call_hook(object, |native| description.magic_call(native, name, params)),
            (_, None) => not_implemented_as_none(description.magic_call_static(name, params)),
        }
    }

    fn undefined(&self) -> HostError {
        let scope = self.function.scope.as_deref().unwrap_or_default();
        match self.kind {
            CallKind::Invoke => HostError::exception("Error", format!("Object of type {} is not callable", scope)),
            _ => HostError::fatal(format!(
                "Call to undefined method {}::{}()",
                scope, self.function.name
            )),
        }
    }
}

impl CallViaHandler for CallContext {
    fn function(&self) -> &InternalFunction {
        &self.function
    }

    fn invoke(self: Box<Self>, frame: &mut ExecuteData) -> HostResult<Value> {
        let metadata = self
            .class
            .upgrade()
            .ok_or_else(|| HostError::fatal(format!("Class of method {}() was released", self.function.name)))?;
        let params = Parameters::from_frame(frame);
        log::trace!(
            "forwarding {:?} call {}::{}() with {} arguments",
            self.kind,
            metadata.qualified_name(),
            self.function.name,
            params.len()
        );
        match self.forward(&metadata, &params)? {
            Some(value) => Ok(to_host_value(value, AccessType::Read)),
            None => Err(self.undefined()),
        }
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
