//! Metadata recovery
//!
//! Host callbacks only receive host class records. Each record created by
//! [`ClassMetadata::initialize`](super::ClassMetadata::initialize) is anchored
//! here by its id; the anchor owns the metadata until it is released. Records created by user code that extend a native class
//! have no anchor of their own; recovery walks their parent chain to the
//! nearest anchored ancestor and memoizes the answer.

use std::sync::Arc;

use hostbridge_runtime::{ClassEntry, ClassId, HostError, HostResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{ClassHandle, ClassMetadata};

#[derive(Default)]
struct AnchorTable {
    /// Records created from metadata
    local: FxHashMap<ClassId, ClassHandle>,
    /// Derived records resolved to their anchored ancestor
    resolved: FxHashMap<ClassId, ClassId>,
}

impl AnchorTable {
    fn local(&self, id: ClassId) -> Option<ClassHandle> {
        self.local.get(&id).cloned()
    }
}

static ANCHORS: Lazy<RwLock<AnchorTable>> = Lazy::new(|| RwLock::new(AnchorTable::default()));

/// Anchor `metadata` on its host record
pub(crate) fn write(entry: &ClassEntry, metadata: &Arc<ClassMetadata>) {
    ANCHORS
        .write()
        .local
        .insert(entry.id(), Arc::clone(metadata));
}

/// Find the metadata of `entry` or of its nearest native ancestor
pub fn recover(entry: &ClassEntry) -> HostResult<ClassHandle> {
    {
        let table = ANCHORS.read();
        if let Some(metadata) = table.local(entry.id()) {
            return Ok(metadata);
        }
        if let Some(ancestor) = table.resolved.get(&entry.id()) {
            if let Some(metadata) = table.local(*ancestor) {
                return Ok(metadata);
            }
        }
    }

    let mut current = entry.parent();
    while let Some(ancestor) = current {
        let found = ANCHORS.read().local(ancestor.id());
        if let Some(metadata) = found {
            ANCHORS.write().resolved.insert(entry.id(), ancestor.id());
            return Ok(metadata);
        }
        current = ancestor.parent();
    }

    Err(HostError::fatal(format!(
        "Class {} is not bound to a native class",
        entry.name()
    )))
}

/// Check if `entry` carries an anchor of its own
pub fn is_anchored(entry: &ClassEntry) -> bool {
    ANCHORS.read().local(entry.id()).is_some()
}

/// Remove the anchor of `id` and every memoized resolution through it
pub(crate) fn release(id: ClassId) {
    let mut table = ANCHORS.write();
    table.local.remove(&id);
    table.resolved.retain(|derived, ancestor| *derived != id && *ancestor != id);
}
