//! The class/object bridge
//!
//! - [`ClassMetadata`]: owns a native class's descriptors and builds its host
//!   class record
//! - [`anchor`]: recovers the metadata from a bare host class record
//! - [`binder`]: pairs each native instance with its host object header
//! - [`dispatch`]: the callback table every host operation goes through
//! - [`magic`]: one-shot function descriptors for undeclared methods
//! - [`Parameters`]: the argument view handed to native code

pub mod anchor;
pub mod binder;
mod class_metadata;
pub mod dispatch;
pub mod magic;
mod parameters;

pub use class_metadata::{CallStats, ClassHandle, ClassMetadata, ClassParts, RegistrationDiagnostic};
pub use parameters::Parameters;
