//! Hostbridge runtime - the host object model
//!
//! A dynamic host engine in which every class participates in the object
//! model through a fixed table of interception callbacks:
//!
//! - [`ClassEntry`] records, created through [`Engine::register_internal_class`]
//! - [`ObjectHeader`] / [`ObjectRef`], a reference-counted object handle whose
//!   header may be embedded inside a larger allocation
//! - [`ObjectHandlers`], the per-class callback table, with
//!   [`std_object_handlers`] as the behavior of ordinary objects
//! - [`Engine`], which performs the dynamic operations (property and index
//!   access, count, cast, clone, compare, method calls) through those tables
//!
//! # Example
//!
//! ```ignore
//! use hostbridge_runtime::{ClassDecl, Engine, Value};
//!
//! let engine = Engine::new();
//! let class = engine.register_internal_class(ClassDecl::new("Point"), None)?;
//! let point = engine.new_object(&class)?;
//! engine.write_property(&point, "x", Value::Long(3))?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod array;
pub mod class;
pub mod engine;
pub mod error;
pub mod executor;
pub mod function;
pub mod handlers;
pub mod object;
pub mod value;

pub use array::{ArrayKey, HostArray};
pub use class::{ClassDecl, ClassEntry, ClassFlags, ClassId, ClassRef, PropertyInfo};
pub use engine::Engine;
pub use error::{ErrorLevel, HostError, HostException, HostResult};
pub use executor::ReportedError;
pub use function::{
    AccFlags, ArgInfo, CallViaHandler, Callee, ExecuteData, FunctionEntry, InternalFunction,
    InternalHandler,
};
pub use handlers::{std_object_handlers, AccessType, CastType, HasCheck, ObjectHandlers};
pub use object::{ObjectFlags, ObjectHeader, ObjectRef};
pub use value::{Scalar, Value, ValueCell, ValueType};
