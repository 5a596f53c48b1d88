//! Hostbridge - native classes inside a dynamic host object runtime
//!
//! This crate registers Rust types as host classes and routes every dynamic
//! operation the host performs on their objects back into native code:
//! - **Descriptors**: members, methods, explicit properties and the
//!   [`Class`] / [`Interface`] builders (`lang` module)
//! - **Capabilities**: traits a native type implements to opt into host
//!   behaviors such as `count()`, index access or magic calls (`capability` module)
//! - **Bridge**: class metadata, object binding, callback dispatch, magic
//!   call forwarding and metadata recovery (`vm` module)
//! - **Extensions**: namespaces, registration and startup (`extension` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge::{Arguments, Class, Extension, Modifier};
//! use hostbridge_runtime::Engine;
//!
//! let counter = Class::<Counter>::new("Counter")
//!     .countable()
//!     .method("increment", Counter::increment, Modifier::PUBLIC, Arguments::new())
//!     .build();
//!
//! let mut ext = Extension::new("counters", "1.0");
//! ext.register_class(counter);
//!
//! let engine = Engine::new();
//! ext.startup(&engine)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod capability;
pub mod config;
pub mod convert;
pub mod description;
pub mod error;
pub mod extension;
pub mod lang;
pub mod vm;

pub use capability::{
    ArrayAccess, Capabilities, Castable, Comparable, Countable, Destructible, Invokable, MagicCall,
    MagicProperties, MagicStaticCall,
};
pub use config::{ConfigError, ExtensionConfig, RegistrationOrder};
pub use convert::{FromValue, IntoValue};
pub use description::{ClassDescription, NativeHooks, NativeInstance, NoInstances};
pub use error::{NativeError, NativeResult};
pub use extension::{Extension, Namespace, StartupReport};
pub use lang::{
    Argument, Arguments, Class, ClassKind, Constant, Interface, Member, Method, Modifier, PropertyDescriptor,
    PropertyKind,
};
pub use vm::{CallStats, ClassHandle, ClassMetadata, Parameters, RegistrationDiagnostic};
