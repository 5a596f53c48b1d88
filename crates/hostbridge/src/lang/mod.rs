//! Descriptors native code uses to declare classes
//!
//! - [`Member`] / [`Constant`]: fixed-value properties and class constants
//! - [`Method`] / [`Arguments`]: callable methods and their signatures
//! - [`PropertyDescriptor`]: explicit properties backed by a value or accessors
//! - [`Class`] / [`Interface`]: builders that produce a [`ClassHandle`]
//!
//! [`ClassHandle`]: crate::vm::ClassHandle

mod argument;
mod class;
mod interface;
mod member;
mod method;
mod property;

pub use argument::{Argument, Arguments};
pub use class::Class;
pub use interface::Interface;
pub use member::{Constant, Member};
pub use method::{Method, MethodCallback};
pub use property::{Getter, PropertyDescriptor, PropertyKind, PropertyValue, Setter};

pub use hostbridge_runtime::AccFlags as Modifier;

/// Flags that may be set on a property or constant
pub const PROPERTY_MODIFIERS: Modifier = Modifier::PUBLIC
    .union(Modifier::PROTECTED)
    .union(Modifier::PRIVATE)
    .union(Modifier::STATIC)
    .union(Modifier::CONST);

/// Flags that may be set on a method
pub const METHOD_MODIFIERS: Modifier = Modifier::PUBLIC
    .union(Modifier::PROTECTED)
    .union(Modifier::PRIVATE)
    .union(Modifier::STATIC)
    .union(Modifier::FINAL)
    .union(Modifier::ABSTRACT);

/// Kind of a class declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassKind {
    /// Ordinary class
    #[default]
    Regular,
    /// Declared abstract
    Abstract,
    /// Cannot be extended
    Final,
    /// Interface
    Interface,
}

impl ClassKind {
    /// Host class flags of this kind
    pub fn flags(self) -> hostbridge_runtime::ClassFlags {
        use hostbridge_runtime::ClassFlags;
        match self {
            ClassKind::Regular => ClassFlags::empty(),
            ClassKind::Abstract => ClassFlags::EXPLICIT_ABSTRACT,
            ClassKind::Final => ClassFlags::FINAL,
            ClassKind::Interface => ClassFlags::INTERFACE,
        }
    }
}
