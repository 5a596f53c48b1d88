//! Class records
//!
//! A [`ClassEntry`] is the host-visible record of a class. Its identity
//! ([`ClassId`]) is permanent; the function table is fixed at registration,
//! while constants, default properties and implemented interfaces can be added
//! to the finished record.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{HostError, HostResult};
use crate::function::{AccFlags, Callee, FunctionEntry, InternalFunction};
use crate::object::ObjectRef;
use crate::value::Scalar;

/// Shared handle to a class record
pub type ClassRef = Arc<ClassEntry>;

/// Hook that allocates objects of a class
pub type CreateObjectFn = fn(&ClassRef) -> HostResult<ObjectRef>;

/// Hook that resolves static methods the function table does not declare
pub type GetStaticMethodFn = fn(&ClassRef, &str) -> HostResult<Option<Callee>>;

/// Global counter for class identities
static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Permanent identity of a class record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Class kind flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        /// Declared abstract
        const EXPLICIT_ABSTRACT = 1 << 0;
        /// Abstract because it has abstract methods
        const IMPLICIT_ABSTRACT = 1 << 1;
        /// Cannot be extended
        const FINAL = 1 << 2;
        /// Interface
        const INTERFACE = 1 << 3;
        /// Declared by user code rather than an extension
        const USER = 1 << 4;
    }
}

/// Declared property of a class
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Default value
    pub default: Scalar,
    /// Access flags
    pub flags: AccFlags,
}

/// Registration request for a class record
#[derive(Default)]
pub struct ClassDecl {
    /// Class name (possibly namespace qualified)
    pub name: String,
    /// Kind flags
    pub flags: ClassFlags,
    /// Function table, read up to the first sentinel
    pub functions: Vec<FunctionEntry>,
    /// Object allocation hook
    pub create_object: Option<CreateObjectFn>,
    /// Static method fallback hook
    pub get_static_method: Option<GetStaticMethodFn>,
}

impl ClassDecl {
    /// Declare a class with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set kind flags
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the function table
    pub fn with_functions(mut self, functions: Vec<FunctionEntry>) -> Self {
        self.functions = functions;
        self
    }

    /// Set the object allocation hook
    pub fn with_create_object(mut self, hook: CreateObjectFn) -> Self {
        self.create_object = Some(hook);
        self
    }

    /// Set the static method fallback hook
    pub fn with_get_static_method(mut self, hook: GetStaticMethodFn) -> Self {
        self.get_static_method = Some(hook);
        self
    }
}

/// Host-visible class record
pub struct ClassEntry {
    id: ClassId,
    name: String,
    flags: ClassFlags,
    parent: Option<ClassRef>,
    interfaces: RwLock<Vec<ClassRef>>,
    functions: Vec<Arc<InternalFunction>>,
    function_index: FxHashMap<String, usize>,
    constants: RwLock<FxHashMap<String, Scalar>>,
    properties: RwLock<Vec<PropertyInfo>>,
    create_object: Option<CreateObjectFn>,
    get_static_method: Option<GetStaticMethodFn>,
}

impl ClassEntry {
    /// Build a record from a declaration.
    ///
    /// Entries after the first sentinel are ignored. A class with abstract
    /// methods is flagged implicitly abstract.
    pub(crate) fn from_decl(decl: ClassDecl, parent: Option<ClassRef>) -> HostResult<Self> {
        let ClassDecl {
            name,
            mut flags,
            functions: entries,
            create_object,
            get_static_method,
        } = decl;

        if let Some(parent) = &parent {
            if parent.flags.contains(ClassFlags::FINAL) {
                return Err(HostError::fatal(format!(
                    "Class {} may not inherit from final class ({})",
                    name, parent.name
                )));
            }
        }

        let mut functions = Vec::new();
        let mut function_index = FxHashMap::default();
        for entry in entries.iter().take_while(|e| !e.is_sentinel()) {
            let Some(function) = InternalFunction::from_entry(entry, &name) else {
                break;
            };
            let key = function.name.to_ascii_lowercase();
            if function_index.contains_key(&key) {
                return Err(HostError::fatal(format!(
                    "Cannot redeclare {}::{}()",
                    name, function.name
                )));
            }
            if function.is_abstract() && !flags.contains(ClassFlags::INTERFACE) {
                flags |= ClassFlags::IMPLICIT_ABSTRACT;
            }
            function_index.insert(key, functions.len());
            functions.push(Arc::new(function));
        }

        Ok(Self {
            id: ClassId::next(),
            name,
            flags,
            parent,
            interfaces: RwLock::new(Vec::new()),
            functions,
            function_index,
            constants: RwLock::new(FxHashMap::default()),
            properties: RwLock::new(Vec::new()),
            create_object,
            get_static_method,
        })
    }

    /// Permanent identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name as registered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind flags
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    /// Parent record
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> Vec<ClassRef> {
        self.interfaces.read().clone()
    }

    pub(crate) fn add_interface(&self, interface: ClassRef) {
        let mut interfaces = self.interfaces.write();
        if !interfaces.iter().any(|i| i.id == interface.id) {
            interfaces.push(interface);
        }
    }

    /// Check for the interface flag
    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// Check if objects of this class cannot be created
    pub fn is_abstract(&self) -> bool {
        self.flags
            .intersects(ClassFlags::EXPLICIT_ABSTRACT | ClassFlags::IMPLICIT_ABSTRACT)
    }

    /// Check for the final flag
    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }

    /// Functions declared by this class, in table order
    pub fn functions(&self) -> &[Arc<InternalFunction>] {
        &self.functions
    }

    /// Find a function declared by this class or an ancestor (case-insensitive)
    pub fn find_function(&self, name: &str) -> Option<Arc<InternalFunction>> {
        let key = name.to_ascii_lowercase();
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(&index) = class.function_index.get(&key) {
                return Some(class.functions[index].clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Declare a class constant
    pub fn declare_constant(&self, name: impl Into<String>, value: Scalar) -> HostResult<()> {
        let name = name.into();
        let mut constants = self.constants.write();
        if constants.contains_key(&name) {
            return Err(HostError::fatal(format!(
                "Cannot redefine class constant {}::{}",
                self.name, name
            )));
        }
        constants.insert(name, value);
        Ok(())
    }

    /// Look up a constant on this class or an ancestor
    pub fn constant(&self, name: &str) -> Option<Scalar> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(value) = class.constants.read().get(name) {
                return Some(value.clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Declare a property with a default value
    pub fn declare_property(
        &self,
        name: impl Into<String>,
        default: Scalar,
        flags: AccFlags,
    ) -> HostResult<()> {
        let name = name.into();
        let mut properties = self.properties.write();
        if properties.iter().any(|p| p.name == name) {
            return Err(HostError::fatal(format!(
                "Cannot redeclare {}::${}",
                self.name, name
            )));
        }
        properties.push(PropertyInfo {
            name,
            default,
            flags,
        });
        Ok(())
    }

    /// Look up a declared property on this class or an ancestor
    pub fn property_info(&self, name: &str) -> Option<PropertyInfo> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(info) = class.properties.read().iter().find(|p| p.name == name) {
                return Some(info.clone());
            }
            current = class.parent.as_deref();
        }
        None
    }

    /// Non-static property defaults including inherited ones, ancestors first
    pub fn default_properties(&self) -> Vec<PropertyInfo> {
        let mut defaults = match &self.parent {
            Some(parent) => parent.default_properties(),
            None => Vec::new(),
        };
        for info in self.properties.read().iter() {
            if info.flags.contains(AccFlags::STATIC) {
                continue;
            }
            match defaults.iter_mut().find(|p| p.name == info.name) {
                Some(slot) => *slot = info.clone(),
                None => defaults.push(info.clone()),
            }
        }
        defaults
    }

    /// Object allocation hook, inherited from ancestors
    pub fn create_object_hook(&self) -> Option<CreateObjectFn> {
        self.create_object
            .or_else(|| self.parent.as_ref().and_then(|p| p.create_object_hook()))
    }

    /// Static method fallback hook, inherited from ancestors
    pub fn get_static_method_hook(&self) -> Option<GetStaticMethodFn> {
        self.get_static_method
            .or_else(|| self.parent.as_ref().and_then(|p| p.get_static_method_hook()))
    }

    /// Check if this class is, extends or implements `other`
    pub fn instance_of(&self, other: &ClassEntry) -> bool {
        if self.id == other.id {
            return true;
        }
        if self.interfaces.read().iter().any(|i| i.instance_of(other)) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.instance_of(other),
            None => false,
        }
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("functions", &self.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::ExecuteData;
    use crate::value::Value;

    fn noop(_frame: &mut ExecuteData) -> HostResult<Value> {
        Ok(Value::Null)
    }

    #[test]
    fn test_function_table_stops_at_sentinel() {
        let decl = ClassDecl::new("Foo").with_functions(vec![
            FunctionEntry::new("first", Arc::new(noop), AccFlags::PUBLIC),
            FunctionEntry::new("Second", Arc::new(noop), AccFlags::PUBLIC),
            FunctionEntry::sentinel(),
            FunctionEntry::new("ignored", Arc::new(noop), AccFlags::PUBLIC),
        ]);
        let class = ClassEntry::from_decl(decl, None).unwrap();
        assert_eq!(class.functions().len(), 2);
        assert!(class.find_function("SECOND").is_some());
        assert!(class.find_function("ignored").is_none());
    }

    #[test]
    fn test_abstract_method_marks_class_abstract() {
        let decl = ClassDecl::new("Shape").with_functions(vec![
            FunctionEntry::abstract_method("area", AccFlags::PUBLIC),
            FunctionEntry::sentinel(),
        ]);
        let class = ClassEntry::from_decl(decl, None).unwrap();
        assert!(class.is_abstract());
        assert!(class.flags().contains(ClassFlags::IMPLICIT_ABSTRACT));
    }

    #[test]
    fn test_inherited_lookup() {
        let base = Arc::new(
            ClassEntry::from_decl(
                ClassDecl::new("Base").with_functions(vec![
                    FunctionEntry::new("hello", Arc::new(noop), AccFlags::PUBLIC),
                    FunctionEntry::sentinel(),
                ]),
                None,
            )
            .unwrap(),
        );
        base.declare_constant("VERSION", Scalar::Long(2)).unwrap();
        base.declare_property("size", Scalar::Long(0), AccFlags::PUBLIC).unwrap();

        let child = ClassEntry::from_decl(ClassDecl::new("Child"), Some(base.clone())).unwrap();
        child.declare_property("size", Scalar::Long(5), AccFlags::PUBLIC).unwrap();
        child.declare_property("color", Scalar::from("red"), AccFlags::PUBLIC).unwrap();

        assert!(child.find_function("hello").is_some());
        assert_eq!(child.constant("VERSION"), Some(Scalar::Long(2)));
        assert!(child.instance_of(&base));
        assert!(!base.instance_of(&child));

        let defaults = child.default_properties();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[0].default, Scalar::Long(5));
    }

    #[test]
    fn test_redefined_constant_is_fatal() {
        let class = ClassEntry::from_decl(ClassDecl::new("Foo"), None).unwrap();
        class.declare_constant("A", Scalar::Long(1)).unwrap();
        assert!(class.declare_constant("A", Scalar::Long(2)).unwrap_err().is_fatal());
    }

    #[test]
    fn test_final_parent_rejected() {
        let base = Arc::new(
            ClassEntry::from_decl(ClassDecl::new("Sealed").with_flags(ClassFlags::FINAL), None)
                .unwrap(),
        );
        assert!(ClassEntry::from_decl(ClassDecl::new("Child"), Some(base)).is_err());
    }
}
