//! Class metadata
//!
//! `ClassMetadata` is the native-side owner of a class: its methods, explicit
//! properties, fixed members, parent and interfaces, and the description that
//! knows how to construct and drive native instances. [`ClassMetadata::initialize`]
//! turns it into a host class record exactly once.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hostbridge_runtime::{ClassDecl, ClassRef, Engine, FunctionEntry, HostError, HostResult, ObjectHandlers};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{anchor, dispatch};
use crate::capability::Capabilities;
use crate::description::ClassDescription;
use crate::lang::{ClassKind, Member, Method, PropertyDescriptor};

/// Shared handle to class metadata
pub type ClassHandle = Arc<ClassMetadata>;

/// Recoverable problem found while registering a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationDiagnostic {
    /// The parent had no host record yet; the class was registered without it
    ParentNotInitialized {
        /// Class being registered
        class: String,
        /// Parent that was skipped
        parent: String,
    },
    /// An interface had no host record yet and was skipped
    InterfaceNotInitialized {
        /// Class being registered
        class: String,
        /// Interface that was skipped
        interface: String,
    },
}

impl fmt::Display for RegistrationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationDiagnostic::ParentNotInitialized { class, parent } => write!(
                f,
                "Derived class {} is initialized before base class {}: base class is ignored",
                class, parent
            ),
            RegistrationDiagnostic::InterfaceNotInitialized { class, interface } => write!(
                f,
                "Derived class {} is initialized before interface {}: interface is ignored",
                class, interface
            ),
        }
    }
}

/// Counters of one-shot call descriptors created for a class
#[derive(Debug, Default)]
pub struct CallStats {
    pub(crate) allocated: AtomicUsize,
    pub(crate) released: AtomicUsize,
}

impl CallStats {
    /// Descriptors created so far
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// Descriptors released so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Descriptors currently alive
    pub fn live(&self) -> usize {
        self.allocated().saturating_sub(self.released())
    }
}

/// Everything a builder collected about a class
pub struct ClassParts {
    /// Unqualified class name
    pub name: String,
    /// Kind
    pub kind: ClassKind,
    /// Declared methods, in order
    pub methods: Vec<Method>,
    /// Explicit properties
    pub properties: FxHashMap<String, PropertyDescriptor>,
    /// Constants and property defaults
    pub members: Vec<Member>,
    /// Parent class
    pub parent: Option<ClassHandle>,
    /// Implemented interfaces, in order
    pub interfaces: Vec<ClassHandle>,
    /// Native behavior
    pub description: Box<dyn ClassDescription>,
}

/// Native-side owner of a class
pub struct ClassMetadata {
    name: String,
    kind: ClassKind,
    methods: Vec<Method>,
    properties: FxHashMap<String, PropertyDescriptor>,
    members: Vec<Member>,
    parent: Option<ClassHandle>,
    interfaces: Vec<ClassHandle>,
    description: Box<dyn ClassDescription>,
    capabilities: Capabilities,
    method_entries: OnceCell<Vec<FunctionEntry>>,
    handlers: OnceCell<Arc<ObjectHandlers>>,
    class_entry: OnceCell<ClassRef>,
    diagnostics: Mutex<Vec<RegistrationDiagnostic>>,
    init_lock: Mutex<()>,
    call_stats: Arc<CallStats>,
}

impl ClassMetadata {
    /// Build metadata; capabilities are read from the description once, here
    pub fn new(parts: ClassParts) -> ClassHandle {
        let capabilities = parts.description.capabilities();
        Arc::new(Self {
            name: parts.name,
            kind: parts.kind,
            methods: parts.methods,
            properties: parts.properties,
            members: parts.members,
            parent: parts.parent,
            interfaces: parts.interfaces,
            description: parts.description,
            capabilities,
            method_entries: OnceCell::new(),
            handlers: OnceCell::new(),
            class_entry: OnceCell::new(),
            diagnostics: Mutex::new(Vec::new()),
            init_lock: Mutex::new(()),
            call_stats: Arc::new(CallStats::default()),
        })
    }

    /// Unqualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the host record, or the plain name before initialization
    pub fn qualified_name(&self) -> &str {
        self.class_entry
            .get()
            .map(|entry| entry.name())
            .unwrap_or(&self.name)
    }

    /// Kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Capabilities of the native class
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Check a single capability
    pub fn has_capability(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Native behavior
    pub fn description(&self) -> &dyn ClassDescription {
        self.description.as_ref()
    }

    /// Declared methods
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Explicit property by name
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Number of explicit properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Constants and property defaults
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Parent class
    pub fn parent(&self) -> Option<&ClassHandle> {
        self.parent.as_ref()
    }

    /// Implemented interfaces
    pub fn interfaces(&self) -> &[ClassHandle] {
        &self.interfaces
    }

    /// Host record, once initialized
    pub fn class_entry(&self) -> Option<ClassRef> {
        self.class_entry.get().cloned()
    }

    /// Check if the host record exists
    pub fn is_initialized(&self) -> bool {
        self.class_entry.get().is_some()
    }

    /// Problems found during registration
    pub fn diagnostics(&self) -> Vec<RegistrationDiagnostic> {
        self.diagnostics.lock().clone()
    }

    /// One-shot call descriptor counters
    pub fn call_stats(&self) -> &Arc<CallStats> {
        &self.call_stats
    }

    /// Length of the longest parent/interface chain above this class
    pub fn depth(&self) -> usize {
        let parent = self.parent.iter();
        parent
            .chain(self.interfaces.iter())
            .map(|ancestor| ancestor.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Host function table: one entry per method followed by the sentinel
    pub fn method_entries(&self) -> &[FunctionEntry] {
        self.method_entries.get_or_init(|| {
            let mut entries: Vec<FunctionEntry> = self.methods.iter().map(Method::initialize).collect();
            entries.push(FunctionEntry::sentinel());
            entries
        })
    }

    /// Callback table shared by every object of the class
    pub fn handlers(&self) -> Arc<ObjectHandlers> {
        self.handlers
            .get_or_init(|| Arc::new(dispatch::build_handlers(self.capabilities)))
            .clone()
    }

    /// Create the host class record.
    ///
    /// The name is qualified with `namespace` unless it is empty or `\`. A
    /// parent or interface without a host record is skipped with a
    /// diagnostic. Everything that can fail is checked before the record is
    /// registered, so a failed call leaves `engine` untouched.
    ///
    /// Calling this again with the same engine returns the same record and
    /// restores its anchor if it was released. A handle belongs to one
    /// engine; initializing it against another one is a fatal error.
    pub fn initialize(self: &Arc<Self>, engine: &Engine, namespace: &str) -> HostResult<ClassRef> {
        let _guard = self.init_lock.lock();
        if let Some(entry) = self.class_entry.get() {
            return self.reinitialize(engine, entry);
        }

        let qualified = if namespace.is_empty() || namespace == "\\" {
            self.name.clone()
        } else {
            format!("{}\\{}", namespace.trim_end_matches('\\'), self.name)
        };

        let mut diagnostics = Vec::new();
        let parent_entry = match &self.parent {
            Some(parent) => match parent.class_entry() {
                Some(entry) => Some(entry),
                None => {
                    diagnostics.push(RegistrationDiagnostic::ParentNotInitialized {
                        class: qualified.clone(),
                        parent: parent.qualified_name().to_string(),
                    });
                    None
                }
            },
            None => None,
        };

        let mut linked = Vec::new();
        for interface in &self.interfaces {
            match interface.class_entry() {
                Some(entry) if !entry.is_interface() => {
                    return Err(HostError::fatal(format!(
                        "{} cannot implement {} - it is not an interface",
                        qualified,
                        entry.name()
                    )));
                }
                Some(entry) => linked.push(entry),
                None => diagnostics.push(RegistrationDiagnostic::InterfaceNotInitialized {
                    class: qualified.clone(),
                    interface: interface.qualified_name().to_string(),
                }),
            }
        }
        self.check_members(&qualified)?;

        let decl = ClassDecl::new(qualified.clone())
            .with_flags(self.kind.flags())
            .with_functions(self.method_entries().to_vec())
            .with_create_object(dispatch::create_object)
            .with_get_static_method(dispatch::get_static_method);
        let entry = engine.register_internal_class(decl, parent_entry.as_ref())?;
        anchor::write(&entry, self);
        let _ = self.class_entry.set(entry.clone());
        for diagnostic in diagnostics {
            self.diagnose(diagnostic);
        }

        engine.class_implements(&entry, &linked)?;
        for member in &self.members {
            member.initialize(&entry)?;
        }

        log::debug!(
            "registered native class {} ({} methods, {} properties, capabilities {:?}, header offset {})",
            entry.name(),
            self.methods.len(),
            self.properties.len(),
            self.capabilities,
            self.handlers().offset
        );
        Ok(entry)
    }

    fn reinitialize(self: &Arc<Self>, engine: &Engine, entry: &ClassRef) -> HostResult<ClassRef> {
        let registered = engine.lookup_class(entry.name());
        if !registered.is_some_and(|found| Arc::ptr_eq(&found, entry)) {
            return Err(HostError::fatal(format!(
                "Class {} is already registered with another engine",
                entry.name()
            )));
        }
        if !anchor::is_anchored(entry) {
            anchor::write(entry, self);
            log::debug!("re-anchored native class {}", entry.name());
        }
        Ok(entry.clone())
    }

    /// Reject member lists the host would refuse to declare
    fn check_members(&self, class: &str) -> HostResult<()> {
        let mut constants = FxHashSet::default();
        let mut properties = FxHashSet::default();
        for member in &self.members {
            if member.is_constant() {
                if !constants.insert(member.name()) {
                    return Err(HostError::fatal(format!(
                        "Cannot redefine class constant {}::{}",
                        class,
                        member.name()
                    )));
                }
            } else if !properties.insert(member.name()) {
                return Err(HostError::fatal(format!(
                    "Cannot redeclare {}::${}",
                    class,
                    member.name()
                )));
            }
        }
        Ok(())
    }

    /// Drop the metadata-recovery anchor of the host record
    pub fn release(&self) {
        if let Some(entry) = self.class_entry.get() {
            anchor::release(entry.id());
        }
    }

    fn diagnose(&self, diagnostic: RegistrationDiagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.lock().push(diagnostic);
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("name", &self.qualified_name())
            .field("kind", &self.kind)
            .field("methods", &self.methods.len())
            .field("capabilities", &self.capabilities)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
