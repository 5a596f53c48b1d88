//! Extensions and namespaces
//!
//! An [`Extension`] groups the native classes a module contributes, either
//! directly or inside (nested) [`Namespace`]s. [`Extension::startup`] creates
//! every host class record; [`Extension::shutdown`] drops their recovery
//! anchors.

use hostbridge_runtime::{Engine, HostError, HostResult};

use crate::config::{ExtensionConfig, RegistrationOrder};
use crate::vm::{ClassHandle, RegistrationDiagnostic};

/// Named group of classes and nested namespaces
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    namespaces: Vec<Namespace>,
    classes: Vec<ClassHandle>,
}

impl Namespace {
    /// Empty namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Namespace name (one segment)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a nested namespace
    pub fn register_namespace(&mut self, namespace: Namespace) -> &mut Self {
        self.namespaces.push(namespace);
        self
    }

    /// Add a class
    pub fn register_class(&mut self, class: ClassHandle) -> &mut Self {
        self.classes.push(class);
        self
    }

    /// Number of directly nested namespaces
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Number of classes declared directly in this namespace
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Nested namespace by name or `Inner\Deeper` path
    pub fn find_namespace(&self, path: &str) -> Option<&Namespace> {
        find_in(&self.namespaces, path)
    }

    /// Class by plain name or by path relative to this namespace
    pub fn find_class(&self, path: &str) -> Option<&ClassHandle> {
        match path.rsplit_once('\\') {
            Some((namespace, class)) => self.find_namespace(namespace)?.find_class(class),
            None => self.classes.iter().find(|c| c.name().eq_ignore_ascii_case(path)),
        }
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a ClassHandle)>) {
        let qualified = if prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}\\{}", prefix, self.name)
        };
        out.extend(self.classes.iter().map(|class| (qualified.clone(), class)));
        for namespace in &self.namespaces {
            namespace.collect(&qualified, out);
        }
    }
}

fn find_in<'a>(namespaces: &'a [Namespace], path: &str) -> Option<&'a Namespace> {
    let path = path.trim_matches('\\');
    let (head, rest) = match path.split_once('\\') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let found = namespaces.iter().find(|ns| ns.name == head)?;
    match rest {
        Some(rest) => found.find_namespace(rest),
        None => Some(found),
    }
}

/// Outcome of [`Extension::startup`]
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// Qualified names of the initialized classes, in initialization order
    pub registered: Vec<String>,
    /// Problems found while linking parents and interfaces
    pub diagnostics: Vec<RegistrationDiagnostic>,
}

impl StartupReport {
    /// Check if every class was linked to its parent and interfaces
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// A module's worth of native classes
#[derive(Debug)]
pub struct Extension {
    config: ExtensionConfig,
    namespaces: Vec<Namespace>,
    classes: Vec<ClassHandle>,
    started: bool,
}

impl Extension {
    /// Extension with default settings
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_config(ExtensionConfig::new(name, version))
    }

    /// Extension with explicit settings
    pub fn with_config(config: ExtensionConfig) -> Self {
        Self {
            config,
            namespaces: Vec::new(),
            classes: Vec::new(),
            started: false,
        }
    }

    /// Extension name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Extension version
    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Settings
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Check if `startup` has completed
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Add a top-level namespace
    pub fn register_namespace(&mut self, namespace: Namespace) -> &mut Self {
        self.namespaces.push(namespace);
        self
    }

    /// Number of top-level namespaces
    pub fn namespace_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Namespace by name or `Outer\Inner` path
    pub fn find_namespace(&self, path: &str) -> Option<&Namespace> {
        find_in(&self.namespaces, path)
    }

    /// Add a class outside any namespace
    pub fn register_class(&mut self, class: ClassHandle) -> &mut Self {
        self.classes.push(class);
        self
    }

    /// Number of classes outside any namespace
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Class by plain name or by `Namespace\Class` path
    pub fn find_class(&self, path: &str) -> Option<&ClassHandle> {
        let path = path.trim_start_matches('\\');
        match path.rsplit_once('\\') {
            Some((namespace, class)) => self.find_namespace(namespace)?.find_class(class),
            None => self.classes.iter().find(|c| c.name().eq_ignore_ascii_case(path)),
        }
    }

    /// Every class with the namespace it is declared in
    fn all_classes(&self) -> Vec<(String, &ClassHandle)> {
        let mut out: Vec<(String, &ClassHandle)> =
            self.classes.iter().map(|class| (String::new(), class)).collect();
        for namespace in &self.namespaces {
            namespace.collect("", &mut out);
        }
        out
    }

    /// Create the host class records of every registered class
    pub fn startup(&mut self, engine: &Engine) -> HostResult<StartupReport> {
        let mut classes = self.all_classes();
        if self.config.registration_order == RegistrationOrder::Dependency {
            classes.sort_by_key(|(_, class)| class.depth());
        }

        let mut report = StartupReport::default();
        for (namespace, class) in classes {
            let entry = class.initialize(engine, &namespace)?;
            if self.config.log_registration {
                log::debug!("{}: initialized {}", self.config.name, entry.name());
            }
            report.registered.push(entry.name().to_string());
            report.diagnostics.extend(class.diagnostics());
        }

        if self.config.strict_hierarchy {
            if let Some(diagnostic) = report.diagnostics.first() {
                return Err(HostError::fatal(diagnostic.to_string()));
            }
        }

        log::info!(
            "extension {} {} started: {} classes, {} diagnostics",
            self.config.name,
            self.config.version,
            report.registered.len(),
            report.diagnostics.len()
        );
        self.started = true;
        Ok(report)
    }

    /// Drop the recovery anchors of every class
    pub fn shutdown(&mut self) {
        for (_, class) in self.all_classes() {
            class.release();
        }
        self.started = false;
        log::debug!("extension {} shut down", self.config.name);
    }
}
