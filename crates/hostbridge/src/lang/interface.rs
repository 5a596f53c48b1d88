//! `Interface` builder

use hostbridge_runtime::Scalar;
use rustc_hash::FxHashMap;

use super::{Arguments, ClassKind, Member, Method, Modifier};
use crate::description::NoInstances;
use crate::vm::{ClassHandle, ClassMetadata, ClassParts};

/// Builder for a native interface: abstract methods and constants only
#[derive(Debug)]
pub struct Interface {
    name: String,
    methods: Vec<Method>,
    members: Vec<Member>,
    parents: Vec<ClassHandle>,
}

impl Interface {
    /// Empty interface
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            members: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Declare a method every implementor must provide
    pub fn method(mut self, name: impl Into<String>, flags: Modifier, arguments: Arguments) -> Self {
        self.methods
            .push(Method::abstract_method(name, flags | Modifier::PUBLIC, arguments));
        self
    }

    /// Interface constant
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.members.push(Member::constant(name, value));
        self
    }

    /// Extend another native interface
    pub fn extends(mut self, parent: &ClassHandle) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Finish the interface
    pub fn build(self) -> ClassHandle {
        ClassMetadata::new(ClassParts {
            name: self.name,
            kind: ClassKind::Interface,
            methods: self.methods,
            properties: FxHashMap::default(),
            members: self.members,
            parent: None,
            interfaces: self.parents,
            description: Box::new(NoInstances),
        })
    }
}
