//! Function records
//!
//! Internal classes hand the engine a table of [`FunctionEntry`] records
//! terminated by a sentinel (an entry without a name). The engine turns each
//! entry into an [`InternalFunction`] owned by the class record.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{HostError, HostResult};
use crate::object::ObjectRef;
use crate::value::Value;

bitflags! {
    /// Access flags of methods, properties and constants
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccFlags: u32 {
        /// Visible everywhere
        const PUBLIC = 1 << 0;
        /// Visible to the class and its descendants
        const PROTECTED = 1 << 1;
        /// Visible to the declaring class
        const PRIVATE = 1 << 2;
        /// Class-level member
        const STATIC = 1 << 4;
        /// Declared without a body
        const ABSTRACT = 1 << 6;
        /// Cannot be overridden
        const FINAL = 1 << 5;
        /// Constant (read-only property)
        const CONST = 1 << 8;
        /// Function descriptor synthesized for a single call
        const CALL_VIA_HANDLER = 1 << 9;
    }
}

impl AccFlags {
    /// Visibility bits only
    pub fn visibility(self) -> AccFlags {
        self & (AccFlags::PUBLIC | AccFlags::PROTECTED | AccFlags::PRIVATE)
    }
}

/// Parameter description of an internal function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgInfo {
    /// Parameter name
    pub name: String,
    /// Declared type hint, if any
    pub type_hint: Option<String>,
    /// Passed by reference
    pub by_reference: bool,
    /// Null accepted
    pub allow_null: bool,
    /// Can be omitted
    pub optional: bool,
}

impl ArgInfo {
    /// Required, by-value parameter without a type hint
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            by_reference: false,
            allow_null: false,
            optional: false,
        }
    }
}

/// Native entry point of an internal function
pub type InternalHandler = Arc<dyn Fn(&mut ExecuteData) -> HostResult<Value> + Send + Sync>;

/// Call frame handed to a function handler
pub struct ExecuteData {
    /// Name the function was called with
    pub function_name: String,
    /// Bound object, if this is an instance call
    pub this: Option<ObjectRef>,
    /// Name of the class the call was made through
    pub called_scope: Option<String>,
    /// Call arguments
    pub args: Vec<Value>,
}

impl ExecuteData {
    /// Create a frame for a free call
    pub fn new(function_name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function_name: function_name.into(),
            this: None,
            called_scope: None,
            args,
        }
    }

    /// Number of arguments passed
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Get an argument by position
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

/// One entry of a function table handed to the engine
#[derive(Clone, Default)]
pub struct FunctionEntry {
    /// Function name; `None` marks the end of the table
    pub name: Option<String>,
    /// Entry point; `None` for abstract methods
    pub handler: Option<InternalHandler>,
    /// Parameter descriptions
    pub arg_info: Vec<ArgInfo>,
    /// Access flags
    pub flags: AccFlags,
}

impl FunctionEntry {
    /// Create a concrete method entry
    pub fn new(name: impl Into<String>, handler: InternalHandler, flags: AccFlags) -> Self {
        Self {
            name: Some(name.into()),
            handler: Some(handler),
            arg_info: Vec::new(),
            flags,
        }
    }

    /// Create an abstract method entry
    pub fn abstract_method(name: impl Into<String>, flags: AccFlags) -> Self {
        Self {
            name: Some(name.into()),
            handler: None,
            arg_info: Vec::new(),
            flags: flags | AccFlags::ABSTRACT,
        }
    }

    /// Table terminator
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// Check if this entry terminates the table
    pub fn is_sentinel(&self) -> bool {
        self.name.is_none()
    }

    /// Attach parameter descriptions
    pub fn with_args(mut self, arg_info: Vec<ArgInfo>) -> Self {
        self.arg_info = arg_info;
        self
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("args", &self.arg_info.len())
            .finish()
    }
}

/// Function owned by a class record (or synthesized for a call)
#[derive(Clone)]
pub struct InternalFunction {
    /// Function name as declared
    pub name: String,
    /// Entry point; `None` for abstract methods
    pub handler: Option<InternalHandler>,
    /// Access flags
    pub flags: AccFlags,
    /// Name of the declaring class
    pub scope: Option<String>,
    /// Parameter descriptions
    pub arg_info: Vec<ArgInfo>,
    /// Number of parameters that must be passed
    pub required_num_args: usize,
}

impl InternalFunction {
    /// Build from a table entry; returns `None` for the sentinel
    pub fn from_entry(entry: &FunctionEntry, scope: &str) -> Option<Self> {
        let name = entry.name.clone()?;
        let required_num_args = entry.arg_info.iter().filter(|a| !a.optional).count();
        Some(Self {
            name,
            handler: entry.handler.clone(),
            flags: entry.flags,
            scope: Some(scope.to_string()),
            arg_info: entry.arg_info.clone(),
            required_num_args,
        })
    }

    /// Check for the abstract flag
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(AccFlags::ABSTRACT)
    }

    /// Check for the static flag
    pub fn is_static(&self) -> bool {
        self.flags.contains(AccFlags::STATIC)
    }

    /// Run the function on a frame
    pub fn call(&self, frame: &mut ExecuteData) -> HostResult<Value> {
        let scope = self.scope.as_deref().unwrap_or_default();
        if frame.args.len() < self.required_num_args {
            return Err(HostError::exception(
                "ArgumentCountError",
                format!(
                    "Too few arguments to function {}::{}(), {} passed and at least {} expected",
                    scope,
                    self.name,
                    frame.args.len(),
                    self.required_num_args
                ),
            ));
        }
        match &self.handler {
            Some(handler) => handler(frame),
            None => Err(HostError::fatal(format!(
                "Cannot call abstract method {}::{}()",
                scope, self.name
            ))),
        }
    }
}

impl fmt::Debug for InternalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalFunction")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Function descriptor that lives for exactly one call.
///
/// The engine consumes the box when it performs the call, so whatever state
/// the descriptor carries is released on every exit path.
pub trait CallViaHandler {
    /// Descriptor the call is made through
    fn function(&self) -> &InternalFunction;

    /// Perform the call, consuming the descriptor
    fn invoke(self: Box<Self>, frame: &mut ExecuteData) -> HostResult<Value>;
}

/// Result of a method lookup
pub enum Callee {
    /// Declared function of a class record
    Function(Arc<InternalFunction>),
    /// Descriptor synthesized for one call
    ViaHandler(Box<dyn CallViaHandler>),
}

impl Callee {
    /// Descriptor of the callee
    pub fn function(&self) -> &InternalFunction {
        match self {
            Callee::Function(function) => function,
            Callee::ViaHandler(handler) => handler.function(),
        }
    }

    /// Perform the call
    pub fn call(self, frame: &mut ExecuteData) -> HostResult<Value> {
        match self {
            Callee::Function(function) => function.call(frame),
            Callee::ViaHandler(handler) => handler.invoke(frame),
        }
    }
}

impl fmt::Debug for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Function(function) => write!(f, "Function({})", function.name),
            Callee::ViaHandler(handler) => write!(f, "ViaHandler({})", handler.function().name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(_frame: &mut ExecuteData) -> HostResult<Value> {
        Ok(Value::Long(42))
    }

    #[test]
    fn test_sentinel_entry() {
        assert!(FunctionEntry::sentinel().is_sentinel());
        let entry = FunctionEntry::new("answer", Arc::new(answer), AccFlags::PUBLIC);
        assert!(!entry.is_sentinel());
        assert!(InternalFunction::from_entry(&FunctionEntry::sentinel(), "Foo").is_none());
    }

    #[test]
    fn test_required_args() {
        let mut optional = ArgInfo::new("b");
        optional.optional = true;
        let entry = FunctionEntry::new("answer", Arc::new(answer), AccFlags::PUBLIC)
            .with_args(vec![ArgInfo::new("a"), optional]);
        let function = InternalFunction::from_entry(&entry, "Foo").unwrap();
        assert_eq!(function.required_num_args, 1);

        let mut frame = ExecuteData::new("answer", vec![]);
        let err = function.call(&mut frame).unwrap_err();
        assert_eq!(err.as_exception().map(|e| e.class.as_str()), Some("ArgumentCountError"));

        let mut frame = ExecuteData::new("answer", vec![Value::Long(1)]);
        assert_eq!(function.call(&mut frame).unwrap(), Value::Long(42));
    }

    #[test]
    fn test_abstract_call_is_fatal() {
        let entry = FunctionEntry::abstract_method("shape", AccFlags::PUBLIC);
        let function = InternalFunction::from_entry(&entry, "Figure").unwrap();
        assert!(function.is_abstract());
        let err = function.call(&mut ExecuteData::new("shape", vec![])).unwrap_err();
        assert_eq!(err, HostError::fatal("Cannot call abstract method Figure::shape()"));
    }
}
