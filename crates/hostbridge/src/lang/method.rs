//! Native methods and their host function entries

use std::fmt;
use std::sync::Arc;

use hostbridge_runtime::{ExecuteData, FunctionEntry, HostError, InternalHandler, Value};

use super::{Arguments, Modifier, METHOD_MODIFIERS};
use crate::error::NativeResult;
use crate::vm::Parameters;

/// Native body of a method
pub type MethodCallback = Arc<dyn Fn(&Parameters) -> NativeResult<Value> + Send + Sync>;

/// Callable method record
#[derive(Clone)]
pub struct Method {
    name: String,
    flags: Modifier,
    arguments: Arguments,
    callback: Option<MethodCallback>,
}

impl Method {
    /// Concrete method; flags outside the method mask are dropped
    pub fn new(
        name: impl Into<String>,
        callback: MethodCallback,
        flags: Modifier,
        arguments: Arguments,
    ) -> Self {
        Self {
            name: name.into(),
            flags: (flags & METHOD_MODIFIERS) - Modifier::ABSTRACT,
            arguments,
            callback: Some(callback),
        }
    }

    /// Method without a body
    pub fn abstract_method(name: impl Into<String>, flags: Modifier, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            flags: (flags & METHOD_MODIFIERS) | Modifier::ABSTRACT,
            arguments,
            callback: None,
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access flags
    pub fn flags(&self) -> Modifier {
        self.flags
    }

    /// Declared parameters
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Check for a missing body
    pub fn is_abstract(&self) -> bool {
        self.callback.is_none()
    }

    /// Produce the host function table entry
    pub fn initialize(&self) -> FunctionEntry {
        let arg_info = self.arguments.to_arg_info();
        let flags = if self.flags.visibility().is_empty() {
            self.flags | Modifier::PUBLIC
        } else {
            self.flags
        };
        match &self.callback {
            Some(callback) => {
                let callback = callback.clone();
                let handler: InternalHandler = Arc::new(move |frame: &mut ExecuteData| {
                    let params = Parameters::from_frame(frame);
                    callback(&params).map_err(HostError::from)
                });
                FunctionEntry::new(self.name.clone(), handler, flags).with_args(arg_info)
            }
            None => FunctionEntry::abstract_method(self.name.clone(), flags).with_args(arg_info),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("arguments", &self.arguments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Argument;

    #[test]
    fn test_entry_from_concrete_method() {
        let method = Method::new(
            "twice",
            Arc::new(|params: &Parameters| Ok(Value::Long(params.arg::<i64>(0)? * 2))),
            Modifier::STATIC,
            Arguments::new().with(Argument::required("n")),
        );
        let entry = method.initialize();
        assert_eq!(entry.name.as_deref(), Some("twice"));
        assert!(entry.flags.contains(Modifier::PUBLIC | Modifier::STATIC));
        assert_eq!(entry.arg_info.len(), 1);

        let handler = entry.handler.unwrap();
        let mut frame = ExecuteData::new("twice", vec![Value::Long(21)]);
        assert_eq!(handler(&mut frame).unwrap(), Value::Long(42));
    }

    #[test]
    fn test_entry_from_abstract_method() {
        let method = Method::abstract_method("area", Modifier::PROTECTED, Arguments::new());
        assert!(method.is_abstract());
        let entry = method.initialize();
        assert!(entry.handler.is_none());
        assert!(entry.flags.contains(Modifier::ABSTRACT | Modifier::PROTECTED));
    }
}
