//! Argument view handed to native methods and magic hooks

use std::fmt;

use hostbridge_runtime::{ExecuteData, ObjectRef, Value};

use super::binder;
use crate::convert::FromValue;
use crate::error::{NativeError, NativeResult};

/// Arguments of a native call, plus the bound object if any
pub struct Parameters {
    this: Option<ObjectRef>,
    args: Vec<Value>,
}

impl Parameters {
    /// Create from parts
    pub fn new(this: Option<ObjectRef>, args: Vec<Value>) -> Self {
        Self { this, args }
    }

    /// Take the arguments out of a call frame
    pub fn from_frame(frame: &mut ExecuteData) -> Self {
        Self {
            this: frame.this.clone(),
            args: std::mem::take(&mut frame.args),
        }
    }

    /// Bound object; `None` for static calls
    pub fn object(&self) -> Option<&ObjectRef> {
        self.this.as_ref()
    }

    /// Number of arguments passed
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check for an empty argument list
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Raw argument
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// All arguments
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.args.iter()
    }

    /// Converted argument; fails when it is missing or has the wrong type
    pub fn arg<T: FromValue>(&self, index: usize) -> NativeResult<T> {
        match self.args.get(index) {
            Some(value) => T::from_value(value),
            None => Err(NativeError::ArgumentError(format!(
                "Missing argument #{} ({} passed)",
                index + 1,
                self.args.len()
            ))),
        }
    }

    /// Converted argument, or `default` when it was not passed
    pub fn arg_or<T: FromValue>(&self, index: usize, default: T) -> NativeResult<T> {
        match self.args.get(index) {
            Some(value) => T::from_value(value),
            None => Ok(default),
        }
    }

    /// Run `f` on the native instance of the bound object
    pub fn with_native<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> NativeResult<R>) -> NativeResult<R> {
        let object = self
            .this
            .as_ref()
            .ok_or_else(|| NativeError::runtime("Native method called without an object"))?;
        binder::with_native(object, |native| match native.downcast_mut::<T>() {
            Some(native) => f(native),
            None => Err(NativeError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                got: object.class().name().to_string(),
            }),
        })?
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("this", &self.this)
            .field("args", &self.args)
            .finish()
    }
}
