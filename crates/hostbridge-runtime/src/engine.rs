//! Engine
//!
//! The class table plus the dynamic operations user code performs on objects.
//! Each operation dispatches through the object's [`ObjectHandlers`] and
//! applies the host's fallback when a slot is empty.
//!
//! [`ObjectHandlers`]: crate::handlers::ObjectHandlers

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{ClassDecl, ClassEntry, ClassFlags, ClassRef};
use crate::error::{ErrorLevel, HostError, HostResult};
use crate::executor;
use crate::function::{Callee, ExecuteData};
use crate::handlers::{
    bound_frame, std_compare_objects, std_create_object, std_get_static_method, AccessType,
    CastType, HasCheck,
};
use crate::object::ObjectRef;
use crate::value::Value;

/// Host engine
#[derive(Default)]
pub struct Engine {
    classes: RwLock<FxHashMap<String, ClassRef>>,
}

fn class_key(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

fn undefined_method(class: &str, name: &str) -> HostError {
    HostError::exception("Error", format!("Call to undefined method {}::{}()", class, name))
}

fn not_array(object: &ObjectRef) -> HostError {
    HostError::exception(
        "Error",
        format!("Cannot use object of type {} as array", object.class().name()),
    )
}

impl Engine {
    /// Create an engine with an empty class table
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Class table
    // ========================================================================

    /// Register a class record, optionally extending `parent`
    pub fn register_internal_class(
        &self,
        decl: ClassDecl,
        parent: Option<&ClassRef>,
    ) -> HostResult<ClassRef> {
        let key = class_key(&decl.name);
        if key.is_empty() {
            return Err(HostError::fatal("Cannot declare a class without a name"));
        }
        let mut classes = self.classes.write();
        if classes.contains_key(&key) {
            return Err(HostError::fatal(format!(
                "Cannot redeclare class {}",
                decl.name.trim_start_matches('\\')
            )));
        }
        let mut decl = decl;
        decl.name = decl.name.trim_start_matches('\\').to_string();
        let class = Arc::new(ClassEntry::from_decl(decl, parent.cloned())?);
        classes.insert(key, class.clone());
        Ok(class)
    }

    /// Declare a class from user code: no functions, no hooks of its own
    pub fn declare_user_class(&self, name: &str, parent: Option<&ClassRef>) -> HostResult<ClassRef> {
        self.register_internal_class(ClassDecl::new(name).with_flags(ClassFlags::USER), parent)
    }

    /// Record that `class` implements `interfaces`
    pub fn class_implements(&self, class: &ClassRef, interfaces: &[ClassRef]) -> HostResult<()> {
        for interface in interfaces {
            if !interface.is_interface() {
                return Err(HostError::fatal(format!(
                    "{} cannot implement {} - it is not an interface",
                    class.name(),
                    interface.name()
                )));
            }
            class.add_interface(interface.clone());
        }
        Ok(())
    }

    /// Find a class by name (case-insensitive, leading `\` ignored)
    pub fn lookup_class(&self, name: &str) -> Option<ClassRef> {
        self.classes.read().get(&class_key(name)).cloned()
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Allocate an object of `class` without running a constructor
    pub fn new_object(&self, class: &ClassRef) -> HostResult<ObjectRef> {
        if class.is_interface() {
            return Err(HostError::exception(
                "Error",
                format!("Cannot instantiate interface {}", class.name()),
            ));
        }
        if class.is_abstract() {
            return Err(HostError::exception(
                "Error",
                format!("Cannot instantiate abstract class {}", class.name()),
            ));
        }
        match class.create_object_hook() {
            Some(create) => create(class),
            None => std_create_object(class),
        }
    }

    /// Allocate an object and run its `__construct`, if any
    pub fn new_instance(&self, class: &ClassRef, args: Vec<Value>) -> HostResult<ObjectRef> {
        let object = self.new_object(class)?;
        if let Some(constructor) = class.find_function("__construct") {
            let mut frame = bound_frame(&object, "__construct", args);
            constructor.call(&mut frame)?;
        }
        Ok(object)
    }

    /// `$o->name`
    pub fn read_property(&self, object: &ObjectRef, name: &str) -> HostResult<Value> {
        self.fetch_property(object, name, AccessType::Read)
    }

    /// Fetch a property for the given access
    pub fn fetch_property(&self, object: &ObjectRef, name: &str, access: AccessType) -> HostResult<Value> {
        (object.handlers().read_property)(object, name, access)
    }

    /// `$o->name = value`
    pub fn write_property(&self, object: &ObjectRef, name: &str, value: Value) -> HostResult<()> {
        (object.handlers().write_property)(object, name, value)
    }

    /// `isset($o->name)`
    pub fn isset_property(&self, object: &ObjectRef, name: &str) -> HostResult<bool> {
        (object.handlers().has_property)(object, name, HasCheck::Isset)
    }

    /// `empty($o->name)`
    pub fn empty_property(&self, object: &ObjectRef, name: &str) -> HostResult<bool> {
        Ok(!(object.handlers().has_property)(object, name, HasCheck::NotEmpty)?)
    }

    /// `property_exists($o, name)`
    pub fn property_exists(&self, object: &ObjectRef, name: &str) -> HostResult<bool> {
        (object.handlers().has_property)(object, name, HasCheck::Exists)
    }

    /// `unset($o->name)`
    pub fn unset_property(&self, object: &ObjectRef, name: &str) -> HostResult<()> {
        (object.handlers().unset_property)(object, name)
    }

    /// `$o[offset]`
    pub fn read_dimension(&self, object: &ObjectRef, offset: &Value) -> HostResult<Value> {
        match object.handlers().read_dimension {
            Some(read) => read(object, offset, AccessType::Read),
            None => Err(not_array(object)),
        }
    }

    /// `$o[offset] = value`, or `$o[] = value` when `offset` is `None`
    pub fn write_dimension(&self, object: &ObjectRef, offset: Option<&Value>, value: Value) -> HostResult<()> {
        match object.handlers().write_dimension {
            Some(write) => write(object, offset, value),
            None => Err(not_array(object)),
        }
    }

    /// `isset($o[offset])`
    pub fn isset_dimension(&self, object: &ObjectRef, offset: &Value) -> HostResult<bool> {
        match object.handlers().has_dimension {
            Some(has) => has(object, offset, false),
            None => Err(not_array(object)),
        }
    }

    /// `empty($o[offset])`
    pub fn empty_dimension(&self, object: &ObjectRef, offset: &Value) -> HostResult<bool> {
        match object.handlers().has_dimension {
            Some(has) => Ok(!has(object, offset, true)?),
            None => Err(not_array(object)),
        }
    }

    /// `unset($o[offset])`
    pub fn unset_dimension(&self, object: &ObjectRef, offset: &Value) -> HostResult<()> {
        match object.handlers().unset_dimension {
            Some(unset) => unset(object, offset),
            None => Err(not_array(object)),
        }
    }

    /// `count($value)`
    ///
    /// Values that cannot be counted produce a warning and count as 1
    /// (null counts as 0).
    pub fn count(&self, value: &Value) -> HostResult<i64> {
        let counted = match value.deref() {
            Value::Array(array) => return Ok(array.len() as i64),
            Value::Object(object) => match object.handlers().count_elements {
                Some(count) => count(&object)?,
                None => None,
            },
            _ => None,
        };
        match counted {
            Some(count) => Ok(count),
            None => {
                executor::report(
                    ErrorLevel::Warning,
                    "count(): Parameter must be an array or an object that implements Countable",
                );
                Ok(if value.is_null() { 0 } else { 1 })
            }
        }
    }

    /// `(int)`, `(float)`, `(bool)` or `(string)` applied to an object
    pub fn cast(&self, object: &ObjectRef, target: CastType) -> HostResult<Value> {
        let converted = match object.handlers().cast_object {
            Some(cast) => cast(object, target)?,
            None => None,
        };
        if let Some(value) = converted {
            return Ok(value);
        }
        let message = format!(
            "Object of class {} could not be converted to {}",
            object.class().name(),
            target.name()
        );
        match target {
            CastType::Bool => Ok(Value::Bool(true)),
            CastType::Long => {
                executor::report(ErrorLevel::Warning, message);
                Ok(Value::Long(1))
            }
            CastType::Double => {
                executor::report(ErrorLevel::Warning, message);
                Ok(Value::Double(1.0))
            }
            CastType::String => Err(HostError::exception("Error", message)),
        }
    }

    /// `clone $o`
    pub fn clone_object(&self, object: &ObjectRef) -> HostResult<ObjectRef> {
        match object.handlers().clone_obj {
            Some(clone) => clone(object),
            None => Err(HostError::exception(
                "Error",
                format!("Trying to clone an uncloneable object of class {}", object.class().name()),
            )),
        }
    }

    /// `$a <=> $b` on two objects
    pub fn compare_objects(&self, left: &ObjectRef, right: &ObjectRef) -> HostResult<i32> {
        match left.handlers().compare_objects {
            Some(compare) => compare(left, right),
            None => std_compare_objects(left, right),
        }
    }

    /// `$o->name(...args)`
    pub fn call_method(&self, object: &ObjectRef, name: &str, args: Vec<Value>) -> HostResult<Value> {
        let Some(callee) = (object.handlers().get_method)(object, name)? else {
            return Err(undefined_method(object.class().name(), name));
        };
        let mut frame = bound_frame(object, name, args);
        callee.call(&mut frame)
    }

    /// `Class::name(...args)`
    pub fn call_static(&self, class: &ClassRef, name: &str, args: Vec<Value>) -> HostResult<Value> {
        let callee = match std_get_static_method(class, name)? {
            Some(callee) => Some(callee),
            None => match class.get_static_method_hook() {
                Some(hook) => hook(class, name)?,
                None => None,
            },
        };
        let Some(callee) = callee else {
            return Err(undefined_method(class.name(), name));
        };
        let mut frame = ExecuteData {
            function_name: name.to_string(),
            this: None,
            called_scope: Some(class.name().to_string()),
            args,
        };
        callee.call(&mut frame)
    }

    /// `$o(...args)`
    pub fn invoke(&self, object: &ObjectRef, args: Vec<Value>) -> HostResult<Value> {
        let callee: Option<Callee> = match object.handlers().get_closure {
            Some(get_closure) => get_closure(object)?,
            None => None,
        };
        let Some(callee) = callee else {
            return Err(HostError::exception(
                "Error",
                format!("Object of type {} is not callable", object.class().name()),
            ));
        };
        let mut frame = bound_frame(object, "__invoke", args);
        callee.call(&mut frame)
    }

    /// Take the error raised while releasing an object, if any
    pub fn take_exception(&self) -> Option<HostError> {
        executor::take_pending()
    }
}
