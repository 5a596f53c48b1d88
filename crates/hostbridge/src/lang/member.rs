//! Class constants and property defaults

use hostbridge_runtime::{ClassEntry, HostResult, Scalar};

use super::{Modifier, PROPERTY_MODIFIERS};

/// Fixed-value class member: a class constant or a property default
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    name: String,
    value: Scalar,
    flags: Modifier,
}

impl Member {
    /// Property with a default value; flags outside the property mask are dropped
    pub fn property(name: impl Into<String>, value: impl Into<Scalar>, flags: Modifier) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            flags: flags & PROPERTY_MODIFIERS,
        }
    }

    /// Class constant
    pub fn constant(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::property(name, value, Modifier::CONST)
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed value
    pub fn value(&self) -> &Scalar {
        &self.value
    }

    /// Access flags
    pub fn flags(&self) -> Modifier {
        self.flags
    }

    /// Check if the member is a class constant
    pub fn is_constant(&self) -> bool {
        self.flags.contains(Modifier::CONST)
    }

    /// Declare the member on a finished class record
    pub fn initialize(&self, class: &ClassEntry) -> HostResult<()> {
        if self.is_constant() {
            class.declare_constant(self.name.clone(), self.value.clone())
        } else {
            let flags = if self.flags.visibility().is_empty() {
                self.flags | Modifier::PUBLIC
            } else {
                self.flags
            };
            class.declare_property(self.name.clone(), self.value.clone(), flags)
        }
    }
}

/// Named constant value
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    name: String,
    value: Scalar,
}

impl Constant {
    /// Create a constant
    pub fn new(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Constant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constant value
    pub fn value(&self) -> &Scalar {
        &self.value
    }
}

impl From<Constant> for Member {
    fn from(constant: Constant) -> Self {
        Member::constant(constant.name, constant.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_runtime::{ClassDecl, Engine};

    #[test]
    fn test_property_flags_are_masked() {
        let member = Member::property("size", 3i64, Modifier::PUBLIC | Modifier::ABSTRACT);
        assert_eq!(member.flags(), Modifier::PUBLIC);
        assert!(!member.is_constant());
    }

    #[test]
    fn test_initialize_declares_on_record() {
        let engine = Engine::new();
        let class = engine
            .register_internal_class(ClassDecl::new("Config"), None)
            .unwrap();

        Member::from(Constant::new("VERSION", "1.2")).initialize(&class).unwrap();
        Member::property("debug", false, Modifier::empty())
            .initialize(&class)
            .unwrap();

        assert_eq!(class.constant("VERSION"), Some(Scalar::from("1.2")));
        let info = class.property_info("debug").unwrap();
        assert_eq!(info.default, Scalar::Bool(false));
        assert!(info.flags.contains(Modifier::PUBLIC));
    }
}
