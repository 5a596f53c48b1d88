//! Declared method parameters

use hostbridge_runtime::ArgInfo;

/// One declared method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    name: String,
    type_hint: Option<String>,
    by_reference: bool,
    allow_null: bool,
    required: bool,
}

impl Argument {
    /// Required by-value parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            by_reference: false,
            allow_null: false,
            required: true,
        }
    }

    /// Optional by-value parameter
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name)
        }
    }

    /// Declare the parameter's type
    pub fn typed(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    /// Accept null as well
    pub fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Pass by reference
    pub fn by_reference(mut self) -> Self {
        self.by_reference = true;
        self
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the parameter must be passed
    pub fn is_required(&self) -> bool {
        self.required
    }

    fn to_arg_info(&self) -> ArgInfo {
        ArgInfo {
            name: self.name.clone(),
            type_hint: self.type_hint.clone(),
            by_reference: self.by_reference,
            allow_null: self.allow_null,
            optional: !self.required,
        }
    }
}

/// Ordered parameter list of a method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(Vec<Argument>);

impl Arguments {
    /// No parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn with(mut self, argument: Argument) -> Self {
        self.0.push(argument);
        self
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters that must be passed
    pub fn required_count(&self) -> usize {
        self.0.iter().filter(|a| a.required).count()
    }

    /// Host parameter descriptions
    pub fn to_arg_info(&self) -> Vec<ArgInfo> {
        self.0.iter().map(Argument::to_arg_info).collect()
    }
}

impl From<Vec<Argument>> for Arguments {
    fn from(arguments: Vec<Argument>) -> Self {
        Arguments(arguments)
    }
}
