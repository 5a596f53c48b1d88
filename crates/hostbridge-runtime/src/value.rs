//! Host dynamic values
//!
//! `Value` is the host's tagged value (the equivalent of a zval). It follows
//! the host language's juggling rules: truthiness, emptiness, numeric
//! coercion and loose comparison are all defined here so that every callback
//! and default handler agrees on them.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::array::{ArrayKey, HostArray};
use crate::object::ObjectRef;

/// Shared, mutable storage for a by-reference value
pub type ValueCell = Rc<RefCell<Value>>;

/// Host dynamic value
#[derive(Clone, Default)]
pub enum Value {
    /// null
    #[default]
    Null,
    /// true / false
    Bool(bool),
    /// Integer
    Long(i64),
    /// Floating point
    Double(f64),
    /// String
    String(String),
    /// Ordered array
    Array(HostArray),
    /// Object handle
    Object(ObjectRef),
    /// Reference to shared storage
    Reference(ValueCell),
}

/// Type tags of host values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// null
    Null,
    /// bool
    Bool,
    /// int
    Long,
    /// float
    Double,
    /// string
    String,
    /// array
    Array,
    /// object
    Object,
}

impl ValueType {
    /// Name used in host error messages
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Long => "int",
            ValueType::Double => "float",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Wrap a value into fresh reference storage
    pub fn new_reference(value: Value) -> Self {
        Value::Reference(Rc::new(RefCell::new(value)))
    }

    /// Type tag (references report the referenced type)
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
            Value::Reference(cell) => cell.borrow().value_type(),
        }
    }

    /// Name of the value's type
    pub fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    /// Check for null (through references)
    pub fn is_null(&self) -> bool {
        self.value_type() == ValueType::Null
    }

    /// Check if this is a reference
    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Reference(_))
    }

    /// Check if this value's storage is shared with another holder
    pub fn is_shared(&self) -> bool {
        match self {
            Value::Reference(cell) => Rc::strong_count(cell) > 1,
            Value::Object(object) => object.refcount() > 1,
            _ => false,
        }
    }

    /// Strip any reference wrapper, copying the referenced value
    pub fn deref(&self) -> Value {
        match self {
            Value::Reference(cell) => cell.borrow().deref(),
            other => other.clone(),
        }
    }

    /// Strip any reference wrapper, consuming self
    pub fn into_deref(self) -> Value {
        match self {
            Value::Reference(cell) => cell.borrow().deref(),
            other => other,
        }
    }

    /// Get the object handle if this is an object
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::Object(object) => Some(object.clone()),
            Value::Reference(cell) => cell.borrow().as_object(),
            _ => None,
        }
    }

    /// Truthiness under the host's boolean cast rules
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Long(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Array(array) => !array.is_empty(),
            Value::Object(_) => true,
            Value::Reference(cell) => cell.borrow().to_bool(),
        }
    }

    /// Emptiness: null, false, 0, 0.0, "", "0" and empty arrays are empty
    pub fn is_empty(&self) -> bool {
        !self.to_bool()
    }

    /// Integer coercion
    pub fn to_long(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => *b as i64,
            Value::Long(i) => *i,
            Value::Double(d) => double_to_long(*d),
            Value::String(s) => parse_numeric_prefix(s).map(|n| n.as_long()).unwrap_or(0),
            Value::Array(array) => (!array.is_empty()) as i64,
            Value::Object(_) => 1,
            Value::Reference(cell) => cell.borrow().to_long(),
        }
    }

    /// Floating point coercion
    pub fn to_double(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => *b as i64 as f64,
            Value::Long(i) => *i as f64,
            Value::Double(d) => *d,
            Value::String(s) => parse_numeric_prefix(s).map(|n| n.as_double()).unwrap_or(0.0),
            Value::Array(array) => (!array.is_empty()) as i64 as f64,
            Value::Object(_) => 1.0,
            Value::Reference(cell) => cell.borrow().to_double(),
        }
    }

    /// String coercion for scalar values; arrays and objects return `None`
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(true) => Some("1".to_string()),
            Value::Bool(false) => Some(String::new()),
            Value::Long(i) => Some(i.to_string()),
            Value::Double(d) => Some(format_double(*d)),
            Value::String(s) => Some(s.clone()),
            Value::Array(_) | Value::Object(_) => None,
            Value::Reference(cell) => cell.borrow().coerce_string(),
        }
    }

    /// Loose comparison (`<=>`) returning -1, 0 or 1
    ///
    /// Objects are compared by identity here; class-aware comparison goes
    /// through the object's `compare_objects` handler in the engine.
    pub fn loose_compare(&self, other: &Value) -> i32 {
        let left = self.deref();
        let right = other.deref();
        match (&left, &right) {
            (Value::String(a), Value::String(b)) => {
                match (parse_numeric(a), parse_numeric(b)) {
                    (Some(x), Some(y)) => ordering(x.as_double(), y.as_double()),
                    _ => a.cmp(b) as i32,
                }
            }
            (Value::Null, Value::String(s)) => (!s.is_empty()) as i32 * -1,
            (Value::String(s), Value::Null) => (!s.is_empty()) as i32,
            (Value::Bool(_), _) | (_, Value::Bool(_)) | (Value::Null, _) | (_, Value::Null) => {
                left.to_bool() as i32 - right.to_bool() as i32
            }
            (Value::Array(a), Value::Array(b)) => a.len().cmp(&b.len()) as i32,
            (Value::Array(_), _) => 1,
            (_, Value::Array(_)) => -1,
            (Value::Object(a), Value::Object(b)) => {
                if a.ptr_eq(b) {
                    0
                } else {
                    1
                }
            }
            (Value::Object(_), _) => 1,
            (_, Value::Object(_)) => -1,
            (Value::Long(a), Value::Long(b)) => a.cmp(b) as i32,
            _ => ordering(left.to_double(), right.to_double()),
        }
    }

    /// Loose equality (`==`)
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.loose_compare(other) == 0
    }
}

fn ordering(a: f64, b: f64) -> i32 {
    if a < b {
        -1
    } else if a > b {
        1
    } else {
        0
    }
}

fn double_to_long(d: f64) -> i64 {
    if d.is_finite() {
        d as i64
    } else {
        0
    }
}

/// Format a double the way the host prints it
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NAN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

/// Numeric value parsed out of a string
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Long(i64),
    Double(f64),
}

impl Numeric {
    fn as_long(self) -> i64 {
        match self {
            Numeric::Long(i) => i,
            Numeric::Double(d) => double_to_long(d),
        }
    }

    fn as_double(self) -> f64 {
        match self {
            Numeric::Long(i) => i as f64,
            Numeric::Double(d) => d,
        }
    }
}

/// Parse a fully numeric string ("12", " 1.5", "1e3")
fn parse_numeric(s: &str) -> Option<Numeric> {
    let trimmed = s.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Numeric::Long(i));
    }
    trimmed.parse::<f64>().ok().filter(|d| d.is_finite()).map(Numeric::Double)
}

/// Parse the longest numeric prefix of a string ("12abc" -> 12)
fn parse_numeric_prefix(s: &str) -> Option<Numeric> {
    if let Some(n) = parse_numeric(s) {
        return Some(n);
    }
    let trimmed = s.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut is_double = false;
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > end + 1 {
            is_double = true;
            end = frac_end;
        }
    }
    let prefix = &trimmed[..end];
    if is_double {
        prefix.parse::<f64>().ok().map(Numeric::Double)
    } else {
        prefix.parse::<i64>().ok().map(Numeric::Long)
    }
}

impl PartialEq for Value {
    /// Strict equality: same type and same value; objects by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Reference(a), Value::Reference(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Reference(a), b) => *a.borrow() == *b,
            (a, Value::Reference(b)) => *a == *b.borrow(),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "bool({})", b),
            Value::Long(i) => write!(f, "int({})", i),
            Value::Double(d) => write!(f, "float({})", format_double(*d)),
            Value::String(s) => write!(f, "string({:?})", s),
            Value::Array(array) => write!(f, "array({})", array.len()),
            Value::Object(object) => write!(f, "{:?}", object),
            Value::Reference(cell) => write!(f, "&{:?}", cell.borrow()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Long(i as i64)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<HostArray> for Value {
    fn from(array: HostArray) -> Self {
        Value::Array(array)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Value::Object(object)
    }
}

impl From<&ArrayKey> for Value {
    fn from(key: &ArrayKey) -> Self {
        match key {
            ArrayKey::Int(i) => Value::Long(*i),
            ArrayKey::Str(s) => Value::String(s.clone()),
        }
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// Thread-safe scalar used for class-level constants and property defaults
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// null
    #[default]
    Null,
    /// bool
    Bool(bool),
    /// int
    Long(i64),
    /// float
    Double(f64),
    /// string
    String(String),
}

impl Scalar {
    /// Materialize as a host value
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Long(i) => Value::Long(*i),
            Scalar::Double(d) => Value::Double(*d),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }

    /// Convert a host value to a scalar; arrays and objects are stringified
    /// when possible, otherwise rejected
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value.deref() {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(b)),
            Value::Long(i) => Some(Scalar::Long(i)),
            Value::Double(d) => Some(Scalar::Double(d)),
            Value::String(s) => Some(Scalar::String(s)),
            _ => None,
        }
    }

    /// Type tag
    pub fn value_type(&self) -> ValueType {
        match self {
            Scalar::Null => ValueType::Null,
            Scalar::Bool(_) => ValueType::Bool,
            Scalar::Long(_) => ValueType::Long,
            Scalar::Double(_) => ValueType::Double,
            Scalar::String(_) => ValueType::String,
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Long(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Long(i as i64)
    }
}

impl From<i16> for Scalar {
    fn from(i: i16) -> Self {
        Scalar::Long(i as i64)
    }
}

impl From<f64> for Scalar {
    fn from(d: f64) -> Self {
        Scalar::Double(d)
    }
}

impl From<char> for Scalar {
    fn from(c: char) -> Self {
        Scalar::String(c.to_string())
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<()> for Scalar {
    fn from(_: ()) -> Self {
        Scalar::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.to_bool());
        assert!(!Value::Bool(false).to_bool());
        assert!(!Value::Long(0).to_bool());
        assert!(!Value::Double(0.0).to_bool());
        assert!(!Value::string("").to_bool());
        assert!(!Value::string("0").to_bool());
        assert!(!Value::Array(HostArray::new()).to_bool());

        assert!(Value::Long(-1).to_bool());
        assert!(Value::string("0.0").to_bool());
        assert!(Value::string("false").to_bool());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::string("42").to_long(), 42);
        assert_eq!(Value::string("  7 apples").to_long(), 7);
        assert_eq!(Value::string("3.9kg").to_long(), 3);
        assert_eq!(Value::string("abc").to_long(), 0);
        assert_eq!(Value::Double(2.75).to_long(), 2);
        assert_eq!(Value::string("1.5").to_double(), 1.5);
        assert_eq!(Value::Bool(true).to_double(), 1.0);
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(Value::Bool(true).coerce_string(), Some("1".to_string()));
        assert_eq!(Value::Bool(false).coerce_string(), Some(String::new()));
        assert_eq!(Value::Double(1.0).coerce_string(), Some("1".to_string()));
        assert_eq!(Value::Double(0.5).coerce_string(), Some("0.5".to_string()));
        assert_eq!(Value::Array(HostArray::new()).coerce_string(), None);
    }

    #[test]
    fn test_loose_compare() {
        assert_eq!(Value::Long(1).loose_compare(&Value::Long(2)), -1);
        assert_eq!(Value::string("10").loose_compare(&Value::string("9")), 1);
        assert_eq!(Value::string("abc").loose_compare(&Value::string("abd")), -1);
        assert!(Value::Long(1).loose_eq(&Value::Double(1.0)));
        assert!(Value::Null.loose_eq(&Value::Bool(false)));
        assert!(Value::Null.loose_eq(&Value::string("")));
    }

    #[test]
    fn test_reference_sharing() {
        let reference = Value::new_reference(Value::Long(5));
        assert!(!reference.is_shared());

        let alias = reference.clone();
        assert!(reference.is_shared());
        if let Value::Reference(cell) = &alias {
            *cell.borrow_mut() = Value::Long(6);
        }
        assert_eq!(reference.deref(), Value::Long(6));
        assert_eq!(reference.value_type(), ValueType::Long);
    }

    #[test]
    fn test_scalar_round_trip() {
        let scalar = Scalar::from("hello");
        assert_eq!(scalar.to_value(), Value::string("hello"));
        assert_eq!(Scalar::from_value(&Value::Long(3)), Some(Scalar::Long(3)));
        assert_eq!(Scalar::from_value(&Value::Array(HostArray::new())), None);
    }
}
