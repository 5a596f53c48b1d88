//! Ordered host arrays

use crate::value::Value;

/// Key of a host array slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    /// Integer key
    Int(i64),
    /// String key
    Str(String),
}

impl ArrayKey {
    /// Normalize a value into an array key the way the host does:
    /// integral strings become integer keys, floats truncate, bools and null
    /// map to 1/0 and "".
    pub fn from_value(value: &Value) -> Option<ArrayKey> {
        match value.deref() {
            Value::Null => Some(ArrayKey::Str(String::new())),
            Value::Bool(b) => Some(ArrayKey::Int(b as i64)),
            Value::Long(i) => Some(ArrayKey::Int(i)),
            Value::Double(d) => Some(ArrayKey::Int(d as i64)),
            Value::String(s) => Some(match s.parse::<i64>() {
                Ok(i) if i.to_string() == s => ArrayKey::Int(i),
                _ => ArrayKey::Str(s),
            }),
            _ => None,
        }
    }
}

impl From<i64> for ArrayKey {
    fn from(i: i64) -> Self {
        ArrayKey::Int(i)
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        ArrayKey::Str(s.to_string())
    }
}

/// Insertion-ordered array with integer and string keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostArray {
    entries: Vec<(ArrayKey, Value)>,
    next_index: i64,
}

impl HostArray {
    /// Create an empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a slot
    pub fn get(&self, key: &ArrayKey) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Check whether a key exists
    pub fn contains_key(&self, key: &ArrayKey) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite a slot, returning the previous value
    pub fn insert(&mut self, key: ArrayKey, value: Value) -> Option<Value> {
        if let ArrayKey::Int(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append with the next integer key
    pub fn push(&mut self, value: Value) {
        let key = ArrayKey::Int(self.next_index);
        self.entries.push((key, value));
        self.next_index = self.next_index.saturating_add(1);
    }

    /// Remove a slot, returning its value
    pub fn remove(&mut self, key: &ArrayKey) -> Option<Value> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(position).1)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &(ArrayKey, Value)> {
        self.entries.iter()
    }
}

impl FromIterator<Value> for HostArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut array = HostArray::new();
        for value in iter {
            array.push(value);
        }
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(ArrayKey::from_value(&Value::string("12")), Some(ArrayKey::Int(12)));
        assert_eq!(
            ArrayKey::from_value(&Value::string("012")),
            Some(ArrayKey::Str("012".to_string()))
        );
        assert_eq!(ArrayKey::from_value(&Value::Bool(true)), Some(ArrayKey::Int(1)));
        assert_eq!(ArrayKey::from_value(&Value::Double(3.7)), Some(ArrayKey::Int(3)));
        assert_eq!(ArrayKey::from_value(&Value::Array(HostArray::new())), None);
    }

    #[test]
    fn test_push_and_overwrite() {
        let mut array = HostArray::new();
        array.push(Value::Long(1));
        array.insert(ArrayKey::Int(5), Value::Long(2));
        array.push(Value::Long(3));
        array.insert(ArrayKey::Int(0), Value::Long(9));

        assert_eq!(array.len(), 3);
        assert_eq!(array.get(&ArrayKey::Int(6)), Some(&Value::Long(3)));
        assert_eq!(array.get(&ArrayKey::Int(0)), Some(&Value::Long(9)));
        assert_eq!(array.remove(&ArrayKey::Int(5)), Some(Value::Long(2)));
        assert!(!array.contains_key(&ArrayKey::Int(5)));
    }
}
