//! Runtime values
//!
//! Boxing is the identity: a boxed `Integer` and an `int` are both
//! `Value::Int`. Lists are shared and mutable; arrays are represented as
//! lists.

use super::class::ClassRef;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Shared list storage
pub type ListRef = Arc<RwLock<Vec<Value>>>;

/// Shared object reference
pub type ObjectRef = Arc<Object>;

/// A runtime value
#[derive(Clone)]
pub enum Value {
    /// `null`
    Null,
    /// `boolean`
    Bool(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `char`
    Char(u16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Immutable string
    Str(Arc<str>),
    /// List or array
    List(ListRef),
    /// Instance of a class
    Object(ObjectRef),
}

impl Value {
    /// A string value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// A fresh list
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as list
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view used by branch instructions (`boolean` counts as 0/1)
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(*v as i32),
            Value::Byte(v) => Some(*v as i32),
            Value::Short(v) => Some(*v as i32),
            Value::Char(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// Kind name for diagnostics
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Byte(_) => "byte".to_string(),
            Value::Short(_) => "short".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "String".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Object(obj) => obj.class().name().to_string(),
        }
    }

    /// Snapshot of a list's elements
    pub fn list_items(&self) -> Option<Vec<Value>> {
        self.as_list().map(|list| list.read().clone())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}b", v),
            Value::Short(v) => write!(f, "{}s", v),
            Value::Char(v) => write!(f, "'\\u{{{:04x}}}'", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{}f", v),
            Value::Double(v) => write!(f, "{}d", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::List(list) => match list.try_read() {
                Some(items) => f.debug_list().entries(items.iter()).finish(),
                None => f.write_str("[<locked>]"),
            },
            Value::Object(obj) => write!(f, "{}@{:p}", obj.class().name(), Arc::as_ptr(obj)),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

/// An instance of a class with named fields
pub struct Object {
    class: ClassRef,
    fields: RwLock<FxHashMap<String, Value>>,
}

impl Object {
    /// Create an instance with every declared field at its default value
    pub fn new(class: ClassRef, fields: FxHashMap<String, Value>) -> Self {
        Self {
            class,
            fields: RwLock::new(fields),
        }
    }

    /// Runtime class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Read a field; `None` when the object has no such field
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.read().get(name).cloned()
    }

    /// Write a field; returns `false` when the object has no such field
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        match self.fields.write().get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_equality() {
        let a = Value::list(vec![Value::Int(1), Value::str("x")]);
        let b = Value::list(vec![Value::Int(1), Value::str("x")]);
        assert_eq!(a, b);
        assert_ne!(a, Value::list(vec![]));
    }

    #[test]
    fn test_lists_are_shared() {
        let a = Value::list(vec![]);
        let b = a.clone();
        a.as_list().unwrap().write().push(Value::Int(7));
        assert_eq!(b.list_items().unwrap(), vec![Value::Int(7)]);
    }

    #[test]
    fn test_int_view() {
        assert_eq!(Value::Bool(true).as_int(), Some(1));
        assert_eq!(Value::Char(65).as_int(), Some(65));
        assert_eq!(Value::Long(1).as_int(), None);
        assert_eq!(Value::Null.as_int(), None);
    }

    #[test]
    fn test_debug_format() {
        let v = Value::list(vec![Value::Int(5), Value::str("a"), Value::Null]);
        assert_eq!(format!("{:?}", v), "[5, \"a\", null]");
    }
}
