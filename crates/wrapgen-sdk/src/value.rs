//! Values crossing the late-binding boundary

use crate::object::NativeObjectRef;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A value passed to or returned from a library member
#[derive(Clone, Debug)]
pub enum NativeValue {
    /// Absent reference
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// String
    Str(String),
    /// String array
    StrArray(Vec<String>),
    /// Byte array
    Bytes(Vec<u8>),
    /// Library object
    Object(NativeObjectRef),
    /// Lazily drained sequence
    Iter(NativeIter),
}

impl NativeValue {
    /// Kind name used in diagnostics
    pub fn kind_name(&self) -> String {
        match self {
            NativeValue::Null => "null".to_string(),
            NativeValue::Bool(_) => "boolean".to_string(),
            NativeValue::Int(_) => "int".to_string(),
            NativeValue::Str(_) => "String".to_string(),
            NativeValue::StrArray(_) => "String[]".to_string(),
            NativeValue::Bytes(_) => "byte[]".to_string(),
            NativeValue::Object(obj) => obj.type_name().to_string(),
            NativeValue::Iter(_) => "Iterator".to_string(),
        }
    }

    /// Whether this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i32> {
        match self {
            NativeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NativeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Get as object
    pub fn as_object(&self) -> Option<&NativeObjectRef> {
        match self {
            NativeValue::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<i32> for NativeValue {
    fn from(v: i32) -> Self {
        NativeValue::Int(v)
    }
}

impl From<bool> for NativeValue {
    fn from(v: bool) -> Self {
        NativeValue::Bool(v)
    }
}

impl From<&str> for NativeValue {
    fn from(v: &str) -> Self {
        NativeValue::Str(v.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(v: String) -> Self {
        NativeValue::Str(v)
    }
}

impl From<Option<&str>> for NativeValue {
    fn from(v: Option<&str>) -> Self {
        v.map(NativeValue::from).unwrap_or(NativeValue::Null)
    }
}

impl From<Vec<String>> for NativeValue {
    fn from(v: Vec<String>) -> Self {
        NativeValue::StrArray(v)
    }
}

impl From<NativeObjectRef> for NativeValue {
    fn from(v: NativeObjectRef) -> Self {
        NativeValue::Object(v)
    }
}

/// Shared handle to a lazily drained sequence of values
///
/// Clones share the cursor: an element taken through one handle is not seen
/// by the others.
#[derive(Clone)]
pub struct NativeIter(Arc<Mutex<Box<dyn Iterator<Item = NativeValue> + Send>>>);

impl NativeIter {
    /// Wrap an iterator
    pub fn new(iter: impl Iterator<Item = NativeValue> + Send + 'static) -> Self {
        NativeIter(Arc::new(Mutex::new(Box::new(iter))))
    }
}

impl Iterator for NativeIter {
    type Item = NativeValue;

    fn next(&mut self) -> Option<NativeValue> {
        self.0.lock().next()
    }
}

impl fmt::Debug for NativeIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeIter(..)")
    }
}
