//! Reflection metadata for library members

use crate::value::NativeValue;
use std::fmt;

/// Declared parameter type of a library member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// `int`
    Int,
    /// `boolean`
    Bool,
    /// `String`, nullable
    Str,
    /// `String[]`, nullable
    StrArray,
    /// `byte[]`, nullable
    Bytes,
    /// Library object of the named type, nullable
    Object(String),
    /// Any value
    Any,
}

impl ParamType {
    /// Object parameter of the named library type
    pub fn object(type_name: &str) -> Self {
        ParamType::Object(type_name.to_string())
    }

    /// Whether an argument of this runtime shape may be passed
    pub fn accepts(&self, value: &NativeValue) -> bool {
        match (self, value) {
            (ParamType::Any, _) => true,
            (ParamType::Int, NativeValue::Int(_)) => true,
            (ParamType::Bool, NativeValue::Bool(_)) => true,
            (ParamType::Int | ParamType::Bool, _) => false,
            (_, NativeValue::Null) => true,
            (ParamType::Str, NativeValue::Str(_)) => true,
            (ParamType::StrArray, NativeValue::StrArray(_)) => true,
            (ParamType::Bytes, NativeValue::Bytes(_)) => true,
            (ParamType::Object(name), NativeValue::Object(obj)) => obj.is_instance_of(name),
            _ => false,
        }
    }

    /// Whether every value accepted by `self` is accepted by `other`
    pub fn is_narrower_or_equal(&self, other: &ParamType) -> bool {
        self == other || *other == ParamType::Any
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Int => f.write_str("int"),
            ParamType::Bool => f.write_str("boolean"),
            ParamType::Str => f.write_str("String"),
            ParamType::StrArray => f.write_str("String[]"),
            ParamType::Bytes => f.write_str("byte[]"),
            ParamType::Object(name) => f.write_str(name),
            ParamType::Any => f.write_str("Object"),
        }
    }
}

/// A member's name and parameter list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NativeMethod {
    /// Member name
    pub name: String,
    /// Declared parameter types
    pub params: Vec<ParamType>,
}

impl NativeMethod {
    /// Describe a member
    pub fn new(name: &str, params: Vec<ParamType>) -> Self {
        Self {
            name: name.to_string(),
            params,
        }
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether the member has this name and exactly these parameter types
    pub fn matches(&self, name: &str, params: &[ParamType]) -> bool {
        self.name == name && self.params == params
    }

    /// Whether the member can take these arguments
    pub fn accepts(&self, args: &[NativeValue]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p.accepts(a))
    }

    /// Whether every parameter is narrower than or equal to the other's
    pub fn is_more_specific_than(&self, other: &NativeMethod) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.is_narrower_or_equal(b))
    }
}

impl fmt::Display for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_accepted_by_references_only() {
        assert!(ParamType::Str.accepts(&NativeValue::Null));
        assert!(ParamType::object("Label").accepts(&NativeValue::Null));
        assert!(!ParamType::Int.accepts(&NativeValue::Null));
        assert!(!ParamType::Bool.accepts(&NativeValue::Null));
    }

    #[test]
    fn test_specificity() {
        let narrow = NativeMethod::new("visitLdcInsn", vec![ParamType::Str]);
        let wide = NativeMethod::new("visitLdcInsn", vec![ParamType::Any]);
        assert!(narrow.is_more_specific_than(&wide));
        assert!(!wide.is_more_specific_than(&narrow));
    }

    #[test]
    fn test_display() {
        let method = NativeMethod::new("visitVarInsn", vec![ParamType::Int, ParamType::Int]);
        assert_eq!(method.to_string(), "visitVarInsn(int, int)");
    }
}
