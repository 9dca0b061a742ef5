//! Type descriptor encoding
//!
//! Maps a [`JType`] to its class-file descriptor. Generic information is
//! kept (`Ljava/util/List<Ljava/lang/String;>;`), which makes the output
//! usable as a `Signature` attribute; [`method_descriptor`] erases first and
//! yields the plain descriptor the constant pool needs.

use crate::types::{internal_name, JType};
use thiserror::Error;

/// Descriptor encoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// A type variable must have exactly one bound to be encodable
    #[error("Type variable {name} has {bounds} bounds; exactly one is required")]
    AmbiguousTypeVariable {
        /// Variable name
        name: String,
        /// Number of bounds found
        bounds: usize,
    },

    /// `void` outside a return position
    #[error("void is only valid as a return type")]
    MisplacedVoid,
}

/// Encode a type
pub fn encode(ty: &JType) -> Result<String, DescriptorError> {
    let mut out = String::new();
    encode_into(ty, &mut out)?;
    Ok(out)
}

fn encode_into(ty: &JType, out: &mut String) -> Result<(), DescriptorError> {
    match ty {
        JType::Void => out.push('V'),
        JType::Primitive(p) => out.push(p.descriptor()),
        JType::Array(component) | JType::GenericArray(component) => {
            if **component == JType::Void {
                return Err(DescriptorError::MisplacedVoid);
            }
            out.push('[');
            encode_into(component, out)?;
        }
        JType::Class(name) => {
            out.push('L');
            out.push_str(&internal_name(name));
            out.push(';');
        }
        JType::Parameterized { raw, args } => {
            out.push('L');
            out.push_str(&internal_name(raw));
            if raw != "java.lang.Enum" && !args.is_empty() {
                out.push('<');
                for arg in args {
                    encode_into(arg, out)?;
                }
                out.push('>');
            }
            out.push(';');
        }
        JType::TypeVariable { name, bounds } => match bounds.as_slice() {
            [bound] => encode_into(bound, out)?,
            _ => {
                return Err(DescriptorError::AmbiguousTypeVariable {
                    name: name.clone(),
                    bounds: bounds.len(),
                })
            }
        },
        JType::Wildcard { upper, lower } => {
            if upper.is_empty() && lower.is_empty() {
                out.push('*');
            }
            for bound in upper {
                out.push('+');
                encode_into(bound, out)?;
            }
            for bound in lower {
                out.push('-');
                encode_into(bound, out)?;
            }
        }
    }
    Ok(())
}

/// Erased method descriptor `(<params>)<ret>`
pub fn method_descriptor(params: &[JType], ret: &JType) -> Result<String, DescriptorError> {
    let mut out = String::from("(");
    for param in params {
        let erased = param.erasure();
        if erased == JType::Void {
            return Err(DescriptorError::MisplacedVoid);
        }
        encode_into(&erased, &mut out)?;
    }
    out.push(')');
    encode_into(&ret.erasure(), &mut out)?;
    Ok(out)
}

/// Generic method signature, `None` when it would equal the erased descriptor
pub fn method_signature(params: &[JType], ret: &JType) -> Result<Option<String>, DescriptorError> {
    let mut out = String::from("(");
    for param in params {
        encode_into(param, &mut out)?;
    }
    out.push(')');
    encode_into(ret, &mut out)?;
    if out == method_descriptor(params, ret)? {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn test_primitives_and_void() {
        assert_eq!(encode(&JType::Void).unwrap(), "V");
        let all: String = Primitive::ALL
            .iter()
            .map(|p| encode(&JType::Primitive(*p)).unwrap())
            .collect();
        assert_eq!(all, "ZBCSIJFD");
    }

    #[test]
    fn test_arrays() {
        assert_eq!(encode(&JType::array_of(JType::int())).unwrap(), "[I");
        let generic = JType::GenericArray(Box::new(JType::TypeVariable {
            name: "T".into(),
            bounds: vec![JType::string()],
        }));
        assert_eq!(encode(&generic).unwrap(), "[Ljava/lang/String;");
        assert_eq!(
            encode(&JType::array_of(JType::Void)),
            Err(DescriptorError::MisplacedVoid)
        );
    }

    #[test]
    fn test_parameterized() {
        assert_eq!(
            encode(&JType::list_of(JType::string())).unwrap(),
            "Ljava/util/List<Ljava/lang/String;>;"
        );
        let nested = JType::Parameterized {
            raw: "java.util.Map".into(),
            args: vec![JType::string(), JType::list_of(JType::class("pkg.Foo"))],
        };
        assert_eq!(
            encode(&nested).unwrap(),
            "Ljava/util/Map<Ljava/lang/String;Ljava/util/List<Lpkg/Foo;>;>;"
        );
    }

    #[test]
    fn test_enum_encodes_as_raw() {
        let ty = JType::Parameterized {
            raw: "java.lang.Enum".into(),
            args: vec![JType::TypeVariable {
                name: "E".into(),
                bounds: vec![],
            }],
        };
        assert_eq!(encode(&ty).unwrap(), "Ljava/lang/Enum;");
    }

    #[test]
    fn test_type_variable_bounds() {
        let single = JType::TypeVariable {
            name: "T".into(),
            bounds: vec![JType::class("java.lang.Number")],
        };
        assert_eq!(encode(&single).unwrap(), "Ljava/lang/Number;");

        let double = JType::TypeVariable {
            name: "T".into(),
            bounds: vec![JType::class("java.lang.Number"), JType::class("java.io.Serializable")],
        };
        assert_eq!(
            encode(&double),
            Err(DescriptorError::AmbiguousTypeVariable {
                name: "T".into(),
                bounds: 2
            })
        );
    }

    #[test]
    fn test_wildcards() {
        let extends = JType::Wildcard {
            upper: vec![JType::class("java.lang.Number")],
            lower: vec![],
        };
        assert_eq!(encode(&extends).unwrap(), "+Ljava/lang/Number;");
        let sup = JType::Wildcard {
            upper: vec![],
            lower: vec![JType::int()],
        };
        assert_eq!(encode(&sup).unwrap(), "-I");
        let unbounded = JType::Wildcard {
            upper: vec![],
            lower: vec![],
        };
        assert_eq!(
            encode(&JType::list_of(unbounded)).unwrap(),
            "Ljava/util/List<*>;"
        );
    }

    #[test]
    fn test_method_descriptor_erases() {
        let params = [JType::list_of(JType::string()), JType::int()];
        assert_eq!(
            method_descriptor(&params, &JType::object()).unwrap(),
            "(Ljava/util/List;I)Ljava/lang/Object;"
        );
        assert_eq!(
            method_signature(&params, &JType::object()).unwrap().as_deref(),
            Some("(Ljava/util/List<Ljava/lang/String;>;I)Ljava/lang/Object;")
        );
        assert_eq!(method_signature(&[JType::int()], &JType::Void).unwrap(), None);
    }
}
