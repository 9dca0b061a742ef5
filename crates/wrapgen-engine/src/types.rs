//! Semantic types
//!
//! `JType` is the type model the synthesizer and the runtime share. Class
//! names are binary names with `.` separators (`java.util.List`); the
//! descriptor encoder converts them to internal form.

use std::fmt;
use wrapgen_classfile::FieldType;

/// Primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl Primitive {
    /// All primitive kinds
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    /// Descriptor character
    pub fn descriptor(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }

    /// Parse a descriptor character
    pub fn from_descriptor(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.descriptor() == c)
    }

    /// Source-level name (`int`)
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Binary name of the box class
    pub fn box_class(self) -> &'static str {
        match self {
            Primitive::Boolean => "java.lang.Boolean",
            Primitive::Byte => "java.lang.Byte",
            Primitive::Char => "java.lang.Character",
            Primitive::Short => "java.lang.Short",
            Primitive::Int => "java.lang.Integer",
            Primitive::Long => "java.lang.Long",
            Primitive::Float => "java.lang.Float",
            Primitive::Double => "java.lang.Double",
        }
    }

    /// Name of the unboxing accessor on the box class (`intValue`)
    pub fn unbox_method(self) -> String {
        format!("{}Value", self.name())
    }

    /// Whether values take two local-variable slots
    pub fn is_wide(self) -> bool {
        matches!(self, Primitive::Long | Primitive::Double)
    }
}

/// A semantic type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JType {
    /// `void`
    Void,
    /// A primitive
    Primitive(Primitive),
    /// A class or interface, by binary name
    Class(String),
    /// Array of the component type
    Array(Box<JType>),
    /// `Raw<Args...>`
    Parameterized {
        /// Binary name of the raw type
        raw: String,
        /// Type arguments
        args: Vec<JType>,
    },
    /// A type variable and its bounds
    TypeVariable {
        /// Variable name
        name: String,
        /// Upper bounds
        bounds: Vec<JType>,
    },
    /// `? extends U` / `? super L`
    Wildcard {
        /// Upper bounds
        upper: Vec<JType>,
        /// Lower bounds
        lower: Vec<JType>,
    },
    /// Array whose component is generic (`T[]`, `List<String>[]`)
    GenericArray(Box<JType>),
}

impl JType {
    /// `int`
    pub fn int() -> Self {
        JType::Primitive(Primitive::Int)
    }

    /// `boolean`
    pub fn boolean() -> Self {
        JType::Primitive(Primitive::Boolean)
    }

    /// A class type
    pub fn class(name: &str) -> Self {
        JType::Class(name.to_string())
    }

    /// `java.lang.Object`
    pub fn object() -> Self {
        JType::class(crate::defaults::OBJECT)
    }

    /// `java.lang.String`
    pub fn string() -> Self {
        JType::class(crate::defaults::STRING)
    }

    /// `java.util.List<element>`
    pub fn list_of(element: JType) -> Self {
        JType::Parameterized {
            raw: crate::defaults::LIST.to_string(),
            args: vec![element],
        }
    }

    /// Array of `component`
    pub fn array_of(component: JType) -> Self {
        JType::Array(Box::new(component))
    }

    /// Whether this is a primitive
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            JType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether the erasure is an array
    pub fn is_array(&self) -> bool {
        matches!(self.erasure(), JType::Array(_))
    }

    /// Remove type arguments and variables
    ///
    /// Type variables erase to their first bound, wildcards to their first
    /// upper bound; both fall back to `java.lang.Object`.
    pub fn erasure(&self) -> JType {
        match self {
            JType::Void | JType::Primitive(_) | JType::Class(_) => self.clone(),
            JType::Array(component) | JType::GenericArray(component) => {
                JType::Array(Box::new(component.erasure()))
            }
            JType::Parameterized { raw, .. } => JType::Class(raw.clone()),
            JType::TypeVariable { bounds, .. } => {
                bounds.first().map(JType::erasure).unwrap_or_else(JType::object)
            }
            JType::Wildcard { upper, .. } => {
                upper.first().map(JType::erasure).unwrap_or_else(JType::object)
            }
        }
    }

    /// Binary name of the erased class, `None` for primitives, void and arrays
    pub fn class_name(&self) -> Option<String> {
        match self.erasure() {
            JType::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Runtime name of the erased type
    ///
    /// Primitives use their keyword, classes their binary name and arrays
    /// the descriptor form with `.` separators (`[I`, `[Ljava.lang.String;`).
    pub fn type_name(&self) -> String {
        match self.erasure() {
            JType::Void => "void".to_string(),
            JType::Primitive(p) => p.name().to_string(),
            JType::Class(name) => name,
            array @ JType::Array(_) => array_component_name(&array),
            other => other.to_string(),
        }
    }

    /// Convert a parsed class-file field type
    pub fn from_field_type(ty: &FieldType) -> Self {
        match ty {
            FieldType::Base(c) => Primitive::from_descriptor(*c)
                .map(JType::Primitive)
                .unwrap_or_else(JType::object),
            FieldType::Object(name) => JType::Class(binary_name(name)),
            FieldType::Array(component) => JType::Array(Box::new(JType::from_field_type(component))),
        }
    }
}

fn array_component_name(ty: &JType) -> String {
    match ty {
        JType::Array(component) => format!("[{}", array_component_name(component)),
        JType::Primitive(p) => p.descriptor().to_string(),
        JType::Class(name) => format!("L{};", name),
        other => other.type_name(),
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JType::Void => f.write_str("void"),
            JType::Primitive(p) => f.write_str(p.name()),
            JType::Class(name) => f.write_str(name),
            JType::Array(component) | JType::GenericArray(component) => write!(f, "{}[]", component),
            JType::Parameterized { raw, args } => {
                write!(f, "{}<", raw)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            JType::TypeVariable { name, .. } => f.write_str(name),
            JType::Wildcard { upper, lower } => {
                f.write_str("?")?;
                for bound in upper {
                    write!(f, " extends {}", bound)?;
                }
                for bound in lower {
                    write!(f, " super {}", bound)?;
                }
                Ok(())
            }
        }
    }
}

/// `java.util.List` -> `java/util/List`
pub fn internal_name(binary_name: &str) -> String {
    binary_name.replace('.', "/")
}

/// `java/util/List` -> `java.util.List`
pub fn binary_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// Simple name of a binary class name (`pkg.Outer$Inner` -> `Outer$Inner`)
pub fn simple_name(binary_name: &str) -> &str {
    binary_name.rsplit('.').next().unwrap_or(binary_name)
}

/// Package of a binary class name, empty for the default package
pub fn package_name(binary_name: &str) -> &str {
    binary_name
        .rfind('.')
        .map(|pos| &binary_name[..pos])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erasure() {
        let list = JType::list_of(JType::string());
        assert_eq!(list.erasure(), JType::class("java.util.List"));

        let var = JType::TypeVariable {
            name: "T".into(),
            bounds: vec![JType::class("java.lang.Number")],
        };
        assert_eq!(var.erasure(), JType::class("java.lang.Number"));

        let unbounded = JType::Wildcard {
            upper: vec![],
            lower: vec![JType::string()],
        };
        assert_eq!(unbounded.erasure(), JType::object());

        let generic_array = JType::GenericArray(Box::new(list));
        assert_eq!(
            generic_array.erasure(),
            JType::array_of(JType::class("java.util.List"))
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(JType::int().type_name(), "int");
        assert_eq!(JType::string().type_name(), "java.lang.String");
        assert_eq!(JType::array_of(JType::int()).type_name(), "[I");
        assert_eq!(
            JType::array_of(JType::array_of(JType::string())).type_name(),
            "[[Ljava.lang.String;"
        );
        assert_eq!(JType::list_of(JType::string()).type_name(), "java.util.List");
    }

    #[test]
    fn test_names() {
        assert_eq!(internal_name("pkg.Outer$Inner"), "pkg/Outer$Inner");
        assert_eq!(simple_name("pkg.sub.Foo"), "Foo");
        assert_eq!(package_name("pkg.sub.Foo"), "pkg.sub");
        assert_eq!(package_name("Foo"), "");
    }

    #[test]
    fn test_from_field_type() {
        let ty = FieldType::parse("[Ljava/lang/String;").unwrap();
        assert_eq!(JType::from_field_type(&ty), JType::array_of(JType::string()));
        assert_eq!(
            JType::from_field_type(&FieldType::Base('J')),
            JType::Primitive(Primitive::Long)
        );
    }

    #[test]
    fn test_primitive_metadata() {
        assert_eq!(Primitive::from_descriptor('C'), Some(Primitive::Char));
        assert_eq!(Primitive::Char.box_class(), "java.lang.Character");
        assert_eq!(Primitive::Boolean.unbox_method(), "booleanValue");
        assert!(Primitive::Double.is_wide());
    }
}
