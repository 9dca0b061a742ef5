//! Accessor descriptors and structural signatures

use crate::runtime::{ClassRef, Field, Method};
use crate::types::JType;
use std::fmt;
use std::sync::Arc;

/// How one wrapper part is read and written
#[derive(Clone, Default)]
pub struct AccessorDescriptor {
    /// Backing field
    pub field: Option<Arc<Field>>,
    /// Zero-argument read accessor
    pub getter: Option<Arc<Method>>,
    /// One-argument write accessor
    pub setter: Option<Arc<Method>>,
    /// Object factory method producing the element value the setter takes
    pub factory_method: Option<Arc<Method>>,
}

impl AccessorDescriptor {
    /// A part with no accessors at all
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Whether getter, setter and field are all absent
    pub fn is_placeholder(&self) -> bool {
        self.getter.is_none() && self.setter.is_none() && self.field.is_none()
    }

    /// Return type of the getter
    pub fn getter_type(&self) -> Option<&JType> {
        self.getter.as_ref().map(|g| g.return_type())
    }

    /// Parameter type of the setter
    pub fn setter_type(&self) -> Option<&JType> {
        self.setter.as_ref().and_then(|s| s.params().first())
    }
}

impl fmt::Debug for AccessorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorDescriptor")
            .field("field", &self.field.as_ref().map(|x| &x.name))
            .field("getter", &self.getter.as_ref().map(|m| m.name()))
            .field("setter", &self.setter.as_ref().map(|m| m.name()))
            .field("factory_method", &self.factory_method.as_ref().map(|m| m.name()))
            .finish()
    }
}

/// A wrapper type plus the accessors bridging each of its parts
#[derive(Debug, Clone)]
pub struct WrapperSpec {
    /// The wrapper type
    pub wrapper: ClassRef,
    /// One descriptor per part, in order
    pub parts: Vec<AccessorDescriptor>,
    /// Object factory for element-typed parts
    pub object_factory: Option<ClassRef>,
}

impl WrapperSpec {
    /// Describe a wrapper without element-typed parts
    pub fn new(wrapper: ClassRef, parts: Vec<AccessorDescriptor>) -> Self {
        Self {
            wrapper,
            parts,
            object_factory: None,
        }
    }

    /// Attach the object factory
    pub fn with_object_factory(mut self, factory: ClassRef) -> Self {
        self.object_factory = Some(factory);
        self
    }

    /// Structural signature of the parts
    pub fn signature(&self) -> String {
        compute_signature(&self.parts)
    }

    /// Whether any part goes through the object factory
    pub fn needs_factory(&self) -> bool {
        self.object_factory.is_some() && self.parts.iter().any(|p| p.factory_method.is_some())
    }
}

/// `<n>:` followed by `null,` or `<getter>/<returnType>,` per part
pub fn compute_signature(parts: &[AccessorDescriptor]) -> String {
    let mut signature = format!("{}:", parts.len());
    for part in parts {
        match &part.getter {
            Some(getter) => {
                signature.push_str(getter.name());
                signature.push('/');
                signature.push_str(&getter.return_type().type_name());
                signature.push(',');
            }
            None => signature.push_str("null,"),
        }
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::HostClassBuilder;
    use crate::types::Primitive;

    fn wrapper() -> ClassRef {
        HostClassBuilder::new("pkg.Order")
            .property("count", JType::int())
            .property("items", JType::list_of(JType::string()))
            .property("codes", JType::array_of(JType::int()))
            .build()
            .unwrap()
    }

    fn getter(class: &ClassRef, name: &str) -> AccessorDescriptor {
        AccessorDescriptor {
            getter: class.methods_named(name).next().cloned(),
            ..AccessorDescriptor::default()
        }
    }

    #[test]
    fn test_signature_format() {
        let class = wrapper();
        let parts = vec![
            getter(&class, "getCount"),
            AccessorDescriptor::placeholder(),
            getter(&class, "getItems"),
            getter(&class, "getCodes"),
        ];
        assert_eq!(
            compute_signature(&parts),
            "4:getCount/int,null,getItems/java.util.List,getCodes/[I,"
        );
    }

    #[test]
    fn test_signature_is_pure() {
        let a = wrapper();
        let b = wrapper();
        let left = vec![getter(&a, "getCount"), getter(&a, "getItems")];
        let right = vec![getter(&b, "getCount"), getter(&b, "getItems")];
        assert_eq!(compute_signature(&left), compute_signature(&right));
        assert_ne!(
            compute_signature(&left),
            compute_signature(&[getter(&a, "getItems"), getter(&a, "getCount")])
        );
    }

    #[test]
    fn test_signature_tracks_return_type() {
        let narrow = wrapper();
        let wide = HostClassBuilder::new("pkg.Order")
            .property("count", JType::Primitive(Primitive::Long))
            .build()
            .unwrap();
        let int_sig = compute_signature(&[getter(&narrow, "getCount")]);
        let long_sig = compute_signature(&[getter(&wide, "getCount")]);
        assert_eq!(int_sig, "1:getCount/int,");
        assert_eq!(long_sig, "1:getCount/long,");
        assert_ne!(int_sig, long_sig);
    }

    #[test]
    fn test_placeholder() {
        assert!(AccessorDescriptor::placeholder().is_placeholder());
        assert!(!getter(&wrapper(), "getCount").is_placeholder());
        assert_eq!(compute_signature(&[]), "0:");
    }
}
