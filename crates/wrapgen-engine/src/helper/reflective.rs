//! Reflective wrapper helper
//!
//! Walks the accessor descriptors through the runtime model on every call.
//! Always available; used whenever no generated helper can be produced.

use super::accessor::WrapperSpec;
use super::resolve::{returns_element, returns_list};
use super::WrapperHelper;
use crate::defaults::{ELEMENT, LIST};
use crate::runtime::{ClassRegistry, ClassResolver, Fault, FaultResult, Method, Value};
use crate::types::JType;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

const GET_VALUE: (&str, &str) = ("getValue", "()Ljava/lang/Object;");

/// Helper that invokes accessors reflectively
pub struct ReflectiveWrapperHelper {
    registry: Arc<ClassRegistry>,
    spec: WrapperSpec,
    signature: String,
    factory: OnceCell<Value>,
}

impl ReflectiveWrapperHelper {
    /// Create a helper for `spec`
    pub fn new(registry: Arc<ClassRegistry>, spec: WrapperSpec) -> Self {
        let signature = spec.signature();
        Self {
            registry,
            spec,
            signature,
            factory: OnceCell::new(),
        }
    }

    /// Accessors this helper bridges
    pub fn spec(&self) -> &WrapperSpec {
        &self.spec
    }

    /// Object factory instance, created on first use
    fn factory(&self) -> FaultResult<&Value> {
        self.factory.get_or_try_init(|| {
            let class = self
                .spec
                .object_factory
                .as_ref()
                .ok_or_else(|| Fault::NoSuchClass(crate::defaults::OBJECT_FACTORY.to_string()))?;
            self.registry.instantiate(class)
        })
    }

    fn invoke(&self, receiver: &Value, method: &Method, args: &[Value]) -> FaultResult<Value> {
        self.registry
            .invoke_virtual(receiver, method.name(), method.descriptor(), args)
    }

    fn set_field(&self, wrapper: &Value, name: &str, value: Value) -> FaultResult<()> {
        let obj = wrapper
            .as_object()
            .ok_or_else(|| Fault::NullPointer(format!("setting {}", name)))?;
        if obj.set_field(name, value) {
            Ok(())
        } else {
            Err(Fault::NoSuchField {
                class: obj.class().name().to_string(),
                name: name.to_string(),
            })
        }
    }

    /// Assign one part of a fresh wrapper
    fn assign(&self, wrapper: &Value, index: usize, value: &Value) -> FaultResult<()> {
        let part = &self.spec.parts[index];
        let Some(getter) = &part.getter else {
            if let Some(setter) = &part.setter {
                self.invoke(wrapper, setter, std::slice::from_ref(value))?;
            } else if let Some(field) = &part.field {
                self.set_field(wrapper, &field.name, value.clone())?;
            }
            return Ok(());
        };

        if returns_list(self.registry.as_ref(), getter) {
            self.registry.check_cast(value, LIST)?;
            let current = self.invoke(wrapper, getter, &[])?;
            match current.as_list() {
                Some(list) => {
                    if let Some(items) = value.list_items() {
                        list.write().extend(items);
                    }
                }
                None => match (&part.setter, &part.field) {
                    (Some(setter), _) => {
                        self.invoke(wrapper, setter, std::slice::from_ref(value))?;
                    }
                    (None, Some(field)) => self.set_field(wrapper, &field.name, value.clone())?,
                    (None, None) => {
                        return Err(Fault::runtime(format!(
                            "{} returned null and there isn't a set method.",
                            getter.name()
                        )))
                    }
                },
            }
            return Ok(());
        }

        if let Some(primitive) = getter.return_type().as_primitive() {
            if value.is_null() {
                return Ok(());
            }
            self.registry.check_cast(value, primitive.box_class())?;
        } else if returns_element(self.registry.as_ref(), getter) {
            if let Some(method) = &part.factory_method {
                let holder = self.invoke(self.factory()?, method, std::slice::from_ref(value))?;
                return self.write(wrapper, index, holder);
            }
            self.registry.check_cast(value, ELEMENT)?;
        } else {
            self.registry.check_cast(value, &cast_target(getter.return_type()))?;
        }
        self.write(wrapper, index, value.clone())
    }

    fn write(&self, wrapper: &Value, index: usize, value: Value) -> FaultResult<()> {
        let part = &self.spec.parts[index];
        if let Some(setter) = &part.setter {
            self.invoke(wrapper, setter, &[value])?;
        } else if let Some(field) = &part.field {
            self.set_field(wrapper, &field.name, value)?;
        }
        Ok(())
    }

    /// Read one part of an existing wrapper
    fn read(&self, wrapper: &Value, index: usize) -> FaultResult<Value> {
        let part = &self.spec.parts[index];
        let (value, element) = match (&part.getter, &part.field) {
            (Some(getter), _) => (
                self.invoke(wrapper, getter, &[])?,
                returns_element(self.registry.as_ref(), getter),
            ),
            (None, Some(field)) => (
                wrapper
                    .as_object()
                    .and_then(|obj| obj.get_field(&field.name))
                    .unwrap_or(Value::Null),
                field
                    .ty
                    .class_name()
                    .is_some_and(|name| self.registry.is_assignable_name(&name, ELEMENT)),
            ),
            (None, None) => return Ok(Value::Null),
        };
        // Holders are unwrapped only where the declared type is the element type
        if element && !value.is_null() {
            let (name, descriptor) = GET_VALUE;
            return self.registry.invoke_virtual(&value, name, descriptor, &[]);
        }
        Ok(value)
    }
}

/// Name `checkcast` uses for a declared type
fn cast_target(ty: &JType) -> String {
    match ty.erasure() {
        JType::Class(name) => name,
        other => crate::descriptor::encode(&other).unwrap_or_else(|_| other.type_name()),
    }
}

impl WrapperHelper for ReflectiveWrapperHelper {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn create_wrapper_object(&self, parts: &[Value]) -> FaultResult<Value> {
        if parts.len() != self.spec.parts.len() {
            return Err(Fault::ShapeMismatch {
                expected: self.spec.parts.len(),
                found: parts.len(),
            });
        }
        let wrapper = self.registry.instantiate(&self.spec.wrapper)?;
        for (index, value) in parts.iter().enumerate() {
            self.assign(&wrapper, index, value)?;
        }
        Ok(wrapper)
    }

    fn wrapper_parts(&self, wrapper: &Value) -> FaultResult<Vec<Value>> {
        self.registry.check_cast(wrapper, self.spec.wrapper.name())?;
        (0..self.spec.parts.len())
            .map(|index| self.read(wrapper, index))
            .collect()
    }
}

impl fmt::Debug for ReflectiveWrapperHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveWrapperHelper")
            .field("wrapper", &self.spec.wrapper.name())
            .field("signature", &self.signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{resolve_accessors, PartDescription};
    use crate::runtime::{ClassRef, HostClassBuilder};

    fn setup() -> (Arc<ClassRegistry>, ClassRef) {
        let registry = Arc::new(ClassRegistry::with_builtins());
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.Order")
                .property("count", JType::int())
                .property("items", JType::list_of(JType::string()))
                .property("note", JType::string())
                .build()
                .unwrap(),
        );
        (registry, wrapper)
    }

    fn helper(registry: &Arc<ClassRegistry>, wrapper: &ClassRef, names: &[&str]) -> ReflectiveWrapperHelper {
        let parts: Vec<_> = names.iter().map(|n| Some(PartDescription::new(n))).collect();
        let spec = resolve_accessors(registry, wrapper, &parts);
        ReflectiveWrapperHelper::new(registry.clone(), spec)
    }

    #[test]
    fn test_round_trip() {
        let (registry, wrapper) = setup();
        let helper = helper(&registry, &wrapper, &["count", "items", "note"]);
        let parts = vec![
            Value::Int(5),
            Value::list(vec![Value::str("a"), Value::str("b")]),
            Value::str("x"),
        ];
        let object = helper.create_wrapper_object(&parts).unwrap();
        assert_eq!(helper.wrapper_parts(&object).unwrap(), parts);
        assert!(!helper.is_generated());
    }

    #[test]
    fn test_null_primitive_keeps_default() {
        let (registry, wrapper) = setup();
        let helper = helper(&registry, &wrapper, &["count"]);
        let object = helper.create_wrapper_object(&[Value::Null]).unwrap();
        assert_eq!(helper.wrapper_parts(&object).unwrap(), vec![Value::Int(0)]);
    }

    #[test]
    fn test_list_merges_into_existing() {
        let (registry, wrapper) = setup();
        let helper = helper(&registry, &wrapper, &["items"]);
        let object = helper
            .create_wrapper_object(&[Value::list(vec![Value::str("a")])])
            .unwrap();
        let existing = object.as_object().unwrap().get_field("items").unwrap();
        helper.assign(&object, 0, &Value::list(vec![Value::str("b")])).unwrap();
        assert_eq!(existing.list_items().unwrap().len(), 2);
    }

    #[test]
    fn test_list_without_setter() {
        let registry = Arc::new(ClassRegistry::with_builtins());
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.ReadOnly")
                .read_only_property("items", JType::list_of(JType::string()))
                .build()
                .unwrap(),
        );
        let helper = helper(&registry, &wrapper, &["items"]);
        let err = helper
            .create_wrapper_object(&[Value::list(vec![])])
            .unwrap_err();
        assert_eq!(
            err,
            Fault::runtime("getItems returned null and there isn't a set method.")
        );
    }

    #[test]
    fn test_shape_mismatch_and_cast() {
        let (registry, wrapper) = setup();
        let helper = helper(&registry, &wrapper, &["count", "note"]);
        assert_eq!(
            helper.create_wrapper_object(&[Value::Int(1)]).unwrap_err(),
            Fault::ShapeMismatch {
                expected: 2,
                found: 1
            }
        );
        assert!(matches!(
            helper.create_wrapper_object(&[Value::str("one"), Value::Null]),
            Err(Fault::ClassCast { .. })
        ));
        assert!(matches!(
            helper.wrapper_parts(&Value::str("not a wrapper")),
            Err(Fault::ClassCast { .. })
        ));
    }

    #[test]
    fn test_object_typed_part_keeps_holder() {
        let registry = Arc::new(ClassRegistry::with_builtins());
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.Envelope")
                .property("payload", JType::object())
                .build()
                .unwrap(),
        );
        let helper = helper(&registry, &wrapper, &["payload"]);
        let holder = registry
            .new_element("payload", crate::defaults::STRING, Value::str("inner"))
            .unwrap();
        let object = helper.create_wrapper_object(&[holder.clone()]).unwrap();
        assert_eq!(helper.wrapper_parts(&object).unwrap(), vec![holder]);
    }

    #[test]
    fn test_placeholder_and_field_only_parts() {
        let registry = Arc::new(ClassRegistry::with_builtins());
        let wrapper = registry.register(
            HostClassBuilder::new("pkg.Mixed")
                .element_field("secret", JType::string(), "secret")
                .property("name", JType::string())
                .build()
                .unwrap(),
        );
        let spec = resolve_accessors(
            &registry,
            &wrapper,
            &[None, Some(PartDescription::new("secret")), Some(PartDescription::new("name"))],
        );
        let helper = ReflectiveWrapperHelper::new(registry, spec);
        let object = helper
            .create_wrapper_object(&[Value::str("ignored"), Value::str("s"), Value::str("n")])
            .unwrap();
        assert_eq!(
            helper.wrapper_parts(&object).unwrap(),
            vec![Value::Null, Value::str("s"), Value::str("n")]
        );
    }
}
