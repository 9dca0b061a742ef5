//! Class registry and name resolution
//!
//! `ClassRegistry` is the shared parent of every type loader. It holds the
//! built-in host classes plus whatever host classes the embedding
//! application registers (wrapper types, object factories).

use super::class::{ClassRef, HostClassBuilder, Method};
use super::fault::{Fault, FaultResult};
use super::value::{ListRef, Object, Value};
use crate::defaults::{
    ARRAY_LIST, COLLECTION, ELEMENT, HELPER_INTERFACE, LIST, OBJECT, RUNTIME_EXCEPTION, STRING,
    THROWABLE,
};
use crate::descriptor::DescriptorError;
use crate::types::{JType, Primitive};
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Name resolution and the operations that depend on it
pub trait ClassResolver: Send + Sync {
    /// Resolve a binary class name
    fn resolve(&self, name: &str) -> Option<ClassRef>;

    /// Resolve or fail with `NoSuchClass`
    fn require(&self, name: &str) -> FaultResult<ClassRef> {
        self.resolve(name)
            .ok_or_else(|| Fault::NoSuchClass(name.to_string()))
    }

    /// Find a method on `class`, its superclasses or its interfaces
    fn find_method(&self, class: &ClassRef, name: &str, descriptor: &str) -> Option<Arc<Method>> {
        let mut current = Some(class.clone());
        while let Some(cls) = current {
            if let Some(method) = cls.declared_method(name, descriptor) {
                return Some(method.clone());
            }
            current = cls.superclass().and_then(|s| self.resolve(s));
        }
        let mut pending = vec![class.clone()];
        let mut seen = Vec::new();
        while let Some(cls) = pending.pop() {
            if seen.contains(&cls.id()) {
                continue;
            }
            seen.push(cls.id());
            if let Some(method) = cls.declared_method(name, descriptor) {
                return Some(method.clone());
            }
            pending.extend(cls.interfaces().iter().filter_map(|i| self.resolve(i)));
            if let Some(sup) = cls.superclass().and_then(|s| self.resolve(s)) {
                pending.push(sup);
            }
        }
        None
    }

    /// Whether instances of `from` can be assigned to `to`
    fn is_assignable(&self, from: &ClassRef, to: &str) -> bool {
        if to == OBJECT {
            return true;
        }
        let mut pending = vec![from.clone()];
        let mut seen = Vec::new();
        while let Some(cls) = pending.pop() {
            if cls.name() == to {
                return true;
            }
            if seen.contains(&cls.id()) {
                continue;
            }
            seen.push(cls.id());
            pending.extend(cls.interfaces().iter().filter_map(|i| self.resolve(i)));
            if let Some(sup) = cls.superclass().and_then(|s| self.resolve(s)) {
                pending.push(sup);
            }
        }
        false
    }

    /// Whether the class named `from` is assignable to `to`
    fn is_assignable_name(&self, from: &str, to: &str) -> bool {
        from == to
            || self
                .resolve(from)
                .map(|cls| self.is_assignable(&cls, to))
                .unwrap_or(false)
    }

    /// Runtime class of a value; `None` for `null`
    fn class_of(&self, value: &Value) -> Option<ClassRef> {
        let name = match value {
            Value::Null => return None,
            Value::Object(obj) => return Some(obj.class().clone()),
            Value::Bool(_) => Primitive::Boolean.box_class(),
            Value::Byte(_) => Primitive::Byte.box_class(),
            Value::Short(_) => Primitive::Short.box_class(),
            Value::Char(_) => Primitive::Char.box_class(),
            Value::Int(_) => Primitive::Int.box_class(),
            Value::Long(_) => Primitive::Long.box_class(),
            Value::Float(_) => Primitive::Float.box_class(),
            Value::Double(_) => Primitive::Double.box_class(),
            Value::Str(_) => STRING,
            Value::List(_) => ARRAY_LIST,
        };
        self.resolve(name)
    }

    /// Whether `value` is an instance of the type named `target`
    ///
    /// `target` is a binary class name or an array descriptor (`[I`).
    fn is_instance(&self, value: &Value, target: &str) -> bool {
        if target.starts_with('[') {
            return matches!(value, Value::List(_));
        }
        self.class_of(value)
            .map(|cls| self.is_assignable(&cls, target))
            .unwrap_or(false)
    }

    /// Reference cast: `null` always passes
    fn check_cast(&self, value: &Value, target: &str) -> FaultResult<()> {
        if value.is_null() || self.is_instance(value, target) {
            Ok(())
        } else {
            Err(Fault::ClassCast {
                expected: target.to_string(),
                found: self
                    .class_of(value)
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| value.kind_name()),
            })
        }
    }

    /// Allocate an instance without running a constructor
    fn allocate(&self, class: &ClassRef) -> FaultResult<Value> {
        if let Some(allocator) = class.allocator() {
            return allocator(class);
        }
        if !class.is_instantiable() {
            return Err(Fault::Instantiation(class.name().to_string()));
        }
        let mut fields = FxHashMap::default();
        let mut current = Some(class.clone());
        while let Some(cls) = current {
            for field in cls.fields() {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| field.default_value());
            }
            current = cls.superclass().and_then(|s| self.resolve(s));
        }
        Ok(Value::Object(Arc::new(Object::new(class.clone(), fields))))
    }

    /// Allocate and run the no-argument constructor
    fn instantiate(&self, class: &ClassRef) -> FaultResult<Value> {
        let instance = self.allocate(class)?;
        let ctor = self
            .find_method(class, "<init>", "()V")
            .ok_or_else(|| Fault::NoSuchMethod {
                class: class.name().to_string(),
                name: "<init>".to_string(),
                descriptor: "()V".to_string(),
            })?;
        ctor.invoke(self.as_dyn(), &instance, &[])?;
        Ok(instance)
    }

    /// Invoke a virtual method by name and descriptor
    fn invoke_virtual(
        &self,
        receiver: &Value,
        name: &str,
        descriptor: &str,
        args: &[Value],
    ) -> FaultResult<Value> {
        let class = self
            .class_of(receiver)
            .ok_or_else(|| Fault::NullPointer(format!("invoking {}{}", name, descriptor)))?;
        let method = self
            .find_method(&class, name, descriptor)
            .ok_or_else(|| Fault::NoSuchMethod {
                class: class.name().to_string(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;
        method.invoke(self.as_dyn(), receiver, args)
    }

    /// Upcast helper for default methods
    fn as_dyn(&self) -> &dyn ClassResolver;
}

/// The shared class registry
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: DashMap<String, ClassRef>,
}

impl ClassRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in host classes
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for class in builtin_classes() {
            registry.register(class);
        }
        registry
    }

    /// Register a class under its name, replacing an earlier one
    pub fn register(&self, class: ClassRef) -> ClassRef {
        self.classes.insert(class.name().to_string(), class.clone());
        class
    }

    /// Registered class by name
    pub fn get(&self, name: &str) -> Option<ClassRef> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Construct an element holder wrapping `value`
    pub fn new_element(&self, name: &str, declared_type: &str, value: Value) -> FaultResult<Value> {
        let class = self.require(ELEMENT)?;
        let element = self.allocate(&class)?;
        if let Some(obj) = element.as_object() {
            obj.set_field("name", Value::str(name));
            obj.set_field("declaredType", Value::str(declared_type));
            obj.set_field("value", value);
        }
        Ok(element)
    }
}

impl ClassResolver for ClassRegistry {
    fn resolve(&self, name: &str) -> Option<ClassRef> {
        self.get(name)
    }

    fn as_dyn(&self) -> &dyn ClassResolver {
        self
    }
}

// ===== Built-in host classes =====

fn builtin_classes() -> Vec<ClassRef> {
    let mut classes = Vec::new();
    let mut push = |built: Result<ClassRef, DescriptorError>| match built {
        Ok(class) => classes.push(class),
        Err(e) => tracing::error!(error = %e, "invalid built-in class"),
    };

    push(HostClassBuilder::new(OBJECT).root().default_constructor().build());
    push(HostClassBuilder::new(STRING).abstract_class().build());
    for primitive in Primitive::ALL {
        push(box_class(primitive));
    }
    push(collection_interface());
    push(list_interface());
    push(
        HostClassBuilder::new(ARRAY_LIST)
            .implements(LIST)
            .allocator(|_| Ok(Value::list(Vec::new())))
            .default_constructor()
            .build(),
    );
    push(throwable(THROWABLE, None));
    push(throwable(RUNTIME_EXCEPTION, Some(THROWABLE)));
    push(
        HostClassBuilder::new(ELEMENT)
            .read_only_property("name", JType::string())
            .read_only_property("declaredType", JType::string())
            .property("value", JType::object())
            .build(),
    );
    push(
        HostClassBuilder::new(HELPER_INTERFACE)
            .interface()
            .abstract_method("getSignature", vec![], JType::string())
            .abstract_method("createWrapperObject", vec![JType::class(LIST)], JType::object())
            .abstract_method("getWrapperParts", vec![JType::object()], JType::class(LIST))
            .build(),
    );
    classes
}

fn box_class(primitive: Primitive) -> Result<ClassRef, DescriptorError> {
    let boxed = JType::class(primitive.box_class());
    HostClassBuilder::new(primitive.box_class())
        .abstract_class()
        .static_method(
            "valueOf",
            vec![JType::Primitive(primitive)],
            boxed,
            |_, _, args| Ok(args.first().cloned().unwrap_or(Value::Null)),
        )
        .method(
            &primitive.unbox_method(),
            vec![],
            JType::Primitive(primitive),
            |_, this, _| Ok(this.clone()),
        )
        .build()
}

fn list_receiver<'a>(this: &'a Value, method: &str) -> FaultResult<&'a ListRef> {
    this.as_list()
        .ok_or_else(|| Fault::NullPointer(format!("List.{} on {}", method, this.kind_name())))
}

fn collection_methods(builder: HostClassBuilder) -> HostClassBuilder {
    builder
        .method("size", vec![], JType::int(), |_, this, _| {
            Ok(Value::Int(list_receiver(this, "size")?.read().len() as i32))
        })
        .method("isEmpty", vec![], JType::boolean(), |_, this, _| {
            Ok(Value::Bool(list_receiver(this, "isEmpty")?.read().is_empty()))
        })
        .method("add", vec![JType::object()], JType::boolean(), |_, this, args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            list_receiver(this, "add")?.write().push(value);
            Ok(Value::Bool(true))
        })
        .method(
            "addAll",
            vec![JType::class(COLLECTION)],
            JType::boolean(),
            |_, this, args| {
                let list = list_receiver(this, "addAll")?;
                // Snapshot first so `list.addAll(list)` does not deadlock
                let items = match args.first() {
                    Some(Value::List(other)) => other.read().clone(),
                    Some(Value::Null) | None => {
                        return Err(Fault::NullPointer("addAll(null)".to_string()))
                    }
                    Some(other) => {
                        return Err(Fault::ClassCast {
                            expected: COLLECTION.to_string(),
                            found: other.kind_name(),
                        })
                    }
                };
                let changed = !items.is_empty();
                list.write().extend(items);
                Ok(Value::Bool(changed))
            },
        )
}

fn collection_interface() -> Result<ClassRef, DescriptorError> {
    collection_methods(HostClassBuilder::new(COLLECTION).interface()).build()
}

fn list_interface() -> Result<ClassRef, DescriptorError> {
    collection_methods(HostClassBuilder::new(LIST).interface().implements(COLLECTION))
        .method("get", vec![JType::int()], JType::object(), |_, this, args| {
            let list = list_receiver(this, "get")?;
            let index = args.first().and_then(Value::as_int).unwrap_or(-1);
            let items = list.read();
            usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or(Fault::IndexOutOfBounds {
                    index: index as i64,
                    len: items.len(),
                })
        })
        .build()
}

fn throwable(name: &str, parent: Option<&str>) -> Result<ClassRef, DescriptorError> {
    let mut builder = HostClassBuilder::new(name);
    if let Some(parent) = parent {
        builder = builder.extends(parent);
    } else {
        builder = builder.field("message", JType::string());
    }
    builder
        .default_constructor()
        .method("<init>", vec![JType::string()], JType::Void, |_, this, args| {
            if let Some(obj) = this.as_object() {
                obj.set_field("message", args.first().cloned().unwrap_or(Value::Null));
            }
            Ok(Value::Null)
        })
        .getter("getMessage", "message", JType::string())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_methods_through_interfaces() {
        let registry = ClassRegistry::with_builtins();
        let list = Value::list(vec![Value::Int(1)]);
        registry
            .invoke_virtual(&list, "add", "(Ljava/lang/Object;)Z", &[Value::str("x")])
            .unwrap();
        let size = registry.invoke_virtual(&list, "size", "()I", &[]).unwrap();
        assert_eq!(size, Value::Int(2));
        let second = registry
            .invoke_virtual(&list, "get", "(I)Ljava/lang/Object;", &[Value::Int(1)])
            .unwrap();
        assert_eq!(second, Value::str("x"));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let registry = ClassRegistry::with_builtins();
        let list = Value::list(vec![]);
        let err = registry
            .invoke_virtual(&list, "get", "(I)Ljava/lang/Object;", &[Value::Int(3)])
            .unwrap_err();
        assert_eq!(err, Fault::IndexOutOfBounds { index: 3, len: 0 });
    }

    #[test]
    fn test_add_all_to_itself() {
        let registry = ClassRegistry::with_builtins();
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        registry
            .invoke_virtual(&list, "addAll", "(Ljava/util/Collection;)Z", &[list.clone()])
            .unwrap();
        assert_eq!(list.list_items().unwrap().len(), 4);
    }

    #[test]
    fn test_assignability() {
        let registry = ClassRegistry::with_builtins();
        assert!(registry.is_assignable_name(ARRAY_LIST, COLLECTION));
        assert!(registry.is_assignable_name(RUNTIME_EXCEPTION, THROWABLE));
        assert!(!registry.is_assignable_name(STRING, LIST));
        assert!(registry.is_instance(&Value::Int(3), "java.lang.Integer"));
        assert!(registry.is_instance(&Value::list(vec![]), "[I"));
        assert!(registry.check_cast(&Value::Null, LIST).is_ok());
        assert!(matches!(
            registry.check_cast(&Value::str("s"), LIST),
            Err(Fault::ClassCast { .. })
        ));
    }

    #[test]
    fn test_boxing_is_identity() {
        let registry = ClassRegistry::with_builtins();
        let int_box = registry.get("java.lang.Integer").unwrap();
        let value_of = int_box.declared_method("valueOf", "(I)Ljava/lang/Integer;").unwrap();
        assert_eq!(
            value_of.invoke(&registry, &Value::Null, &[Value::Int(9)]).unwrap(),
            Value::Int(9)
        );
        let unboxed = registry
            .invoke_virtual(&Value::Int(9), "intValue", "()I", &[])
            .unwrap();
        assert_eq!(unboxed, Value::Int(9));
        assert!(matches!(
            registry.instantiate(&int_box),
            Err(Fault::Instantiation(_))
        ));
    }

    #[test]
    fn test_exception_message() {
        let registry = ClassRegistry::with_builtins();
        let class = registry.get(RUNTIME_EXCEPTION).unwrap();
        let exception = registry.allocate(&class).unwrap();
        let ctor = registry
            .find_method(&class, "<init>", "(Ljava/lang/String;)V")
            .unwrap();
        ctor.invoke(&registry, &exception, &[Value::str("boom")]).unwrap();
        let message = registry
            .invoke_virtual(&exception, "getMessage", "()Ljava/lang/String;", &[])
            .unwrap();
        assert_eq!(message, Value::str("boom"));
    }

    #[test]
    fn test_new_element() {
        let registry = ClassRegistry::with_builtins();
        let element = registry
            .new_element("item", "java.lang.String", Value::str("v"))
            .unwrap();
        let value = registry
            .invoke_virtual(&element, "getValue", "()Ljava/lang/Object;", &[])
            .unwrap();
        assert_eq!(value, Value::str("v"));
    }
}
