//! Classes, fields and methods
//!
//! Host classes are described in Rust with [`HostClassBuilder`]; loaded
//! classes are built by the type loader from class-file bytes. Both end up
//! as the same [`Class`] so lookup and invocation do not care where a class
//! came from.

use super::fault::{Fault, FaultResult};
use super::interpreter::{Interpreter, LoadedCode};
use super::registry::ClassResolver;
use super::value::Value;
use crate::descriptor::{self, DescriptorError};
use crate::types::{JType, Primitive};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared class reference
pub type ClassRef = Arc<Class>;

/// Body of a host method: `(resolver, receiver, args) -> result`
pub type NativeFn =
    Arc<dyn Fn(&dyn ClassResolver, &Value, &[Value]) -> FaultResult<Value> + Send + Sync>;

/// Custom instance allocation
pub type Allocator = Arc<dyn Fn(&ClassRef) -> FaultResult<Value> + Send + Sync>;

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique class identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: JType,
    /// Element name from the binding metadata, when annotated
    pub element_name: Option<String>,
}

impl Field {
    /// Value a fresh instance holds in this field
    pub fn default_value(&self) -> Value {
        default_value(&self.ty)
    }
}

/// Zero value of a type
pub fn default_value(ty: &JType) -> Value {
    match ty {
        JType::Primitive(Primitive::Boolean) => Value::Bool(false),
        JType::Primitive(Primitive::Byte) => Value::Byte(0),
        JType::Primitive(Primitive::Char) => Value::Char(0),
        JType::Primitive(Primitive::Short) => Value::Short(0),
        JType::Primitive(Primitive::Int) => Value::Int(0),
        JType::Primitive(Primitive::Long) => Value::Long(0),
        JType::Primitive(Primitive::Float) => Value::Float(0.0),
        JType::Primitive(Primitive::Double) => Value::Double(0.0),
        _ => Value::Null,
    }
}

/// How a method executes
#[derive(Clone)]
pub enum MethodBody {
    /// Host closure
    Native(NativeFn),
    /// Class-file instructions
    Bytecode(Arc<LoadedCode>),
    /// No body
    Abstract,
}

/// A declared method
pub struct Method {
    owner: String,
    name: String,
    params: Vec<JType>,
    ret: JType,
    is_static: bool,
    descriptor: String,
    body: MethodBody,
}

impl Method {
    /// Create a method; the erased descriptor is computed from the types
    pub fn new(
        owner: &str,
        name: &str,
        params: Vec<JType>,
        ret: JType,
        is_static: bool,
        body: MethodBody,
    ) -> Result<Self, DescriptorError> {
        let descriptor = descriptor::method_descriptor(&params, &ret)?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            params,
            ret,
            is_static,
            descriptor,
            body,
        })
    }

    /// Declaring class
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[JType] {
        &self.params
    }

    /// Declared return type
    pub fn return_type(&self) -> &JType {
        &self.ret
    }

    /// Whether the method is static
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Erased descriptor
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Whether the method has a body
    pub fn is_abstract(&self) -> bool {
        matches!(self.body, MethodBody::Abstract)
    }

    /// Invoke with `receiver` (`Value::Null` for static methods)
    pub fn invoke(
        &self,
        resolver: &dyn ClassResolver,
        receiver: &Value,
        args: &[Value],
    ) -> FaultResult<Value> {
        if args.len() != self.params.len() {
            return Err(Fault::Execution(format!(
                "{}.{}{} expects {} arguments, got {}",
                self.owner,
                self.name,
                self.descriptor,
                self.params.len(),
                args.len()
            )));
        }
        match &self.body {
            MethodBody::Native(f) => f(resolver, receiver, args),
            MethodBody::Bytecode(code) => Interpreter::new(resolver).execute(code, receiver, args),
            MethodBody::Abstract => Err(Fault::AbstractMethod(format!(
                "{}.{}{}",
                self.owner, self.name, self.descriptor
            ))),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// A class or interface
pub struct Class {
    id: ClassId,
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    is_interface: bool,
    is_abstract: bool,
    fields: Vec<Arc<Field>>,
    methods: Vec<Arc<Method>>,
    method_index: FxHashMap<(String, String), usize>,
    allocator: Option<Allocator>,
}

impl Class {
    /// Assemble a class from its parts
    pub fn new(
        name: &str,
        superclass: Option<String>,
        interfaces: Vec<String>,
        fields: Vec<Field>,
        methods: Vec<Method>,
    ) -> Self {
        let method_index = methods
            .iter()
            .enumerate()
            .map(|(i, m)| ((m.name.clone(), m.descriptor.clone()), i))
            .collect();
        Self {
            id: ClassId::next(),
            name: name.to_string(),
            superclass,
            interfaces,
            is_interface: false,
            is_abstract: false,
            fields: fields.into_iter().map(Arc::new).collect(),
            methods: methods.into_iter().map(Arc::new).collect(),
            method_index,
            allocator: None,
        }
    }

    /// Identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Binary name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binary name of the superclass
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Binary names of the directly implemented interfaces
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    /// Whether instances can be created
    pub fn is_instantiable(&self) -> bool {
        !self.is_interface && !self.is_abstract
    }

    /// Declared fields
    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    /// Declared field by name
    pub fn field(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared methods
    pub fn methods(&self) -> &[Arc<Method>] {
        &self.methods
    }

    /// Declared method by name and erased descriptor
    pub fn declared_method(&self, name: &str, descriptor: &str) -> Option<&Arc<Method>> {
        self.method_index
            .get(&(name.to_string(), descriptor.to_string()))
            .map(|&i| &self.methods[i])
    }

    /// Declared methods with `name`
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<Method>> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub(crate) fn set_kind(&mut self, is_interface: bool, is_abstract: bool) {
        self.is_interface = is_interface;
        self.is_abstract = is_abstract;
    }

    pub(crate) fn allocator(&self) -> Option<&Allocator> {
        self.allocator.as_ref()
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Capitalize the first character (`name` -> `Name`)
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ===== Host classes =====

/// Builder for classes implemented in Rust
///
/// ```ignore
/// let point = HostClassBuilder::new("geo.Point")
///     .property("x", JType::int())
///     .property("y", JType::int())
///     .build()?;
/// ```
pub struct HostClassBuilder {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    is_interface: bool,
    is_abstract: bool,
    fields: Vec<Field>,
    methods: Vec<(String, Vec<JType>, JType, bool, MethodBody)>,
    allocator: Option<Allocator>,
}

impl HostClassBuilder {
    /// Start a class extending `java.lang.Object`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            superclass: Some(crate::defaults::OBJECT.to_string()),
            interfaces: Vec::new(),
            is_interface: false,
            is_abstract: false,
            fields: Vec::new(),
            methods: Vec::new(),
            allocator: None,
        }
    }

    /// Set the superclass
    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.to_string());
        self
    }

    /// Declare the root class (no superclass)
    pub fn root(mut self) -> Self {
        self.superclass = None;
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    /// Mark as an interface
    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    /// Mark as not instantiable
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a field
    pub fn field(mut self, name: &str, ty: JType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty,
            element_name: None,
        });
        self
    }

    /// Declare a field bound to a named element
    pub fn element_field(mut self, name: &str, ty: JType, element_name: &str) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty,
            element_name: Some(element_name.to_string()),
        });
        self
    }

    /// Add a getter for an existing field, named `getter`
    pub fn getter(self, getter: &str, field: &str, ty: JType) -> Self {
        let field = field.to_string();
        let class = self.name.clone();
        self.method(getter, vec![], ty, move |_, this, _| {
            let obj = this
                .as_object()
                .ok_or_else(|| Fault::NullPointer(format!("{}.{}", class, field)))?;
            obj.get_field(&field).ok_or_else(|| Fault::NoSuchField {
                class: class.clone(),
                name: field.clone(),
            })
        })
    }

    /// Add a one-argument setter for an existing field, named `setter`
    pub fn setter(self, setter: &str, field: &str, ty: JType) -> Self {
        let field = field.to_string();
        let class = self.name.clone();
        self.method(setter, vec![ty], JType::Void, move |_, this, args| {
            let obj = this
                .as_object()
                .ok_or_else(|| Fault::NullPointer(format!("{}.{}", class, field)))?;
            let value = args.first().cloned().unwrap_or(Value::Null);
            if obj.set_field(&field, value) {
                Ok(Value::Null)
            } else {
                Err(Fault::NoSuchField {
                    class: class.clone(),
                    name: field.clone(),
                })
            }
        })
    }

    /// Field plus bean accessors (`getX`/`isX` and `setX`)
    pub fn property(self, name: &str, ty: JType) -> Self {
        let prefix = if ty == JType::boolean() { "is" } else { "get" };
        let getter = format!("{}{}", prefix, capitalize(name));
        let setter = format!("set{}", capitalize(name));
        self.field(name, ty.clone())
            .getter(&getter, name, ty.clone())
            .setter(&setter, name, ty)
    }

    /// Field plus a getter only
    pub fn read_only_property(self, name: &str, ty: JType) -> Self {
        let prefix = if ty == JType::boolean() { "is" } else { "get" };
        let getter = format!("{}{}", prefix, capitalize(name));
        self.field(name, ty.clone()).getter(&getter, name, ty)
    }

    /// Add an instance method
    pub fn method(
        mut self,
        name: &str,
        params: Vec<JType>,
        ret: JType,
        f: impl Fn(&dyn ClassResolver, &Value, &[Value]) -> FaultResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods
            .push((name.to_string(), params, ret, false, MethodBody::Native(Arc::new(f))));
        self
    }

    /// Add a static method
    pub fn static_method(
        mut self,
        name: &str,
        params: Vec<JType>,
        ret: JType,
        f: impl Fn(&dyn ClassResolver, &Value, &[Value]) -> FaultResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.methods
            .push((name.to_string(), params, ret, true, MethodBody::Native(Arc::new(f))));
        self
    }

    /// Declare a method without a body
    pub fn abstract_method(mut self, name: &str, params: Vec<JType>, ret: JType) -> Self {
        self.methods
            .push((name.to_string(), params, ret, false, MethodBody::Abstract));
        self
    }

    /// No-argument constructor that does nothing beyond allocation
    pub fn default_constructor(self) -> Self {
        self.method("<init>", vec![], JType::Void, |_, _, _| Ok(Value::Null))
    }

    /// Replace default object allocation
    pub fn allocator(
        mut self,
        f: impl Fn(&ClassRef) -> FaultResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.allocator = Some(Arc::new(f));
        self
    }

    /// Finish the class
    pub fn build(self) -> Result<ClassRef, DescriptorError> {
        let mut methods = Vec::with_capacity(self.methods.len());
        for (name, params, ret, is_static, body) in self.methods {
            methods.push(Method::new(&self.name, &name, params, ret, is_static, body)?);
        }
        let mut class = Class::new(
            &self.name,
            self.superclass,
            self.interfaces,
            self.fields,
            methods,
        );
        class.is_interface = self.is_interface;
        class.is_abstract = self.is_abstract;
        class.allocator = self.allocator;
        Ok(Arc::new(class))
    }
}
