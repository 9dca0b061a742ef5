//! Type loader
//!
//! Defines class-file bytes into the runtime model. Each wrapper type gets
//! its own loader whose parent is the shared [`ClassRegistry`]; names are
//! resolved against the loader's own definitions first.

use super::class::{Class, ClassRef, Field, Method, MethodBody};
use super::interpreter::LoadedCode;
use super::registry::{ClassRegistry, ClassResolver};
use crate::descriptor::DescriptorError;
use crate::types::{binary_name, JType};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use wrapgen_classfile::{
    access, verify_class, ClassFile, DecodeError, FieldType, MethodDescriptor, VerifyError,
};

/// Class definition errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// The name is already defined in this loader
    #[error("Duplicate class definition: {0}")]
    DuplicateDefinition(String),

    /// Bytes declare a different class than requested
    #[error("Class name mismatch: expected {expected}, found {found}")]
    NameMismatch {
        /// Requested name
        expected: String,
        /// Name in the bytes
        found: String,
    },

    /// Superclass or interface does not resolve
    #[error("Unresolved supertype {supertype} of {class}")]
    UnresolvedSupertype {
        /// Class being defined
        class: String,
        /// Missing supertype
        supertype: String,
    },

    /// Malformed class file
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Verification failed
    #[error("Verify error: {0}")]
    Verify(#[from] VerifyError),

    /// Member types cannot be described
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
}

/// A class defined by a loader
#[derive(Debug, Clone)]
pub struct DefinedClass {
    /// Runtime class
    pub class: ClassRef,
    /// crc32 of the defining bytes
    pub checksum: u32,
}

/// Per-wrapper class loader
#[derive(Debug)]
pub struct TypeLoader {
    owner: String,
    parent: Arc<ClassRegistry>,
    defined: DashMap<String, DefinedClass>,
    define_lock: Mutex<()>,
}

impl TypeLoader {
    /// Create a loader for classes generated on behalf of `owner`
    pub fn new(owner: &str, parent: Arc<ClassRegistry>) -> Self {
        Self {
            owner: owner.to_string(),
            parent,
            defined: DashMap::new(),
            define_lock: Mutex::new(()),
        }
    }

    /// Name of the type this loader serves
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Parent registry
    pub fn parent(&self) -> &Arc<ClassRegistry> {
        &self.parent
    }

    /// Define a class from bytes
    ///
    /// A name is defined at most once; later attempts fail with
    /// `DuplicateDefinition` and leave the first definition in place.
    pub fn define_class(&self, name: &str, bytes: &[u8]) -> Result<ClassRef, LoadError> {
        let _guard = self.define_lock.lock();
        if self.defined.contains_key(name) {
            return Err(LoadError::DuplicateDefinition(name.to_string()));
        }

        let file = ClassFile::decode(bytes)?;
        let found = binary_name(&file.this_class);
        if found != name {
            return Err(LoadError::NameMismatch {
                expected: name.to_string(),
                found,
            });
        }
        verify_class(&file)?;

        let superclass = file.super_class.as_deref().map(binary_name);
        let interfaces: Vec<String> = file.interfaces.iter().map(|i| binary_name(i)).collect();
        for supertype in superclass.iter().chain(&interfaces) {
            if self.resolve(supertype).is_none() {
                return Err(LoadError::UnresolvedSupertype {
                    class: name.to_string(),
                    supertype: supertype.clone(),
                });
            }
        }

        let class = build_class(name, Arc::new(file), superclass, interfaces)?;
        let checksum = crc32fast::hash(bytes);
        tracing::debug!(
            class = %name,
            loader = %self.owner,
            len = bytes.len(),
            checksum,
            "defined class"
        );
        self.defined.insert(
            name.to_string(),
            DefinedClass {
                class: class.clone(),
                checksum,
            },
        );
        Ok(class)
    }

    /// Class defined by this loader (parents are not consulted)
    pub fn find_class(&self, name: &str) -> Option<ClassRef> {
        self.defined.get(name).map(|entry| entry.class.clone())
    }

    /// Checksum of the bytes that defined `name`
    pub fn checksum(&self, name: &str) -> Option<u32> {
        self.defined.get(name).map(|entry| entry.checksum)
    }

    /// Number of classes defined by this loader
    pub fn defined_count(&self) -> usize {
        self.defined.len()
    }
}

impl ClassResolver for TypeLoader {
    fn resolve(&self, name: &str) -> Option<ClassRef> {
        self.find_class(name).or_else(|| self.parent.get(name))
    }

    fn as_dyn(&self) -> &dyn ClassResolver {
        self
    }
}

fn build_class(
    name: &str,
    file: Arc<ClassFile>,
    superclass: Option<String>,
    interfaces: Vec<String>,
) -> Result<ClassRef, LoadError> {
    let fields = file
        .fields
        .iter()
        .map(|f| {
            Ok(Field {
                name: f.name.clone(),
                ty: JType::from_field_type(&FieldType::parse(&f.descriptor)?),
                element_name: None,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    let mut methods = Vec::with_capacity(file.methods.len());
    for (index, info) in file.methods.iter().enumerate() {
        let descriptor = MethodDescriptor::parse(&info.descriptor)?;
        let params = descriptor.params.iter().map(JType::from_field_type).collect();
        let ret = descriptor
            .ret
            .as_ref()
            .map(JType::from_field_type)
            .unwrap_or(JType::Void);
        let body = if info.code.is_some() {
            MethodBody::Bytecode(Arc::new(LoadedCode::new(file.clone(), index)?))
        } else {
            MethodBody::Abstract
        };
        let is_static = info.access & access::ACC_STATIC != 0;
        methods.push(Method::new(name, &info.name, params, ret, is_static, body)?);
    }

    let mut class = Class::new(name, superclass, interfaces, fields, methods);
    class.set_kind(
        file.access & access::ACC_INTERFACE != 0,
        file.access & access::ACC_ABSTRACT != 0,
    );
    Ok(Arc::new(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Value;
    use wrapgen_classfile::{version, ClassBuilder, LdcConstant, Opcode};

    fn greeter(name: &str) -> Vec<u8> {
        let mut builder = ClassBuilder::new(
            version::V1_5,
            access::ACC_PUBLIC | access::ACC_SUPER,
            name,
            Some("java/lang/Object"),
            &[],
        );
        builder.add_field(0, "greeting", "Ljava/lang/String;", None);
        let init = builder.add_method(access::ACC_PUBLIC, "<init>", "()V", None, &[]);
        {
            let (code, pool) = builder.code(init).unwrap();
            code.var_insn(Opcode::Aload, 0).unwrap();
            code.method_insn(pool, Opcode::Invokespecial, "java/lang/Object", "<init>", "()V", false)
                .unwrap();
            code.var_insn(Opcode::Aload, 0).unwrap();
            code.ldc(pool, &LdcConstant::Str("hello".into())).unwrap();
            code.field_insn(pool, Opcode::Putfield, name, "greeting", "Ljava/lang/String;")
                .unwrap();
            code.insn(Opcode::Return).unwrap();
        }
        let greet = builder.add_method(access::ACC_PUBLIC, "greet", "()Ljava/lang/String;", None, &[]);
        {
            let (code, pool) = builder.code(greet).unwrap();
            code.var_insn(Opcode::Aload, 0).unwrap();
            code.field_insn(pool, Opcode::Getfield, name, "greeting", "Ljava/lang/String;")
                .unwrap();
            code.insn(Opcode::Areturn).unwrap();
        }
        builder.build(true).unwrap().encode()
    }

    fn loader() -> TypeLoader {
        TypeLoader::new("pkg.Owner", Arc::new(ClassRegistry::with_builtins()))
    }

    #[test]
    fn test_define_and_run() {
        let loader = loader();
        let class = loader.define_class("pkg.Greeter", &greeter("pkg/Greeter")).unwrap();
        let instance = loader.instantiate(&class).unwrap();
        let greeting = loader
            .invoke_virtual(&instance, "greet", "()Ljava/lang/String;", &[])
            .unwrap();
        assert_eq!(greeting, Value::str("hello"));
        assert!(loader.checksum("pkg.Greeter").is_some());
    }

    #[test]
    fn test_duplicate_definition() {
        let loader = loader();
        let bytes = greeter("pkg/Greeter");
        let first = loader.define_class("pkg.Greeter", &bytes).unwrap();
        assert!(matches!(
            loader.define_class("pkg.Greeter", &bytes),
            Err(LoadError::DuplicateDefinition(_))
        ));
        assert_eq!(loader.find_class("pkg.Greeter").unwrap().id(), first.id());
        assert_eq!(loader.defined_count(), 1);
    }

    #[test]
    fn test_name_mismatch() {
        let loader = loader();
        let err = loader
            .define_class("pkg.Other", &greeter("pkg/Greeter"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NameMismatch { .. }));
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        let loader = loader();
        let mut bytes = greeter("pkg/Greeter");
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            loader.define_class("pkg.Greeter", &bytes),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn test_find_class_ignores_parent() {
        let loader = loader();
        assert!(loader.find_class("java.lang.Object").is_none());
        assert!(loader.resolve("java.lang.Object").is_some());
    }
}
