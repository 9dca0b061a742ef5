//! Helpers backed by generated classes

use super::WrapperHelper;
use crate::runtime::{ClassRef, ClassResolver, Fault, FaultResult, TypeLoader, Value};
use std::sync::Arc;

const GET_SIGNATURE: (&str, &str) = ("getSignature", "()Ljava/lang/String;");
const CREATE_WRAPPER_OBJECT: (&str, &str) =
    ("createWrapperObject", "(Ljava/util/List;)Ljava/lang/Object;");
const GET_WRAPPER_PARTS: (&str, &str) = ("getWrapperParts", "(Ljava/lang/Object;)Ljava/util/List;");

/// An instance of a generated helper class
#[derive(Debug)]
pub struct GeneratedHelper {
    loader: Arc<TypeLoader>,
    class: ClassRef,
    instance: Value,
    signature: String,
    part_count: usize,
}

impl GeneratedHelper {
    /// Instantiate `class` and read back its signature
    pub fn instantiate(loader: Arc<TypeLoader>, class: ClassRef, part_count: usize) -> FaultResult<Self> {
        let instance = loader.instantiate(&class)?;
        let (name, descriptor) = GET_SIGNATURE;
        let signature = match loader.invoke_virtual(&instance, name, descriptor, &[])? {
            Value::Str(s) => s.to_string(),
            other => {
                return Err(Fault::ClassCast {
                    expected: crate::defaults::STRING.to_string(),
                    found: other.kind_name(),
                })
            }
        };
        Ok(Self {
            loader,
            class,
            instance,
            signature,
            part_count,
        })
    }

    /// The generated class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Loader that defined the class
    pub fn loader(&self) -> &Arc<TypeLoader> {
        &self.loader
    }
}

impl WrapperHelper for GeneratedHelper {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn create_wrapper_object(&self, parts: &[Value]) -> FaultResult<Value> {
        if parts.len() != self.part_count {
            return Err(Fault::ShapeMismatch {
                expected: self.part_count,
                found: parts.len(),
            });
        }
        let (name, descriptor) = CREATE_WRAPPER_OBJECT;
        self.loader
            .invoke_virtual(&self.instance, name, descriptor, &[Value::list(parts.to_vec())])
    }

    fn wrapper_parts(&self, wrapper: &Value) -> FaultResult<Vec<Value>> {
        let (name, descriptor) = GET_WRAPPER_PARTS;
        let parts = self
            .loader
            .invoke_virtual(&self.instance, name, descriptor, &[wrapper.clone()])?;
        parts.list_items().ok_or_else(|| Fault::ClassCast {
            expected: crate::defaults::LIST.to_string(),
            found: parts.kind_name(),
        })
    }

    fn is_generated(&self) -> bool {
        true
    }
}
