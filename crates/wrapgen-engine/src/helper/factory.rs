//! Helper factory
//!
//! Entry point for callers: hands out a generated helper when one can be
//! produced and the reflective helper otherwise. Both honor the same
//! contract, so callers never learn which one they got unless they ask.

use super::reflective::ReflectiveWrapperHelper;
use super::resolve::{resolve_accessors, PartDescription};
use super::{WrapperHelperRef, WrapperSpec};
use crate::codegen::CodeGenContext;
use crate::runtime::ClassRef;
use std::sync::Arc;

/// Creates wrapper helpers
#[derive(Debug, Clone)]
pub struct WrapperHelperFactory {
    context: Arc<CodeGenContext>,
}

impl WrapperHelperFactory {
    /// Factory generating through `context`
    pub fn new(context: Arc<CodeGenContext>) -> Self {
        Self { context }
    }

    /// Shared generation context
    pub fn context(&self) -> &Arc<CodeGenContext> {
        &self.context
    }

    /// Helper for `spec`; never fails
    pub fn create_helper(&self, spec: WrapperSpec) -> WrapperHelperRef {
        if let Some(helper) = self.context.synthesize(&spec) {
            return helper;
        }
        tracing::trace!(wrapper = %spec.wrapper.name(), "using reflective helper");
        Arc::new(ReflectiveWrapperHelper::new(self.context.registry().clone(), spec))
    }

    /// Resolve accessors for `parts` on `wrapper`, then create a helper
    pub fn create_for(&self, wrapper: &ClassRef, parts: &[Option<PartDescription>]) -> WrapperHelperRef {
        let spec = resolve_accessors(self.context.registry(), wrapper, parts);
        self.create_helper(spec)
    }
}

impl Default for WrapperHelperFactory {
    fn default() -> Self {
        Self::new(Arc::new(CodeGenContext::with_defaults()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::LibraryCatalog;
    use crate::config::CodeGenConfig;
    use crate::runtime::{ClassRegistry, HostClassBuilder, Value};
    use crate::types::JType;

    fn register_pair(registry: &ClassRegistry) -> ClassRef {
        registry.register(
            HostClassBuilder::new("pkg.Pair")
                .property("left", JType::string())
                .property("right", JType::string())
                .build()
                .unwrap(),
        )
    }

    fn parts(names: &[&str]) -> Vec<Option<PartDescription>> {
        names.iter().map(|n| Some(PartDescription::new(n))).collect()
    }

    #[test]
    fn test_generated_when_available() {
        let factory = WrapperHelperFactory::default();
        let wrapper = register_pair(factory.context().registry());
        let helper = factory.create_for(&wrapper, &parts(&["left", "right"]));
        assert!(helper.is_generated());
        let object = helper
            .create_wrapper_object(&[Value::str("l"), Value::str("r")])
            .unwrap();
        assert_eq!(
            helper.wrapper_parts(&object).unwrap(),
            vec![Value::str("l"), Value::str("r")]
        );
    }

    #[test]
    fn test_reflective_without_libraries() {
        let context = CodeGenContext::new(
            CodeGenConfig::default(),
            Arc::new(ClassRegistry::with_builtins()),
            Arc::new(LibraryCatalog::new()),
        );
        let factory = WrapperHelperFactory::new(Arc::new(context));
        let wrapper = register_pair(factory.context().registry());
        let helper = factory.create_for(&wrapper, &parts(&["left", "right"]));
        assert!(!helper.is_generated());
        assert_eq!(helper.signature(), "2:getLeft/java.lang.String,getRight/java.lang.String,");
    }

    #[test]
    fn test_unsupported_shape_falls_back() {
        let factory = WrapperHelperFactory::default();
        let wrapper = factory.context().registry().register(
            HostClassBuilder::new("pkg.Sealed")
                .read_only_property("id", JType::string())
                .build()
                .unwrap(),
        );
        let helper = factory.create_for(&wrapper, &parts(&["id"]));
        assert!(!helper.is_generated());
        assert!(factory.context().cache().is_empty());
    }
}
