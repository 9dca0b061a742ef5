//! Code generation
//!
//! Discovery picks an emission library, the facade drives it, the
//! synthesizer emits helper classes and the cache defines and reuses them.
//! [`CodeGenContext`] ties these together; any failure inside it is logged
//! and reported as `None` so callers can fall back to reflection.

pub mod adapter;
pub mod cache;
pub mod discovery;
pub mod facade;
pub mod opcodes;
pub mod synthesizer;

pub use cache::{helper_class_name, GeneratedTypeCache, GeneratedTypeRecord, Probe};
pub use discovery::{CapabilityProvider, Discovery, LibraryCatalog};
pub use facade::Emitter;
pub use opcodes::{Op, OpcodeTable};
pub use synthesizer::Synthesizer;

use crate::config::CodeGenConfig;
use crate::error::{CodeGenError, CodeGenResult};
use crate::helper::{GeneratedHelper, WrapperSpec};
use crate::runtime::{ClassRef, ClassRegistry, LoadError};
use std::sync::Arc;

/// Shared state for helper generation
#[derive(Debug)]
pub struct CodeGenContext {
    config: CodeGenConfig,
    registry: Arc<ClassRegistry>,
    catalog: Arc<LibraryCatalog>,
    discovery: Discovery,
    cache: GeneratedTypeCache,
}

impl CodeGenContext {
    /// Context over `registry` probing libraries installed in `catalog`
    pub fn new(config: CodeGenConfig, registry: Arc<ClassRegistry>, catalog: Arc<LibraryCatalog>) -> Self {
        let discovery = Discovery::new(config.candidates.clone());
        let cache = GeneratedTypeCache::new(registry.clone(), config.max_probe_versions);
        Self {
            config,
            registry,
            catalog,
            discovery,
            cache,
        }
    }

    /// Default configuration, builtin classes and bundled libraries
    pub fn with_defaults() -> Self {
        Self::new(
            CodeGenConfig::default(),
            Arc::new(ClassRegistry::with_builtins()),
            Arc::new(LibraryCatalog::with_bundled()),
        )
    }

    /// Active configuration
    pub fn config(&self) -> &CodeGenConfig {
        &self.config
    }

    /// Shared class registry
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Installed emission libraries
    pub fn catalog(&self) -> &Arc<LibraryCatalog> {
        &self.catalog
    }

    /// Generated helper cache
    pub fn cache(&self) -> &GeneratedTypeCache {
        &self.cache
    }

    /// The discovered provider, probing on first use
    pub fn provider(&self) -> Arc<CapabilityProvider> {
        self.discovery.acquire(&self.catalog)
    }

    /// Facade over the discovered provider
    pub fn emitter(&self) -> CodeGenResult<Emitter> {
        Emitter::new(self.provider())
    }

    /// Probe the catalog again on next use
    pub fn reset_discovery(&self) {
        self.discovery.reset();
    }

    /// Generated helper for `spec`, or `None` when generation is off,
    /// no library is available, or the shape cannot be generated
    pub fn synthesize(&self, spec: &WrapperSpec) -> Option<Arc<GeneratedHelper>> {
        match self.try_synthesize(spec) {
            Ok(helper) => Some(helper),
            Err(CodeGenError::Disabled | CodeGenError::Unavailable) => None,
            Err(e) => {
                tracing::debug!(
                    wrapper = %spec.wrapper.name(),
                    error = %e,
                    "helper generation failed, using reflection"
                );
                None
            }
        }
    }

    /// Like [`synthesize`](Self::synthesize) but reports why generation gave up
    pub fn try_synthesize(&self, spec: &WrapperSpec) -> CodeGenResult<Arc<GeneratedHelper>> {
        if !self.config.enabled {
            return Err(CodeGenError::Disabled);
        }
        let emitter = self.emitter()?;

        self.ensure_registered(&spec.wrapper)?;
        if let Some(factory) = &spec.object_factory {
            self.ensure_registered(factory)?;
        }

        let signature = spec.signature();
        let part_count = spec.parts.len();
        let lock = self.cache.lock_for(&spec.wrapper);
        let _guard = lock.lock();

        loop {
            let (version, name) = match self.cache.find_existing(&spec.wrapper, &signature, part_count)? {
                Probe::Hit(helper) => return Ok(helper),
                Probe::Miss { version, name } => (version, name),
            };
            let bytes = Synthesizer::new(&emitter, self.registry.as_ref(), &self.config)
                .emit(spec, &name, &signature)?;
            if let Some(helper) = self.define(spec, &name, version, &bytes, part_count)? {
                tracing::debug!(
                    helper = %name,
                    provider = %emitter.identity(),
                    %signature,
                    "defined generated helper"
                );
                return Ok(helper);
            }
        }
    }

    /// Define `bytes` as helper `name`; `None` when another definer won the
    /// name first, in which case the caller looks it up again and reuses it
    fn define(
        &self,
        spec: &WrapperSpec,
        name: &str,
        version: u32,
        bytes: &[u8],
        part_count: usize,
    ) -> CodeGenResult<Option<Arc<GeneratedHelper>>> {
        match self.cache.load(&spec.wrapper, name, version, bytes, part_count) {
            Ok(helper) => Ok(Some(helper)),
            Err(CodeGenError::Load(LoadError::DuplicateDefinition(_))) => {
                tracing::warn!(helper = %name, "helper defined concurrently, probing again");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Generated code resolves the wrapper by name through the registry
    fn ensure_registered(&self, class: &ClassRef) -> CodeGenResult<()> {
        match self.registry.get(class.name()) {
            Some(existing) if existing.id() == class.id() => Ok(()),
            Some(_) => Err(CodeGenError::Shadowed(class.name().to_string())),
            None => {
                self.registry.register(class.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::{resolve_accessors, PartDescription, WrapperHelper};
    use crate::runtime::{HostClassBuilder, Value};
    use crate::types::JType;

    fn point(registry: &ClassRegistry) -> ClassRef {
        registry.register(
            HostClassBuilder::new("pkg.Point")
                .property("x", JType::int())
                .property("label", JType::string())
                .build()
                .unwrap(),
        )
    }

    fn spec(context: &CodeGenContext, wrapper: &ClassRef, names: &[&str]) -> WrapperSpec {
        let parts: Vec<_> = names.iter().map(|n| Some(PartDescription::new(n))).collect();
        resolve_accessors(context.registry(), wrapper, &parts)
    }

    #[test]
    fn test_synthesize_and_reuse() {
        let context = CodeGenContext::with_defaults();
        let wrapper = point(context.registry());
        let spec = spec(&context, &wrapper, &["x", "label"]);
        let first = context.synthesize(&spec).unwrap();
        let second = context.synthesize(&spec).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.class().name(), "pkg.Point_WrapperTypeHelper1");
        assert_eq!(context.cache().records(&wrapper).len(), 1);

        let object = first
            .create_wrapper_object(&[Value::Int(3), Value::str("p")])
            .unwrap();
        assert_eq!(
            first.wrapper_parts(&object).unwrap(),
            vec![Value::Int(3), Value::str("p")]
        );
    }

    #[test]
    fn test_new_shape_gets_next_version() {
        let context = CodeGenContext::with_defaults();
        let wrapper = point(context.registry());
        let both = context.synthesize(&spec(&context, &wrapper, &["x", "label"])).unwrap();
        let one = context.synthesize(&spec(&context, &wrapper, &["label"])).unwrap();
        assert_eq!(both.class().name(), "pkg.Point_WrapperTypeHelper1");
        assert_eq!(one.class().name(), "pkg.Point_WrapperTypeHelper2");
        assert_eq!(one.signature(), "1:getLabel/java.lang.String,");
    }

    #[test]
    fn test_disabled_returns_none() {
        let config = CodeGenConfig {
            enabled: false,
            ..CodeGenConfig::default()
        };
        let context = CodeGenContext::new(
            config,
            Arc::new(ClassRegistry::with_builtins()),
            Arc::new(LibraryCatalog::with_bundled()),
        );
        let wrapper = point(context.registry());
        let spec = spec(&context, &wrapper, &["x"]);
        assert!(matches!(context.try_synthesize(&spec), Err(CodeGenError::Disabled)));
        assert!(context.synthesize(&spec).is_none());
    }

    #[test]
    fn test_empty_catalog_is_unavailable() {
        let context = CodeGenContext::new(
            CodeGenConfig::default(),
            Arc::new(ClassRegistry::with_builtins()),
            Arc::new(LibraryCatalog::new()),
        );
        assert!(!context.provider().is_available());
        let wrapper = point(context.registry());
        let spec = spec(&context, &wrapper, &["x"]);
        assert!(matches!(context.try_synthesize(&spec), Err(CodeGenError::Unavailable)));
        assert!(context.cache().is_empty());
    }

    #[test]
    fn test_reset_discovery_picks_up_install() {
        let catalog = Arc::new(LibraryCatalog::new());
        let context = CodeGenContext::new(
            CodeGenConfig::default(),
            Arc::new(ClassRegistry::with_builtins()),
            catalog.clone(),
        );
        assert!(!context.provider().is_available());
        catalog.install(wrapgen_asm::legacy());
        assert!(!context.provider().is_available());
        context.reset_discovery();
        assert_eq!(context.provider().identity(), "asm-legacy");
    }

    #[test]
    fn test_unregistered_wrapper_is_registered() {
        let context = CodeGenContext::with_defaults();
        let wrapper = HostClassBuilder::new("pkg.Loose")
            .property("label", JType::string())
            .build()
            .unwrap();
        let spec = spec(&context, &wrapper, &["label"]);
        assert!(context.synthesize(&spec).is_some());
        assert!(context.registry().get("pkg.Loose").is_some());
    }

    #[test]
    fn test_shadowed_wrapper_rejected() {
        let context = CodeGenContext::with_defaults();
        point(context.registry());
        let other = HostClassBuilder::new("pkg.Point")
            .property("label", JType::string())
            .build()
            .unwrap();
        let spec = spec(&context, &other, &["label"]);
        assert!(matches!(context.try_synthesize(&spec), Err(CodeGenError::Shadowed(_))));
    }

    #[test]
    fn test_duplicate_definition_reuses_winner() {
        let context = CodeGenContext::with_defaults();
        let wrapper = point(context.registry());
        let spec = spec(&context, &wrapper, &["x", "label"]);
        let signature = spec.signature();
        let name = match context.cache().find_existing(&wrapper, &signature, 2).unwrap() {
            Probe::Miss { version, name } => {
                assert_eq!(version, 1);
                name
            }
            Probe::Hit(_) => panic!("empty cache hit"),
        };
        let emitter = context.emitter().unwrap();
        let bytes = Synthesizer::new(&emitter, context.registry().as_ref(), context.config())
            .emit(&spec, &name, &signature)
            .unwrap();

        // Another definer takes the name between lookup and load
        let loader = context.cache().loader_for(&wrapper);
        let winner = loader.define_class(&name, &bytes).unwrap();
        assert!(context.define(&spec, &name, 1, &bytes, 2).unwrap().is_none());

        let helper = context.synthesize(&spec).unwrap();
        assert_eq!(helper.class().id(), winner.id());
        assert_eq!(helper.class().name(), "pkg.Point_WrapperTypeHelper1");
        assert_eq!(loader.defined_count(), 1);
        assert_eq!(context.cache().records(&wrapper).len(), 1);
    }
}
