//! Generated-type cache
//!
//! Helper classes are named `<wrapper>_WrapperTypeHelper<n>` and defined in
//! a loader owned by the wrapper type. Versions are probed from 1 upward:
//! a defined class whose signature matches is reused, a mismatching one
//! pushes the probe to the next version, and the first free name is where a
//! new helper gets defined. Records are append-only.

use crate::defaults::HELPER_SUFFIX;
use crate::error::{CodeGenError, CodeGenResult};
use crate::helper::{GeneratedHelper, WrapperHelper};
use crate::runtime::{ClassId, ClassRef, ClassRegistry, TypeLoader};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Helper class name for `wrapper` at `version`; `$` becomes `.`
pub fn helper_class_name(wrapper: &str, version: u32) -> String {
    format!("{}{}{}", wrapper, HELPER_SUFFIX, version).replace('$', ".")
}

/// A helper class defined for a wrapper type
#[derive(Debug, Clone)]
pub struct GeneratedTypeRecord {
    /// Binary class name
    pub name: String,
    /// Version suffix
    pub version: u32,
    /// Signature the helper bridges
    pub signature: String,
    /// Loaded class
    pub class: ClassRef,
    /// crc32 of the defining bytes
    pub checksum: u32,
}

/// Outcome of a cache probe
#[derive(Debug)]
pub enum Probe {
    /// A helper with the requested signature exists
    Hit(Arc<GeneratedHelper>),
    /// No such helper; `name` is the first free version
    Miss {
        /// Free version
        version: u32,
        /// Class name for that version
        name: String,
    },
}

type HelperKey = (ClassId, String);

/// Append-only registry of generated helpers, keyed by wrapper and signature
#[derive(Debug)]
pub struct GeneratedTypeCache {
    registry: Arc<ClassRegistry>,
    loaders: DashMap<ClassId, Arc<TypeLoader>>,
    locks: DashMap<ClassId, Arc<Mutex<()>>>,
    records: DashMap<ClassId, Vec<GeneratedTypeRecord>>,
    helpers: DashMap<HelperKey, Arc<GeneratedHelper>>,
    max_versions: u32,
}

impl GeneratedTypeCache {
    /// Cache whose loaders delegate to `registry`
    pub fn new(registry: Arc<ClassRegistry>, max_versions: u32) -> Self {
        Self {
            registry,
            loaders: DashMap::new(),
            locks: DashMap::new(),
            records: DashMap::new(),
            helpers: DashMap::new(),
            max_versions,
        }
    }

    /// Loader owned by `wrapper`, created on first use
    pub fn loader_for(&self, wrapper: &ClassRef) -> Arc<TypeLoader> {
        self.loaders
            .entry(wrapper.id())
            .or_insert_with(|| Arc::new(TypeLoader::new(wrapper.name(), self.registry.clone())))
            .clone()
    }

    /// Lock serializing probe, emission and definition for `wrapper`
    pub fn lock_for(&self, wrapper: &ClassRef) -> Arc<Mutex<()>> {
        self.locks.entry(wrapper.id()).or_default().clone()
    }

    /// Find a helper for `signature`, or the first free version
    pub fn find_existing(
        &self,
        wrapper: &ClassRef,
        signature: &str,
        part_count: usize,
    ) -> CodeGenResult<Probe> {
        let key = (wrapper.id(), signature.to_string());
        if let Some(helper) = self.helpers.get(&key) {
            return Ok(Probe::Hit(helper.clone()));
        }

        let loader = self.loader_for(wrapper);
        for version in 1..=self.max_versions {
            let name = helper_class_name(wrapper.name(), version);
            let Some(class) = loader.find_class(&name) else {
                return Ok(Probe::Miss { version, name });
            };
            let helper = GeneratedHelper::instantiate(loader.clone(), class.clone(), part_count)?;
            if helper.signature() == signature {
                tracing::debug!(helper = %name, "reusing generated helper");
                let helper = Arc::new(helper);
                self.remember(wrapper, &loader, version, &name, class, &helper);
                return Ok(Probe::Hit(helper));
            }
        }
        Err(CodeGenError::VersionLimit {
            wrapper: wrapper.name().to_string(),
            max: self.max_versions,
        })
    }

    /// Define `bytes` as helper `name` and cache an instance
    pub fn load(
        &self,
        wrapper: &ClassRef,
        name: &str,
        version: u32,
        bytes: &[u8],
        part_count: usize,
    ) -> CodeGenResult<Arc<GeneratedHelper>> {
        let loader = self.loader_for(wrapper);
        let class = loader.define_class(name, bytes)?;
        let helper = Arc::new(GeneratedHelper::instantiate(loader.clone(), class.clone(), part_count)?);
        self.remember(wrapper, &loader, version, name, class, &helper);
        Ok(helper)
    }

    /// Helpers defined for `wrapper`, in definition order
    pub fn records(&self, wrapper: &ClassRef) -> Vec<GeneratedTypeRecord> {
        self.records
            .get(&wrapper.id())
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of cached helper instances
    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    /// Whether nothing has been cached
    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }

    fn remember(
        &self,
        wrapper: &ClassRef,
        loader: &TypeLoader,
        version: u32,
        name: &str,
        class: ClassRef,
        helper: &Arc<GeneratedHelper>,
    ) {
        let signature = helper.signature().to_string();
        let mut records = self.records.entry(wrapper.id()).or_default();
        if !records.iter().any(|r| r.name == name) {
            records.push(GeneratedTypeRecord {
                name: name.to_string(),
                version,
                signature: signature.clone(),
                class,
                checksum: loader.checksum(name).unwrap_or_default(),
            });
        }
        drop(records);
        self.helpers
            .entry((wrapper.id(), signature))
            .or_insert_with(|| helper.clone());
    }
}
