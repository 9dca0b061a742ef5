//! Capability discovery
//!
//! Finds the first installed emission library whose API surface the facade
//! can drive. Libraries are installed into a [`LibraryCatalog`] under an
//! identity; discovery walks the configured candidate identities in order.

use super::adapter::Binder;
use super::opcodes::OpcodeTable;
use crate::defaults;
use crate::error::{CodeGenError, CodeGenResult};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use wrapgen_sdk::{NativeLibrary, NativeLibraryRef};

/// Identity reported when no candidate is usable
pub const UNAVAILABLE: &str = "<unavailable>";

// ===== Catalog =====

/// Installed emission libraries, by identity
#[derive(Debug, Default)]
pub struct LibraryCatalog {
    libraries: DashMap<String, NativeLibraryRef>,
}

impl LibraryCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the libraries compiled into this build
    pub fn with_bundled() -> Self {
        let catalog = Self::new();
        #[cfg(feature = "asm")]
        catalog.install(wrapgen_asm::modern());
        #[cfg(feature = "asm-legacy")]
        catalog.install(wrapgen_asm::legacy());
        catalog
    }

    /// Install a library under its own identity, replacing any previous one
    pub fn install(&self, library: NativeLibraryRef) {
        self.libraries
            .insert(library.identity().to_string(), library);
    }

    /// Install a library under a different identity (shaded copies)
    pub fn install_as(&self, identity: &str, library: NativeLibraryRef) {
        self.libraries.insert(identity.to_string(), library);
    }

    /// Remove a library
    pub fn uninstall(&self, identity: &str) -> Option<NativeLibraryRef> {
        self.libraries.remove(identity).map(|(_, library)| library)
    }

    /// Library installed under `identity`
    pub fn get(&self, identity: &str) -> Option<NativeLibraryRef> {
        self.libraries.get(identity).map(|entry| entry.clone())
    }

    /// Installed identities
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.libraries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

// ===== Provider =====

/// The discovered emission library, or the unavailable marker
pub struct CapabilityProvider {
    identity: String,
    library: Option<NativeLibraryRef>,
    opcodes: OnceCell<OpcodeTable>,
    binder: Arc<Binder>,
}

impl CapabilityProvider {
    fn found(identity: &str, library: NativeLibraryRef) -> Self {
        Self {
            identity: identity.to_string(),
            library: Some(library),
            opcodes: OnceCell::new(),
            binder: Arc::new(Binder::new()),
        }
    }

    /// Provider standing for "no library"
    pub fn unavailable() -> Self {
        Self {
            identity: UNAVAILABLE.to_string(),
            library: None,
            opcodes: OnceCell::new(),
            binder: Arc::new(Binder::new()),
        }
    }

    /// Identity the library was discovered under
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Whether a library was found
    pub fn is_available(&self) -> bool {
        self.library.is_some()
    }

    /// The library; fails for the unavailable provider
    pub fn library(&self) -> CodeGenResult<&NativeLibraryRef> {
        self.library.as_ref().ok_or(CodeGenError::Unavailable)
    }

    /// Call binder shared by every facade object of this provider
    pub fn binder(&self) -> &Arc<Binder> {
        &self.binder
    }

    /// Opcode table, populated on first use
    pub fn opcodes(&self) -> CodeGenResult<&OpcodeTable> {
        let library = self.library()?;
        self.opcodes
            .get_or_try_init(|| OpcodeTable::populate(library.as_ref()))
    }
}

impl fmt::Debug for CapabilityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("identity", &self.identity)
            .field("available", &self.is_available())
            .finish()
    }
}

// ===== Discovery =====

/// Memoized candidate probe
#[derive(Debug)]
pub struct Discovery {
    candidates: Vec<String>,
    active: RwLock<Option<Arc<CapabilityProvider>>>,
    init: Mutex<()>,
}

impl Discovery {
    /// Probe `candidates` in order
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            active: RwLock::new(None),
            init: Mutex::new(()),
        }
    }

    /// Candidate identities, in probe order
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// The active provider; probes the catalog on first call
    ///
    /// Never fails: when no candidate is usable the unavailable provider is
    /// recorded and returned.
    pub fn acquire(&self, catalog: &LibraryCatalog) -> Arc<CapabilityProvider> {
        if let Some(provider) = self.active.read().as_ref() {
            return provider.clone();
        }

        let _guard = self.init.lock();
        if let Some(provider) = self.active.read().as_ref() {
            return provider.clone();
        }

        let provider = Arc::new(self.probe(catalog));
        *self.active.write() = Some(provider.clone());
        provider
    }

    /// Forget the active provider so the next `acquire` probes again
    pub fn reset(&self) {
        let _guard = self.init.lock();
        *self.active.write() = None;
    }

    fn probe(&self, catalog: &LibraryCatalog) -> CapabilityProvider {
        for identity in &self.candidates {
            let Some(library) = catalog.get(identity) else {
                tracing::debug!(candidate = %identity, "emission library not installed");
                continue;
            };
            match probe_library(library.as_ref()) {
                Ok(()) => {
                    tracing::info!(
                        provider = %identity,
                        version = library.version(),
                        "selected emission library"
                    );
                    return CapabilityProvider::found(identity, library);
                }
                Err(reason) => {
                    tracing::debug!(candidate = %identity, %reason, "emission library rejected");
                }
            }
        }
        tracing::info!(
            candidates = ?self.candidates,
            "no emission library available, helpers will use reflection"
        );
        CapabilityProvider::unavailable()
    }
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new(defaults::CANDIDATES.iter().map(|c| c.to_string()).collect())
    }
}

/// Check that a library exposes the entry type and the companion probe method
pub fn probe_library(library: &dyn NativeLibrary) -> Result<(), String> {
    library
        .resolve_type(defaults::ENTRY_TYPE)
        .ok_or_else(|| format!("missing {}", defaults::ENTRY_TYPE))?;
    let companion = library
        .resolve_type(defaults::COMPANION_TYPE)
        .ok_or_else(|| format!("missing {}", defaults::COMPANION_TYPE))?;
    if !companion.has_instance_method(defaults::COMPANION_METHOD) {
        return Err(format!(
            "{} has no {}",
            defaults::COMPANION_TYPE,
            defaults::COMPANION_METHOD
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrapgen_sdk::NativeTypeRef;

    /// A library that exports nothing
    #[derive(Debug)]
    struct Hollow;

    impl NativeLibrary for Hollow {
        fn identity(&self) -> &str {
            "asm"
        }

        fn version(&self) -> &str {
            "0"
        }

        fn resolve_type(&self, _name: &str) -> Option<NativeTypeRef> {
            None
        }
    }

    fn discovery(candidates: &[&str]) -> Discovery {
        Discovery::new(candidates.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn test_first_candidate_wins() {
        let catalog = LibraryCatalog::new();
        catalog.install(wrapgen_asm::legacy());
        catalog.install(wrapgen_asm::modern());
        let provider = Discovery::default().acquire(&catalog);
        assert_eq!(provider.identity(), "asm");
        assert!(provider.is_available());
    }

    #[test]
    fn test_skips_incompatible_candidate() {
        let catalog = LibraryCatalog::new();
        catalog.install(Arc::new(Hollow));
        catalog.install(wrapgen_asm::legacy());
        let provider = Discovery::default().acquire(&catalog);
        assert_eq!(provider.identity(), "asm-legacy");
    }

    #[test]
    fn test_shaded_identity() {
        let catalog = LibraryCatalog::new();
        catalog.install_as("asm-shaded", wrapgen_asm::modern());
        let provider = Discovery::default().acquire(&catalog);
        assert_eq!(provider.identity(), "asm-shaded");
        assert_eq!(catalog.identities(), vec!["asm-shaded"]);
    }

    #[test]
    fn test_unavailable_is_memoized_until_reset() {
        let catalog = LibraryCatalog::new();
        let discovery = discovery(&["asm"]);
        let first = discovery.acquire(&catalog);
        assert!(!first.is_available());
        assert_eq!(first.identity(), UNAVAILABLE);
        assert!(matches!(first.opcodes(), Err(CodeGenError::Unavailable)));

        catalog.install(wrapgen_asm::modern());
        assert!(!discovery.acquire(&catalog).is_available());

        discovery.reset();
        assert!(discovery.acquire(&catalog).is_available());
    }

    #[test]
    fn test_acquire_returns_shared_provider() {
        let catalog = LibraryCatalog::with_bundled();
        let discovery = Discovery::default();
        let a = discovery.acquire(&catalog);
        let b = discovery.acquire(&catalog);
        assert!(Arc::ptr_eq(&a, &b));
        let table = a.opcodes().unwrap();
        assert!(std::ptr::eq(table, b.opcodes().unwrap()));
    }

    #[test]
    fn test_probe_library_reports_reason() {
        assert_eq!(probe_library(&Hollow).unwrap_err(), "missing ClassWriter");
        assert!(probe_library(wrapgen_asm::modern().as_ref()).is_ok());
    }
}
