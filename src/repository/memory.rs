use super::store::{InstalledPackage, PackageManifest, PackageStore, StoreError, WebappDecl};
use crate::components::{ResolveError, Resolver, Source, SourceKind};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use tracing::info;

/// Resolves URIs against an in-memory map of resources.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    package: String,
    resources: BTreeMap<String, Arc<str>>,
}

impl MemoryResolver {
    pub fn new(package: impl Into<String>, resources: &BTreeMap<String, String>) -> Self {
        Self {
            package: package.into(),
            resources: resources
                .iter()
                .map(|(k, v)| (k.clone(), Arc::from(v.as_str())))
                .collect(),
        }
    }
}

impl Resolver for MemoryResolver {
    fn resolve(&self, uri: &str, kind: SourceKind) -> Result<Source, ResolveError> {
        let text = self.resources.get(uri).ok_or_else(|| ResolveError::NotFound {
            uri: uri.to_string(),
            kind,
        })?;
        Ok(Source {
            uri: uri.to_string(),
            system_id: format!("mem:{}/{uri}", self.package),
            text: Arc::clone(text),
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    packages: BTreeMap<String, PackageManifest>,
    webapps: BTreeMap<String, String>,
}

/// A package store held in memory. Archives are YAML [`PackageManifest`]s.
#[derive(Debug, Default)]
pub struct MemoryStore {
    read_only: bool,
    state: RwLock<MemoryState>,
}

fn package_key(name: &str, version: &str) -> String {
    format!("{name}#{version}")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every write.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            state: RwLock::default(),
        }
    }

    /// Preload a package bound to `context_root`, bypassing the read-only flag.
    pub fn with_webapp(self, manifest: PackageManifest, context_root: &str) -> Self {
        {
            let mut state = self.write();
            let key = package_key(&manifest.name, &manifest.version);
            state.webapps.insert(context_root.to_string(), key.clone());
            state.packages.insert(key, manifest);
        }
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of installed packages.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.read().packages.len()
    }
}

impl PackageStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn install(
        &self,
        archive: &[u8],
        context_root: &str,
        overwrite: bool,
    ) -> Result<InstalledPackage, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let manifest = PackageManifest::from_archive(archive)?;
        if manifest.descriptor.is_none() {
            return Err(StoreError::InvalidArchive(format!(
                "package {} has no webapp descriptor",
                manifest.name
            )));
        }
        let key = package_key(&manifest.name, &manifest.version);
        let mut state = self.write();
        if !overwrite {
            if state.packages.contains_key(&key) {
                return Err(StoreError::AlreadyInstalled {
                    name: manifest.name,
                    version: manifest.version,
                });
            }
            if state.webapps.contains_key(context_root) {
                return Err(StoreError::ContextRootInUse(context_root.to_string()));
            }
        }
        let installed = manifest.installed();
        state.webapps.insert(context_root.to_string(), key.clone());
        state.packages.insert(key, manifest);
        info!(package = %installed.name, version = %installed.version, context_root = %context_root, "Package installed");
        Ok(installed)
    }

    fn remove(&self, context_root: &str) -> Result<InstalledPackage, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        let mut state = self.write();
        let key = state
            .webapps
            .remove(context_root)
            .ok_or_else(|| StoreError::NotFound(format!("webapp {context_root}")))?;
        let still_bound = state.webapps.values().any(|k| k == &key);
        let manifest = if still_bound {
            state.packages.get(&key).cloned()
        } else {
            state.packages.remove(&key)
        };
        manifest
            .map(|m| m.installed())
            .ok_or_else(|| StoreError::NotFound(format!("package {key}")))
    }

    fn webapps(&self) -> Result<Vec<WebappDecl>, StoreError> {
        Ok(self
            .read()
            .webapps
            .iter()
            .map(|(root, key)| WebappDecl {
                context_root: root.clone(),
                package: key.clone(),
                config: BTreeMap::new(),
            })
            .collect())
    }

    fn descriptor(&self, package: &str) -> Result<String, StoreError> {
        self.read()
            .packages
            .get(package)
            .and_then(|m| m.descriptor.clone())
            .ok_or_else(|| StoreError::NotFound(format!("descriptor of {package}")))
    }

    fn resolver(&self, package: &str) -> Result<Arc<dyn Resolver>, StoreError> {
        let state = self.read();
        let manifest = state
            .packages
            .get(package)
            .ok_or_else(|| StoreError::NotFound(format!("package {package}")))?;
        Ok(Arc::new(MemoryResolver::new(package, &manifest.resources)))
    }
}
