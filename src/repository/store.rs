use crate::components::Resolver;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// A package installed in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub abbrev: Option<String>,
}

/// A webapp deployment: a context root bound to an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebappDecl {
    pub context_root: String,
    /// Store-specific package key, passed back to [`PackageStore::descriptor`] and
    /// [`PackageStore::resolver`].
    pub package: String,
    /// Config param overrides for this deployment.
    pub config: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("the package store is read-only")]
    ReadOnly,
    #[error("Package is already installed: {name} / {version}")]
    AlreadyInstalled { name: String, version: String },
    #[error("context root already in use: {0}")]
    ContextRootInUse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid package archive: {0}")]
    InvalidArchive(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The package layer backing a [`WebRepository`](super::WebRepository).
///
/// Stores are shared across threads. Writes must leave the store unchanged when they fail.
pub trait PackageStore: Send + Sync {
    /// Human-readable location (directory, URL, "memory").
    fn location(&self) -> String;

    fn is_read_only(&self) -> bool;

    /// Install a package archive and bind it to `context_root`.
    ///
    /// Fails with [`StoreError::AlreadyInstalled`] when the same name and version are
    /// present and `overwrite` is false.
    fn install(
        &self,
        archive: &[u8],
        context_root: &str,
        overwrite: bool,
    ) -> Result<InstalledPackage, StoreError>;

    /// Remove the webapp bound to `context_root` and its package.
    fn remove(&self, context_root: &str) -> Result<InstalledPackage, StoreError>;

    /// All webapp deployments.
    fn webapps(&self) -> Result<Vec<WebappDecl>, StoreError>;

    /// The YAML descriptor of a package.
    fn descriptor(&self, package: &str) -> Result<String, StoreError>;

    /// A resolver over the package's resources.
    fn resolver(&self, package: &str) -> Result<Arc<dyn Resolver>, StoreError>;
}

/// The content of a package archive: a YAML manifest carrying the descriptor and the
/// component sources.
///
/// ```yaml
/// name: http://example.org/hello
/// version: 1.0.0
/// abbrev: hello
/// descriptor: |
///   name: http://example.org/hello
///   ...
/// resources:
///   hello.xq: "module namespace h = ..."
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub abbrev: Option<String>,
    #[serde(default)]
    pub descriptor: Option<String>,
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse an uploaded archive.
    pub fn from_archive(archive: &[u8]) -> Result<Self, StoreError> {
        let text = std::str::from_utf8(archive)
            .map_err(|e| StoreError::InvalidArchive(format!("not UTF-8: {e}")))?;
        let manifest: PackageManifest =
            serde_yaml::from_str(text).map_err(|e| StoreError::InvalidArchive(e.to_string()))?;
        if manifest.name.trim().is_empty() || manifest.version.trim().is_empty() {
            return Err(StoreError::InvalidArchive(
                "package name and version are required".to_string(),
            ));
        }
        Ok(manifest)
    }

    #[must_use]
    pub fn installed(&self) -> InstalledPackage {
        InstalledPackage {
            name: self.name.clone(),
            version: self.version.clone(),
            abbrev: self.abbrev.clone(),
        }
    }
}
