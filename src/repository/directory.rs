use super::store::{InstalledPackage, PackageStore, StoreError, WebappDecl};
use crate::components::{ResolveError, Resolver, Source, SourceKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

/// File name of the deployment list at the root of a [`DirectoryStore`].
pub const WEBAPPS_FILE: &str = "webapps.yaml";
/// File name of the descriptor inside each package directory.
pub const DESCRIPTOR_FILE: &str = "servlex.yaml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct WebappEntry {
    context_root: String,
    package: String,
    #[serde(default)]
    config: BTreeMap<String, String>,
}

/// Resolves relative URIs against a package directory.
#[derive(Debug, Clone)]
pub struct FileResolver {
    base: PathBuf,
}

impl FileResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path_for(&self, uri: &str) -> Option<PathBuf> {
        let relative = Path::new(uri);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, PathComponent::Normal(_) | PathComponent::CurDir));
        if escapes {
            return None;
        }
        Some(self.base.join(relative))
    }
}

impl FileResolver {
    fn read_with<T>(
        &self,
        uri: &str,
        kind: SourceKind,
        read: impl FnOnce(&Path) -> std::io::Result<T>,
    ) -> Result<(PathBuf, T), ResolveError> {
        let path = self.path_for(uri).ok_or_else(|| ResolveError::NotFound {
            uri: uri.to_string(),
            kind,
        })?;
        match read(&path) {
            Ok(content) => Ok((path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ResolveError::NotFound {
                uri: uri.to_string(),
                kind,
            }),
            Err(e) => Err(ResolveError::Unreadable {
                uri: uri.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Resolver for FileResolver {
    fn resolve(&self, uri: &str, kind: SourceKind) -> Result<Source, ResolveError> {
        let (path, text) = self.read_with(uri, kind, |p| fs::read_to_string(p))?;
        Ok(Source {
            uri: uri.to_string(),
            system_id: path.display().to_string(),
            text: Arc::from(text),
        })
    }

    fn resolve_bytes(&self, uri: &str) -> Result<Arc<[u8]>, ResolveError> {
        let (_, bytes) = self.read_with(uri, SourceKind::Resource, |p| fs::read(p))?;
        Ok(Arc::from(bytes))
    }
}

/// A read-only package store laid out on disk:
///
/// ```text
/// <root>/webapps.yaml          # [{context-root, package, config}]
/// <root>/<package>/servlex.yaml
/// <root>/<package>/...          # component sources
/// ```
///
/// Installing or removing through the deployment interface is refused; edit the directory
/// and reload instead.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`. The deployment list must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let list = root.join(WEBAPPS_FILE);
        if !list.is_file() {
            return Err(StoreError::NotFound(list.display().to_string()));
        }
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, package: &str) -> Result<PathBuf, StoreError> {
        FileResolver::new(&self.root)
            .path_for(package)
            .filter(|p| p.is_dir())
            .ok_or_else(|| StoreError::NotFound(format!("package directory {package}")))
    }

    fn read(path: &Path) -> Result<String, StoreError> {
        fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl PackageStore for DirectoryStore {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn install(&self, _: &[u8], _: &str, _: bool) -> Result<InstalledPackage, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn remove(&self, _: &str) -> Result<InstalledPackage, StoreError> {
        Err(StoreError::ReadOnly)
    }

    fn webapps(&self) -> Result<Vec<WebappDecl>, StoreError> {
        let path = self.root.join(WEBAPPS_FILE);
        let text = Self::read(&path)?;
        let entries: Vec<WebappEntry> = serde_yaml::from_str(&text)
            .map_err(|e| StoreError::InvalidArchive(format!("{}: {e}", path.display())))?;
        Ok(entries
            .into_iter()
            .map(|e| WebappDecl {
                context_root: e.context_root,
                package: e.package,
                config: e.config,
            })
            .collect())
    }

    fn descriptor(&self, package: &str) -> Result<String, StoreError> {
        Self::read(&self.package_dir(package)?.join(DESCRIPTOR_FILE))
    }

    fn resolver(&self, package: &str) -> Result<Arc<dyn Resolver>, StoreError> {
        Ok(Arc::new(FileResolver::new(self.package_dir(package)?)))
    }
}
