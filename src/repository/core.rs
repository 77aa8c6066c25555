use super::store::{PackageStore, StoreError, WebappDecl};
use crate::descriptor::{is_valid_context_root, load_descriptor_str, Application, LoadOptions};
use crate::error::{ServlexException, TechnicalException};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{error, info, warn};

type AppMap = HashMap<String, Arc<Application>>;

/// Failure of an install or remove operation.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("The repository is read-only, it does not support installing webapps")]
    ReadOnly,
    #[error("Package is already installed: {name} / {version}")]
    AlreadyInstalled { name: String, version: String },
    #[error("Context root is not valid: {0}")]
    InvalidContextRoot(String),
    #[error("Context root is already in use: {0}")]
    ContextRootInUse(String),
    #[error("Invalid package: {0}")]
    InvalidPackage(String),
    #[error("Webapp not found: {0}")]
    NotFound(String),
    #[error("Error installing the webapp: {0}")]
    Failed(String),
}

impl InstallError {
    /// HTTP status reported by the deployment interface.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            InstallError::ReadOnly => 501,
            InstallError::AlreadyInstalled { .. } | InstallError::ContextRootInUse(_) => 409,
            InstallError::InvalidContextRoot(_) | InstallError::InvalidPackage(_) => 400,
            InstallError::NotFound(_) => 404,
            InstallError::Failed(_) => 500,
        }
    }

    #[must_use]
    pub fn into_servlex(self) -> ServlexException {
        ServlexException::new(self.status(), self.to_string())
    }
}

impl From<StoreError> for InstallError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ReadOnly => InstallError::ReadOnly,
            StoreError::AlreadyInstalled { name, version } => {
                InstallError::AlreadyInstalled { name, version }
            }
            StoreError::ContextRootInUse(root) => InstallError::ContextRootInUse(root),
            StoreError::NotFound(what) => InstallError::NotFound(what),
            StoreError::InvalidArchive(reason) => InstallError::InvalidPackage(reason),
            io @ StoreError::Io { .. } => InstallError::Failed(io.to_string()),
        }
    }
}

/// The set of deployed web applications, backed by a [`PackageStore`].
///
/// Readers get the current set without locking. Install, remove and reload build a new
/// set and swap it in, so a request always sees one consistent set. Writers are
/// serialized among themselves.
pub struct WebRepository {
    store: Arc<dyn PackageStore>,
    apps: ArcSwap<AppMap>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for WebRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebRepository")
            .field("location", &self.store.location())
            .field("context_roots", &self.context_roots())
            .finish()
    }
}

impl WebRepository {
    /// Open the repository and load every deployed webapp.
    ///
    /// Fails if any descriptor is invalid.
    pub fn open(store: Arc<dyn PackageStore>) -> Result<Self, TechnicalException> {
        let apps = load_all(store.as_ref())?;
        info!(
            location = %store.location(),
            webapps = apps.len(),
            read_only = store.is_read_only(),
            "Web repository opened"
        );
        Ok(Self {
            store,
            apps: ArcSwap::from_pointee(apps),
            write_lock: Mutex::new(()),
        })
    }

    /// Reload every webapp from the store.
    ///
    /// On failure the previous set stays in place. Returns the new context roots.
    pub fn reload(&self) -> Result<Vec<String>, TechnicalException> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match load_all(self.store.as_ref()) {
            Ok(apps) => {
                self.apps.store(Arc::new(apps));
                let roots = self.context_roots();
                info!(webapps = ?roots, "Web repository reloaded");
                Ok(roots)
            }
            Err(e) => {
                warn!(error = %e, "Reload failed, keeping the previous webapps");
                Err(e)
            }
        }
    }

    /// The webapp deployed at `context_root`.
    #[must_use]
    pub fn application(&self, context_root: &str) -> Option<Arc<Application>> {
        self.apps.load().get(context_root).map(Arc::clone)
    }

    /// Deployed context roots, sorted.
    #[must_use]
    pub fn context_roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = self.apps.load().keys().cloned().collect();
        roots.sort();
        roots
    }

    #[must_use]
    pub fn applications(&self) -> Vec<Arc<Application>> {
        let mut apps: Vec<Arc<Application>> = self.apps.load().values().map(Arc::clone).collect();
        apps.sort_by(|a, b| a.context_root().cmp(b.context_root()));
        apps
    }

    /// Whether this repository accepts installs.
    #[must_use]
    pub fn can_install(&self) -> bool {
        !self.store.is_read_only()
    }

    #[must_use]
    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Install a package archive as a webapp at `context_root`.
    ///
    /// # Returns
    ///
    /// The name of the installed application.
    ///
    /// # Errors
    ///
    /// A conflict (same package name and version, or a context root in use) is reported
    /// without touching the deployed set. A package whose descriptor fails to load is
    /// removed from the store again.
    pub fn install(
        &self,
        archive: &[u8],
        context_root: &str,
        overwrite: bool,
    ) -> Result<String, InstallError> {
        if !is_valid_context_root(context_root) {
            return Err(InstallError::InvalidContextRoot(context_root.to_string()));
        }
        if !self.can_install() {
            return Err(InstallError::ReadOnly);
        }
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let installed = self.store.install(archive, context_root, overwrite)?;

        let decl = self
            .store
            .webapps()?
            .into_iter()
            .find(|d| d.context_root == context_root)
            .ok_or_else(|| InstallError::Failed(format!("{context_root} missing after install")))?;
        let app = match load_webapp(self.store.as_ref(), &decl) {
            Ok(app) => app,
            Err(e) => {
                error!(package = %installed.name, error = %e, "Installed package is not a valid webapp");
                if let Err(rollback) = self.store.remove(context_root) {
                    error!(error = %rollback, "Rollback of the failed install failed");
                }
                return Err(InstallError::InvalidPackage(e.message().to_string()));
            }
        };
        let name = app.name().to_string();
        let mut apps: AppMap = (**self.apps.load()).clone();
        apps.insert(context_root.to_string(), Arc::new(app));
        self.apps.store(Arc::new(apps));
        info!(
            package = %installed.name,
            version = %installed.version,
            context_root = %context_root,
            "Webapp installed"
        );
        Ok(name)
    }

    /// Remove the webapp at `context_root`.
    pub fn remove(&self, context_root: &str) -> Result<(), InstallError> {
        if !self.can_install() {
            return Err(InstallError::ReadOnly);
        }
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.apps.load().contains_key(context_root) {
            return Err(InstallError::NotFound(context_root.to_string()));
        }
        let removed = self.store.remove(context_root)?;
        let mut apps: AppMap = (**self.apps.load()).clone();
        apps.remove(context_root);
        self.apps.store(Arc::new(apps));
        info!(package = %removed.name, context_root = %context_root, "Webapp removed");
        Ok(())
    }
}

fn load_webapp(store: &dyn PackageStore, decl: &WebappDecl) -> Result<Application, TechnicalException> {
    let descriptor = store
        .descriptor(&decl.package)
        .map_err(|e| TechnicalException::with_cause(format!("cannot read descriptor of {}", decl.package), e))?;
    let resolver = store
        .resolver(&decl.package)
        .map_err(|e| TechnicalException::with_cause(format!("cannot open package {}", decl.package), e))?;
    let mut options = LoadOptions::default()
        .with_context_root(decl.context_root.clone())
        .with_resolver(resolver);
    options.config_overrides = decl.config.clone();
    load_descriptor_str(&descriptor, options)
}

fn load_all(store: &dyn PackageStore) -> Result<AppMap, TechnicalException> {
    let decls = store
        .webapps()
        .map_err(|e| TechnicalException::with_cause("cannot list the deployed webapps", e))?;
    let mut apps = AppMap::with_capacity(decls.len());
    for decl in &decls {
        if apps.contains_key(&decl.context_root) {
            return Err(TechnicalException::new(format!(
                "context root deployed twice: {}",
                decl.context_root
            )));
        }
        let app = load_webapp(store, decl)?;
        app.log_application();
        apps.insert(decl.context_root.clone(), Arc::new(app));
    }
    Ok(apps)
}
