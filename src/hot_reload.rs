//! # Hot Reload Module
//!
//! Reloads the deployed webapps when the repository directory changes, without restarting
//! the server.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use servlex::hot_reload::watch_repository;
//!
//! let watcher = watch_repository("./repo", Arc::clone(&repo), |roots| {
//!     println!("Reloaded {} webapps", roots.len());
//! })?;
//!
//! // Keep watcher alive
//! std::mem::forget(watcher);
//! ```
//!
//! ## Reload Process
//!
//! When a file under the repository is created, modified or removed:
//!
//! 1. **Detection** - the filesystem watcher reports the event
//! 2. **Reload** - every descriptor is loaded again into a fresh webapp set
//! 3. **Swap** - the new set replaces the old one atomically
//! 4. **Hook** - the callback receives the new context roots
//!
//! Requests already running keep the applications they started with.
//!
//! ## Error Handling
//!
//! If any descriptor fails to load, the error is logged, the previous set stays active and
//! the callback is not called. Saving a half-edited descriptor never takes the server down.

use crate::repository::WebRepository;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Whether a watcher event should trigger a reload.
#[must_use]
pub fn is_reload_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Watch a repository directory and reload `repo` when it changes.
///
/// The returned watcher stops when dropped.
pub fn watch_repository<P, F>(
    dir: P,
    repo: Arc<WebRepository>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&[String]) + Send + 'static,
{
    let path: PathBuf = dir.as_ref().to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if is_reload_event(&event.kind) => match repo.reload() {
                Ok(roots) => {
                    info!(
                        webapps = roots.len(),
                        paths = ?event.paths,
                        "hot-reload: webapps reloaded"
                    );
                    on_reload(&roots);
                }
                Err(e) => warn!(error = %e, "hot-reload: reload failed, previous webapps kept"),
            },
            Ok(_) => {}
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::Recursive)?;
    info!(path = %path.display(), "hot-reload: watching repository");
    Ok(watcher)
}
