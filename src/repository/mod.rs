//! # Repository Module
//!
//! Holds the set of deployed web applications and the package stores behind them.
//!
//! A [`WebRepository`] maps context roots to loaded [`Application`](crate::descriptor::Application)s.
//! The map lives behind an `ArcSwap`: request handling reads it without locking, while
//! install, remove and reload build a complete replacement and swap it in at once. A
//! failed reload or a conflicting install leaves the deployed set untouched.
//!
//! ## Stores
//!
//! - [`MemoryStore`] - writable, packages uploaded as YAML [`PackageManifest`] archives
//! - [`DirectoryStore`] - read-only, a `webapps.yaml` deployment list plus one directory
//!   per package holding `servlex.yaml` and the component sources
//!
//! Installing into a read-only store fails with [`InstallError::ReadOnly`], which the
//! deployment interface reports as `501 Not Implemented`.

mod core;
mod directory;
mod memory;
mod store;

pub use core::{InstallError, WebRepository};
pub use directory::{DirectoryStore, FileResolver, DESCRIPTOR_FILE, WEBAPPS_FILE};
pub use memory::{MemoryResolver, MemoryStore};
pub use store::{InstalledPackage, PackageManifest, PackageStore, StoreError, WebappDecl};
