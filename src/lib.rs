//! # Servlex
//!
//! **Servlex** is a descriptor-driven request router and component pipeline engine for
//! XML-processing web applications. Each installed application declares, in its descriptor,
//! a set of URI patterns bound to chains of processing components (XSLT stylesheets, XQuery
//! functions and modules, XProc pipelines). Servlex routes every incoming request to the
//! first matching servlet, turns the request into a structured `request` document, runs it
//! through the applicable filters and the servlet chain, and returns the final sequence
//! together with any response metadata.
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`model`]** - Processor-neutral data model (items, sequences, documents, elements)
//! - **[`descriptor`]** - Application, servlet, filter descriptors and their YAML loader
//! - **[`router`]** - First-match-wins URI routing with named capture groups
//! - **[`request`]** - Builds the `request` document from an HTTP request
//! - **[`cache`]** - Single-flight compiled-artifact cache
//! - **[`components`]** - Component variants and the processor/resolver contracts
//! - **[`connector`]** - Adapts the current payload to each component's input shape
//! - **[`pipeline`]** - Executes filters and the servlet chain with guaranteed cleanup
//! - **[`error`]** - Component, technical and HTTP-level error types
//! - **[`fields`]** - Request, session, webapp and server scoped fields
//! - **[`repository`]** - Installed webapps, package stores, install/remove/reload
//! - **[`deploy`]** - The deployment upload operation
//! - **[`functions`]** - Extension helpers exposed to components
//! - **[`servlex`]** - The request boundary tying routing and execution together
//! - **[`config`]**, **[`logging`]**, **[`ids`]**, **[`hot_reload`]**, **[`cli`]** - Ambient
//!   configuration, structured logging, request identifiers, repository watching and the CLI
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Servlex as servlex::Servlex
//!     participant Repo as repository::WebRepository
//!     participant Router as router::Router
//!     participant Builder as request::RequestParser
//!     participant Exec as pipeline::PipelineExecutor
//!     participant Comp as components::Component
//!
//!     Client->>Servlex: HttpRequest
//!     Servlex->>Repo: application(context_root)
//!     Servlex->>Router: resolve(path)
//!     Router-->>Servlex: RouteMatch (servlet, bindings, filters)
//!     Servlex->>Builder: parse(request, route)
//!     Builder-->>Servlex: request document + bodies
//!     Servlex->>Exec: execute(plan, connector)
//!     loop filters, servlet chain, outbound filters
//!         Exec->>Comp: run(connector)
//!         Comp-->>Exec: connector
//!     end
//!     Exec->>Comp: cleanup() for every entered component
//!     Exec-->>Servlex: result connector or error
//!     Servlex-->>Client: HttpResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use servlex::{config::ServerConfig, fields::Properties, repository::{DirectoryStore, WebRepository}};
//! use servlex::servlex::Servlex;
//! use std::sync::Arc;
//!
//! let store = Arc::new(DirectoryStore::open("./repo")?);
//! let repo = Arc::new(WebRepository::open(store)?);
//! let servlex = Servlex::new(
//!     ServerConfig::default(),
//!     repo,
//!     Arc::new(MyProcessor::default()),
//!     Arc::new(Properties::server()),
//! );
//! let response = servlex.handle(&request);
//! ```
//!
//! ## Concurrency
//!
//! Requests are handled concurrently. Descriptors and routing tables are immutable once
//! loaded. The only shared mutable state is the compiled-artifact cache (single-flight per
//! component), the field stores, and the installed-webapps map, which is replaced atomically
//! on install, remove and reload.

pub mod auditor;
pub mod cache;
pub mod cli;
pub mod components;
pub mod config;
pub mod connector;
pub mod deploy;
pub mod descriptor;
pub mod error;
pub mod fields;
pub mod functions;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod repository;
pub mod request;
pub mod router;
pub mod servlex;
#[cfg(test)]
mod test_support;

pub use error::{ComponentError, InvocationError, ServlexException, TechnicalException};
pub use model::{Item, Sequence};
pub use router::Router;
