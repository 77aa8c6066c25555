//! # Components
//!
//! A component is one step of a servlet or filter chain: an XSLT stylesheet, function or
//! template, an XQuery function or main module, or an XProc pipeline or step.
//!
//! Servlex does not embed any engine. Engines plug in through two contracts:
//!
//! - [`Processor`] compiles a resolved [`Source`] into an opaque
//!   [`CompiledUnit`](crate::cache::CompiledUnit), evaluates it against the connected input,
//!   and releases per-request resources on cleanup.
//! - [`Resolver`] maps the URIs used in descriptors to sources inside the deployment.
//!
//! [`Component::run`] compiles on first use through the component's compile cell, connects
//! the current payload to the component's [`InputShape`], evaluates it, and returns the
//! next connector. Engine errors are translated: structured dynamic errors become
//! [`ComponentError`](crate::error::ComponentError)s, everything else is a
//! [`TechnicalException`](crate::error::TechnicalException).

mod core;
mod engine;

pub use core::{Component, ComponentKind, InputShape};
pub use engine::{
    CompileRequest, EngineError, EngineErrorKind, NoResolver, Processor, ResolveError, Resolver,
    RunContext, Source, SourceKind,
};
