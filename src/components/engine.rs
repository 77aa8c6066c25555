use crate::cache::CompiledUnit;
use crate::connector::EngineInput;
use crate::error::{ComponentError, InvocationError, TechnicalException};
use crate::fields::FieldContext;
use crate::model::{QName, Sequence};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::ComponentKind;

/// The language a component's source is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Xslt,
    XQuery,
    XProc,
    /// A static resource served as is.
    Resource,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SourceKind::Xslt => "xslt",
            SourceKind::XQuery => "xquery",
            SourceKind::XProc => "xproc",
            SourceKind::Resource => "resource",
        })
    }
}

/// A resolved component source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// The URI the component referred to.
    pub uri: String,
    /// Where the source was actually found, used as base URI by engines.
    pub system_id: String,
    pub text: Arc<str>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no {kind} source found for {uri}")]
    NotFound { uri: String, kind: SourceKind },
    #[error("cannot read source {uri}: {reason}")]
    Unreadable { uri: String, reason: String },
}

/// Resolves component source URIs within the deployment's resource space.
pub trait Resolver: Send + Sync {
    fn resolve(&self, uri: &str, kind: SourceKind) -> Result<Source, ResolveError>;

    /// Raw content of a static resource.
    fn resolve_bytes(&self, uri: &str) -> Result<Arc<[u8]>, ResolveError> {
        self.resolve(uri, SourceKind::Resource)
            .map(|source| Arc::from(source.text.as_bytes()))
    }
}

/// A resolver that knows no source at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl Resolver for NoResolver {
    fn resolve(&self, uri: &str, kind: SourceKind) -> Result<Source, ResolveError> {
        Err(ResolveError::NotFound {
            uri: uri.to_string(),
            kind,
        })
    }
}

/// Everything an engine needs to compile one component.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub component: &'a str,
    pub kind: &'a ComponentKind,
    pub source: &'a Source,
}

/// How an engine error should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// A structured error raised by user code (`error()`, `xsl:message terminate`, ...).
    Dynamic,
    /// A static error in the component source.
    Static,
    /// A failure of the engine itself.
    Internal,
}

/// An error reported by a processing engine.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub code: Option<QName>,
    pub message: String,
    pub payload: Option<Sequence>,
}

impl EngineError {
    pub fn dynamic(code: Option<QName>, message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::Dynamic,
            code,
            message: message.into(),
            payload: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::Internal,
            code: None,
            message: message.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Sequence) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Dynamic errors become component errors, keeping their code (or `web:ERRUNKNOWN`)
    /// and payload. Anything else is a technical failure.
    #[must_use]
    pub fn into_invocation_error(self, component: &str) -> InvocationError {
        match self.kind {
            EngineErrorKind::Dynamic => {
                let code = self.code.clone().unwrap_or_else(QName::unknown_error);
                let payload = self.payload.clone().unwrap_or_default();
                let message = self.message.clone();
                ComponentError::new(code, message, payload)
                    .with_cause(self)
                    .into()
            }
            EngineErrorKind::Static | EngineErrorKind::Internal => {
                TechnicalException::with_cause(format!("error evaluating component {component}"), self)
                    .into()
            }
        }
    }
}

/// A processing engine (XSLT, XQuery and XProc).
///
/// Engines are shared by all requests and must be safe to call concurrently.
pub trait Processor: Send + Sync {
    /// Compile a component source. Called at most once per component.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledUnit, EngineError>;

    /// Evaluate a compiled unit against its connected input.
    fn evaluate(
        &self,
        unit: &CompiledUnit,
        input: EngineInput,
        ctx: &RunContext<'_>,
    ) -> Result<Sequence, EngineError>;

    /// Release resources acquired by the current request's evaluations of `unit`.
    fn cleanup(&self, _unit: &CompiledUnit) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Per-request execution context handed to components and engines.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub processor: &'a dyn Processor,
    pub resolver: &'a dyn Resolver,
    pub fields: Option<&'a FieldContext<'a>>,
    /// Compilations longer than this are logged as warnings.
    pub slow_compile: Duration,
}

impl<'a> RunContext<'a> {
    pub fn new(processor: &'a dyn Processor, resolver: &'a dyn Resolver) -> Self {
        Self {
            processor,
            resolver,
            fields: None,
            slow_compile: Duration::from_millis(crate::config::DEFAULT_SLOW_COMPILE_MS),
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: &'a FieldContext<'a>) -> Self {
        self.fields = Some(fields);
        self
    }

    #[must_use]
    pub fn with_slow_compile(mut self, threshold: Duration) -> Self {
        self.slow_compile = threshold;
        self
    }
}
