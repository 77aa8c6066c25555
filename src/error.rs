//! # Error Model
//!
//! Three kinds of failure can surface while serving a request:
//!
//! - [`ComponentError`] - a structured, user-domain error raised by a component. It carries a
//!   qualified error code, a message and an optional payload sequence, and can be caught and
//!   handled by error-handling components.
//! - [`TechnicalException`] - an internal failure (I/O, misconfiguration, resolution or
//!   compilation failure). It is never shown verbatim to clients.
//! - [`ServlexException`] - an HTTP-level error with a status code and optional headers
//!   (for instance `Allow` on a 405).
//!
//! [`InvocationError`] is the sum of the three and is what the pipeline propagates. At the
//! request boundary every variant is mapped to an HTTP response by
//! [`InvocationError::into_servlex`].

use crate::model::{QName, Sequence};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Shared error cause. Errors are cloned into every waiter of a failed compilation, so the
/// cause is reference counted.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Message returned to clients in place of any technical failure.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "Internal error, please report this to the administrator (see the server logs for details)";

/// A structured, user-domain error raised by a component.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ComponentError {
    code: QName,
    message: String,
    sequence: Sequence,
    #[source]
    cause: Option<Cause>,
}

impl ComponentError {
    /// Create a component error with an explicit code and payload.
    pub fn new(code: QName, message: impl Into<String>, sequence: Sequence) -> Self {
        Self {
            code,
            message: message.into(),
            sequence,
            cause: None,
        }
    }

    /// Create a component error whose code is not known, using `web:ERRUNKNOWN`.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(QName::unknown_error(), message, Sequence::empty())
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    #[must_use]
    pub fn code(&self) -> &QName {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error payload, possibly the empty sequence.
    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }
}

/// An internal failure. Its message goes to the logs, never to the client.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TechnicalException {
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl TechnicalException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a technical exception wrapping an underlying error.
    pub fn with_cause<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An HTTP-level error: status code, message and extra response headers.
#[derive(Debug, Clone, Error)]
#[error("{status} {message}")]
pub struct ServlexException {
    status: u16,
    message: String,
    headers: Vec<(String, String)>,
    #[source]
    cause: Option<Cause>,
}

impl ServlexException {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
            cause: None,
        }
    }

    pub fn with_cause<E>(status: u16, message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            status,
            message: message.into(),
            headers: Vec::new(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 405 with the `Allow` header listing the accepted methods.
    pub fn method_not_allowed(message: impl Into<String>, allow: &str) -> Self {
        Self::new(405, message).with_header("Allow", allow)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(501, message)
    }

    /// Add a header to send along with the error response.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Any failure raised while invoking a component chain.
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Technical(#[from] TechnicalException),
    #[error(transparent)]
    Servlex(#[from] ServlexException),
}

impl InvocationError {
    /// Map the error to the HTTP-level error returned to the client.
    ///
    /// Component errors that reached the boundary unhandled and technical exceptions both
    /// become a 500. Technical details are replaced by a generic message.
    #[must_use]
    pub fn into_servlex(self) -> ServlexException {
        match self {
            InvocationError::Servlex(e) => e,
            InvocationError::Component(e) => {
                let message = format!("Unhandled component error {}: {}", e.code, e.message);
                ServlexException::with_cause(500, message, e)
            }
            InvocationError::Technical(e) => {
                ServlexException::with_cause(500, INTERNAL_ERROR_MESSAGE, e)
            }
        }
    }

    /// Short label used in structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            InvocationError::Component(_) => "component",
            InvocationError::Technical(_) => "technical",
            InvocationError::Servlex(_) => "http",
        }
    }
}

/// Errors raised by the data model when a value does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("text node with non-whitespace content where only elements are accepted: {0:?}")]
    UnexpectedText(String),
    #[error("{0} node where only elements are accepted")]
    UnexpectedNode(&'static str),
    #[error("item at position {position} is not a node: {value}")]
    AtomicValue { position: usize, value: String },
    #[error("item at position {position} is a {kind} node, not an element or document")]
    NotAnElement { position: usize, kind: &'static str },
    #[error("document has no root element")]
    NoRootElement,
}

impl From<ModelError> for TechnicalException {
    fn from(err: ModelError) -> Self {
        TechnicalException::with_cause("data model error", err)
    }
}

impl From<ModelError> for InvocationError {
    fn from(err: ModelError) -> Self {
        InvocationError::Technical(err.into())
    }
}
