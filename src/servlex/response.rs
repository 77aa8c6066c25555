use crate::connector::{Connector, ConnectorKind};
use crate::error::{InvocationError, ServlexException};
use crate::model::Sequence;
use serde_json::{json, Value};
use std::sync::Arc;

/// Reason phrase for a status code.
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// What goes back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Empty,
    /// The final sequence of a pipeline, serialized by the host.
    Sequence(Sequence),
    /// Raw bytes from a resource connector.
    Bytes(Arc<[u8]>),
    Json(Value),
    Text(String),
}

/// A response handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body)).with_header("Content-Type", "application/json")
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, ResponseBody::Text(body.into()))
            .with_header("Content-Type", "text/html; charset=utf-8")
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header (case-insensitive name).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The response carried by a pipeline's final connector. Status defaults to 200.
    pub fn from_connector(connector: Connector) -> Self {
        let status = connector.status().unwrap_or(200);
        let headers: Vec<(String, String)> = connector
            .headers()
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        let body = match connector.kind() {
            ConnectorKind::Resource { content_type } => {
                let content_type = content_type.clone();
                let bytes = match connector.payload().item_at(0) {
                    Some(crate::model::Item::Binary(b)) => Arc::clone(b),
                    _ => Arc::from(Vec::new()),
                };
                let mut response = Self::new(status, ResponseBody::Bytes(bytes));
                response.headers = headers;
                if response.header("Content-Type").is_none() {
                    response.headers.push(("Content-Type".to_string(), content_type));
                }
                return response;
            }
            _ => {
                let payload = connector.into_payload();
                if payload.is_empty() {
                    ResponseBody::Empty
                } else {
                    ResponseBody::Sequence(payload)
                }
            }
        };
        Self {
            status,
            headers,
            body,
        }
    }

    /// A JSON error response carrying the exception's status, message and headers.
    pub fn from_exception(err: &ServlexException) -> Self {
        let mut response = Self::json(
            err.status(),
            json!({
                "status": err.status(),
                "error": status_reason(err.status()),
                "message": err.message(),
            }),
        );
        for (name, value) in err.headers() {
            response.headers.push((name.clone(), value.clone()));
        }
        response
    }

    /// The response for an error that reached the boundary. An unhandled component error
    /// is a 500 that still reports its code and message.
    pub fn from_error(err: InvocationError) -> Self {
        match err {
            InvocationError::Component(e) => Self::json(
                500,
                json!({
                    "status": 500,
                    "error": status_reason(500),
                    "message": crate::error::INTERNAL_ERROR_MESSAGE,
                    "code": e.code().lexical(),
                    "code-namespace": e.code().namespace(),
                    "description": e.message(),
                }),
            ),
            other => Self::from_exception(&other.into_servlex()),
        }
    }
}
