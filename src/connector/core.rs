use crate::components::InputShape;
use crate::error::{ComponentError, ServlexException};
use crate::model::{Document, Element, Item, Node, QName, Sequence, WEBAPP_NS};
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of response headers stored inline.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Response headers accumulated along a chain.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Name of the main input port of pipelines.
pub const SOURCE_PORT: &str = "source";
/// Port receiving the payload of a component error.
pub const USER_DATA_PORT: &str = "user-data";

/// What a connector carries, beyond its payload.
#[derive(Debug, Clone)]
pub enum ConnectorKind {
    Request { document: Document },
    Sequence,
    Error { error: ComponentError, request: Document },
    Resource { content_type: String },
}

impl ConnectorKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ConnectorKind::Request { .. } => "request",
            ConnectorKind::Sequence => "sequence",
            ConnectorKind::Error { .. } => "error",
            ConnectorKind::Resource { .. } => "resource",
        }
    }
}

/// Input handed to an engine for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineInput {
    /// Context item (global context for queries and stylesheets).
    pub context_item: Option<Item>,
    /// Stylesheet parameters, external variables or function arguments.
    pub params: Vec<(QName, Sequence)>,
    /// Pipeline input ports.
    pub ports: Vec<(String, Sequence)>,
    /// Pipeline options.
    pub options: Vec<(QName, String)>,
}

impl EngineInput {
    #[must_use]
    pub fn param(&self, name: &QName) -> Option<&Sequence> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn port(&self, name: &str) -> Option<&Sequence> {
        self.ports.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[must_use]
    pub fn option(&self, name: &QName) -> Option<&str> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Payload and response metadata passed from one step of a chain to the next.
///
/// A connector is exclusively owned by the request that created it and is consumed by each
/// step.
#[derive(Debug, Clone)]
pub struct Connector {
    kind: ConnectorKind,
    payload: Sequence,
    status: Option<u16>,
    headers: HeaderVec,
}

impl Connector {
    /// The first connector of a chain: `input` is the request element followed by bodies.
    pub fn request(document: Document, input: Sequence) -> Self {
        Self::with_kind(ConnectorKind::Request { document }, input)
    }

    pub fn sequence(payload: Sequence) -> Self {
        Self::with_kind(ConnectorKind::Sequence, payload)
    }

    /// A connector handing `error` to an error-handling pipeline.
    pub fn from_error(error: ComponentError, request: Document) -> Self {
        let payload = error.sequence().clone();
        Self::with_kind(ConnectorKind::Error { error, request }, payload)
    }

    /// Raw content for the response.
    pub fn resource(content: Arc<[u8]>, content_type: impl Into<String>) -> Self {
        Self::with_kind(
            ConnectorKind::Resource {
                content_type: content_type.into(),
            },
            Sequence::singleton(Item::Binary(content)),
        )
    }

    fn with_kind(kind: ConnectorKind, payload: Sequence) -> Self {
        Self {
            kind,
            payload,
            status: None,
            headers: HeaderVec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &ConnectorKind {
        &self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &Sequence {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Sequence {
        self.payload
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set a response header, replacing any previous value (case-insensitive name).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.headers.push((Arc::from(name), value)),
        }
    }

    /// The connector following a component: `result` becomes the payload, response
    /// metadata is kept.
    #[must_use]
    pub fn chain(self, result: Sequence) -> Connector {
        Connector {
            kind: ConnectorKind::Sequence,
            payload: result,
            status: self.status,
            headers: self.headers,
        }
    }

    /// Decode a leading `web:response` element into the status and headers of the
    /// connector. The element is removed from the payload, the bodies following it stay.
    ///
    /// A payload that does not start with a `web:response` element is returned unchanged.
    ///
    /// # Errors
    ///
    /// 500 if the element carries an unknown attribute or child, or a status that is not a
    /// valid HTTP status code.
    pub fn apply_response(mut self) -> Result<Connector, ServlexException> {
        let response = match self.payload.item_at(0) {
            Some(Item::Node(Node::Element(e))) if is_web(e.name(), "response") => e.clone(),
            _ => return Ok(self),
        };
        for attr in response.attributes() {
            if !attr.name.namespace().is_empty() {
                continue;
            }
            match attr.name.local_name() {
                "status" => self.status = Some(parse_status(&attr.value)?),
                "message" => {}
                other => {
                    return Err(ServlexException::internal(format!(
                        "unknown attribute on web:response: {other}"
                    )))
                }
            }
        }
        for child in response.elements() {
            let child = child.map_err(|e| {
                ServlexException::with_cause(500, "invalid content in web:response", e)
            })?;
            let name = child.name();
            if is_web(name, "header") {
                let (name, value) = header_of(&child)?;
                self.set_header(name, value);
            } else if is_web(name, "body") {
                if let Some(content_type) = child.attribute("content-type") {
                    if !self.has_header("Content-Type") {
                        self.set_header("Content-Type", content_type);
                    }
                }
            } else if !is_web(name, "multipart") {
                return Err(ServlexException::internal(format!(
                    "unknown web:response child: {}",
                    name.lexical()
                )));
            }
        }
        self.payload = self.payload.sub_sequence(1);
        Ok(self)
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Map the payload to the input expected by a component of the given shape.
    pub fn connect(&self, shape: InputShape) -> Result<EngineInput, ServlexException> {
        match &self.kind {
            ConnectorKind::Request { document } => Ok(self.connect_request(document, shape)),
            ConnectorKind::Sequence => self.connect_sequence(shape),
            ConnectorKind::Error { error, request } => connect_error(error, request, shape),
            ConnectorKind::Resource { content_type } => Err(ServlexException::internal(format!(
                "cannot connect a resource ({content_type}) to a {shape:?} component"
            ))),
        }
    }

    fn connect_request(&self, document: &Document, shape: InputShape) -> EngineInput {
        let input = self.payload.clone();
        match shape {
            InputShape::Stylesheet | InputShape::QueryModule => EngineInput {
                context_item: Some(Item::from(document.clone())),
                params: vec![(QName::web("input"), input)],
                ..EngineInput::default()
            },
            _ => self.connect_payload(shape),
        }
    }

    fn connect_sequence(&self, shape: InputShape) -> Result<EngineInput, ServlexException> {
        match shape {
            InputShape::Stylesheet => {
                let context = stylesheet_context(&self.payload)?;
                Ok(EngineInput {
                    context_item: Some(context),
                    params: vec![(QName::web("input"), self.payload.clone())],
                    ..EngineInput::default()
                })
            }
            _ => Ok(self.connect_payload(shape)),
        }
    }

    fn connect_payload(&self, shape: InputShape) -> EngineInput {
        let input = self.payload.clone();
        match shape {
            InputShape::XsltCall => EngineInput {
                params: vec![(QName::private("input"), input)],
                ..EngineInput::default()
            },
            InputShape::QueryFunction => EngineInput {
                params: vec![(QName::local("input"), input)],
                ..EngineInput::default()
            },
            InputShape::Stylesheet | InputShape::QueryModule => EngineInput {
                params: vec![(QName::web("input"), input)],
                ..EngineInput::default()
            },
            InputShape::Pipeline => EngineInput {
                ports: vec![(SOURCE_PORT.to_string(), input)],
                ..EngineInput::default()
            },
        }
    }
}

fn is_web(name: &QName, local: &str) -> bool {
    name.namespace() == WEBAPP_NS && name.local_name() == local
}

fn parse_status(value: &str) -> Result<u16, ServlexException> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|s| (100..=999).contains(s))
        .ok_or_else(|| ServlexException::internal(format!("invalid status on web:response: {value}")))
}

fn header_of(header: &Element) -> Result<(&str, &str), ServlexException> {
    let mut name = None;
    let mut value = None;
    for attr in header.attributes() {
        match (attr.name.namespace(), attr.name.local_name()) {
            ("", "name") => name = Some(attr.value.as_str()),
            ("", "value") => value = Some(attr.value.as_str()),
            _ => {
                return Err(ServlexException::internal(format!(
                    "unknown attribute on web:header: {}",
                    attr.name.lexical()
                )))
            }
        }
    }
    match (name, value) {
        (Some(name), Some(value)) => Ok((name, value)),
        _ => Err(ServlexException::internal(
            "web:header needs both a name and a value",
        )),
    }
}

/// The first item of a sequence given to a stylesheet must be a document or an element.
fn stylesheet_context(payload: &Sequence) -> Result<Item, ServlexException> {
    match payload.item_at(0) {
        None => Err(ServlexException::internal(
            "the input sequence to a stylesheet is empty",
        )),
        Some(item @ Item::Node(Node::Document(_) | Node::Element(_))) => Ok(item.clone()),
        Some(Item::Node(other)) => Err(ServlexException::internal(format!(
            "the first item of the input to a stylesheet is a {} node, not a document or element",
            other.kind_name()
        ))),
        Some(atomic) => Err(ServlexException::internal(format!(
            "the first item of the input to a stylesheet is an atomic value ({})",
            atomic.type_name()
        ))),
    }
}

fn connect_error(
    error: &ComponentError,
    request: &Document,
    shape: InputShape,
) -> Result<EngineInput, ServlexException> {
    if shape != InputShape::Pipeline {
        return Err(ServlexException::internal(format!(
            "an error can only be connected to a pipeline, not to a {shape:?} component"
        )));
    }
    let code = error.code();
    let mut ports = vec![(
        SOURCE_PORT.to_string(),
        Sequence::singleton(request.clone()),
    )];
    if !error.sequence().is_empty() {
        ports.push((USER_DATA_PORT.to_string(), error.sequence().clone()));
    }
    Ok(EngineInput {
        context_item: None,
        params: Vec::new(),
        ports,
        options: vec![
            (QName::web("code-name"), code.lexical()),
            (QName::web("code-namespace"), code.namespace().to_string()),
            (QName::web("message"), error.message().to_string()),
        ],
    })
}
