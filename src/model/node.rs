use super::QName;
use crate::error::ModelError;
use std::sync::Arc;

/// A node of the tree model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document(Document),
    Element(Element),
    Attribute(Attribute),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl Node {
    /// Node kind name, as used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Document(_) => "document",
            Node::Element(_) => "element",
            Node::Attribute(_) => "attribute",
            Node::Text(_) => "text",
            Node::Comment(_) => "comment",
            Node::ProcessingInstruction { .. } => "processing-instruction",
        }
    }

    /// Concatenation of the descendant text nodes (the attribute value for attributes).
    #[must_use]
    pub fn string_value(&self) -> String {
        match self {
            Node::Document(d) => concat_text(d.children()),
            Node::Element(e) => e.string_value(),
            Node::Attribute(a) => a.value.clone(),
            Node::Text(t) | Node::Comment(t) => t.clone(),
            Node::ProcessingInstruction { data, .. } => data.clone(),
        }
    }
}

fn concat_text(children: &[Node]) -> String {
    let mut out = String::new();
    for child in children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => out.push_str(&e.string_value()),
            _ => {}
        }
    }
    out
}

/// An attribute: a name and a string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ElementData {
    name: QName,
    base_uri: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

/// An immutable element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element(Arc<ElementData>);

impl Element {
    pub fn new(
        name: QName,
        base_uri: Option<String>,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
    ) -> Self {
        Self(Arc::new(ElementData {
            name,
            base_uri,
            attributes,
            children,
        }))
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        &self.0.name
    }

    #[must_use]
    pub fn base_uri(&self) -> Option<&str> {
        self.0.base_uri.as_deref()
    }

    pub fn attributes(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.attributes.iter()
    }

    /// Value of the attribute with the given local name in no namespace.
    #[must_use]
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.0
            .attributes
            .iter()
            .find(|a| a.name.namespace().is_empty() && a.name.local_name() == local)
            .map(|a| a.value.as_str())
    }

    /// All child nodes, in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    /// Element children only. See [`classify_child`] for what is skipped and what fails.
    #[must_use]
    pub fn elements(&self) -> ElementIter<'_> {
        ElementIter::new(&self.0.children)
    }

    #[must_use]
    pub fn string_value(&self) -> String {
        concat_text(&self.0.children)
    }

    /// Identity comparison: true when both handles point to the same node.
    #[must_use]
    pub fn same_node(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct DocumentData {
    base_uri: Option<String>,
    children: Vec<Node>,
}

/// An immutable document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document(Arc<DocumentData>);

impl Document {
    pub fn new(base_uri: Option<String>, children: Vec<Node>) -> Self {
        Self(Arc::new(DocumentData { base_uri, children }))
    }

    /// A document whose only child is `root`.
    pub fn with_root(root: Element) -> Self {
        Self::new(root.base_uri().map(str::to_string), vec![Node::Element(root)])
    }

    #[must_use]
    pub fn base_uri(&self) -> Option<&str> {
        self.0.base_uri.as_deref()
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.0.children
    }

    /// The first element child of the document.
    pub fn root_element(&self) -> Result<Element, ModelError> {
        self.0
            .children
            .iter()
            .find_map(|n| match n {
                Node::Element(e) => Some(e.clone()),
                _ => None,
            })
            .ok_or(ModelError::NoRootElement)
    }
}

/// What the element iterator does with a given child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildDisposition {
    Yield,
    Skip,
    Fail(ModelError),
}

/// True when `text` is one or more spaces, tabs or newlines. Carriage returns and the
/// empty string do not count.
#[must_use]
pub fn is_whitespace_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| matches!(c, ' ' | '\t' | '\n'))
}

/// Element children are yielded, comments and whitespace-only text are skipped, any other
/// text or node kind is an error.
#[must_use]
pub fn classify_child(node: &Node) -> ChildDisposition {
    match node {
        Node::Element(_) => ChildDisposition::Yield,
        Node::Comment(_) => ChildDisposition::Skip,
        Node::Text(t) if is_whitespace_only(t) => ChildDisposition::Skip,
        Node::Text(t) => ChildDisposition::Fail(ModelError::UnexpectedText(t.clone())),
        other => ChildDisposition::Fail(ModelError::UnexpectedNode(other.kind_name())),
    }
}

/// Iterator over the element children of an element.
///
/// Yields `Ok` for each element, then a single `Err` at the first offending child, after
/// which it is exhausted. [`ElementIter::restart`] rewinds it to the first child.
#[derive(Debug, Clone)]
pub struct ElementIter<'a> {
    children: &'a [Node],
    pos: usize,
    failed: bool,
}

impl<'a> ElementIter<'a> {
    fn new(children: &'a [Node]) -> Self {
        Self {
            children,
            pos: 0,
            failed: false,
        }
    }

    pub fn restart(&mut self) {
        self.pos = 0;
        self.failed = false;
    }
}

impl Iterator for ElementIter<'_> {
    type Item = Result<Element, ModelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(node) = self.children.get(self.pos) {
            self.pos += 1;
            match classify_child(node) {
                ChildDisposition::Skip => continue,
                ChildDisposition::Yield => {
                    if let Node::Element(e) = node {
                        return Some(Ok(e.clone()));
                    }
                }
                ChildDisposition::Fail(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
