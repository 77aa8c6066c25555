use super::{Attribute, Document, Element, Node, QName};
use crate::error::TechnicalException;

/// Streaming construction of an element tree.
///
/// Element names are local names; the builder decides their namespace. Attributes must be
/// emitted right after [`TreeBuilder::start_elem`], before any content.
pub trait TreeBuilder {
    fn start_elem(&mut self, local: &str) -> Result<(), TechnicalException>;

    fn attribute(&mut self, local: &str, value: &str) -> Result<(), TechnicalException>;

    /// Marks the end of the attributes of the current element.
    fn start_content(&mut self) -> Result<(), TechnicalException>;

    fn characters(&mut self, value: &str) -> Result<(), TechnicalException>;

    fn end_elem(&mut self) -> Result<(), TechnicalException>;

    /// An element with no attributes and a single text child.
    fn text_elem(&mut self, local: &str, value: &str) -> Result<(), TechnicalException> {
        self.start_elem(local)?;
        self.start_content()?;
        self.characters(value)?;
        self.end_elem()
    }
}

struct OpenElement {
    name: QName,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    in_content: bool,
}

/// A [`TreeBuilder`] producing an immutable [`Document`], with all elements in one namespace.
pub struct DocumentBuilder {
    namespace: String,
    prefix: Option<String>,
    base_uri: Option<String>,
    stack: Vec<OpenElement>,
    root: Option<Element>,
}

impl DocumentBuilder {
    pub fn new(namespace: impl Into<String>, prefix: Option<&str>) -> Self {
        Self {
            namespace: namespace.into(),
            prefix: prefix.map(str::to_string),
            base_uri: None,
            stack: Vec::new(),
            root: None,
        }
    }

    #[must_use]
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    fn element_name(&self, local: &str) -> QName {
        match &self.prefix {
            Some(p) => QName::with_prefix(self.namespace.clone(), local, p.clone()),
            None => QName::new(self.namespace.clone(), local),
        }
    }

    fn current(&mut self, event: &str) -> Result<&mut OpenElement, TechnicalException> {
        self.stack
            .last_mut()
            .ok_or_else(|| TechnicalException::new(format!("{event} outside of any element")))
    }

    /// Finish the tree. Fails if an element is still open or nothing was built.
    pub fn finish(self) -> Result<Document, TechnicalException> {
        if let Some(open) = self.stack.last() {
            return Err(TechnicalException::new(format!(
                "element {} was never closed",
                open.name
            )));
        }
        let root = self
            .root
            .ok_or_else(|| TechnicalException::new("no root element was built"))?;
        Ok(Document::new(self.base_uri, vec![Node::Element(root)]))
    }
}

impl TreeBuilder for DocumentBuilder {
    fn start_elem(&mut self, local: &str) -> Result<(), TechnicalException> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(TechnicalException::new(format!(
                "second root element {local} in document"
            )));
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.in_content = true;
        }
        let name = self.element_name(local);
        self.stack.push(OpenElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            in_content: false,
        });
        Ok(())
    }

    fn attribute(&mut self, local: &str, value: &str) -> Result<(), TechnicalException> {
        let current = self.current("attribute")?;
        if current.in_content {
            return Err(TechnicalException::new(format!(
                "attribute {local} after the content of {} started",
                current.name
            )));
        }
        current
            .attributes
            .push(Attribute::new(QName::local(local), value));
        Ok(())
    }

    fn start_content(&mut self) -> Result<(), TechnicalException> {
        self.current("start of content")?.in_content = true;
        Ok(())
    }

    fn characters(&mut self, value: &str) -> Result<(), TechnicalException> {
        let current = self.current("characters")?;
        current.in_content = true;
        match current.children.last_mut() {
            Some(Node::Text(text)) => text.push_str(value),
            _ => current.children.push(Node::Text(value.to_string())),
        }
        Ok(())
    }

    fn end_elem(&mut self) -> Result<(), TechnicalException> {
        let open = self
            .stack
            .pop()
            .ok_or_else(|| TechnicalException::new("end of element without a start"))?;
        let element = Element::new(
            open.name,
            self.base_uri.clone(),
            open.attributes,
            open.children,
        );
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }
}
