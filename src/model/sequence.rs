use super::{Document, Element, Node};
use crate::error::ModelError;
use once_cell::sync::Lazy;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A single value: an atomic value or a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Raw bytes, typically a non-textual request body.
    Binary(Arc<[u8]>),
    Node(Node),
}

impl Item {
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Item::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type label used in logs and error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Item::String(_) => "xs:string",
            Item::Integer(_) => "xs:integer",
            Item::Boolean(_) => "xs:boolean",
            Item::Binary(_) => "xs:base64Binary",
            Item::Node(n) => n.kind_name(),
        }
    }

    /// The string value of the item.
    #[must_use]
    pub fn string_value(&self) -> String {
        match self {
            Item::String(s) => s.clone(),
            Item::Integer(i) => i.to_string(),
            Item::Boolean(b) => b.to_string(),
            Item::Binary(b) => format!("[{} bytes]", b.len()),
            Item::Node(n) => n.string_value(),
        }
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Self {
        Item::String(value.to_string())
    }
}

impl From<String> for Item {
    fn from(value: String) -> Self {
        Item::String(value)
    }
}

impl From<Element> for Item {
    fn from(value: Element) -> Self {
        Item::Node(Node::Element(value))
    }
}

impl From<Document> for Item {
    fn from(value: Document) -> Self {
        Item::Node(Node::Document(value))
    }
}

static EMPTY: Lazy<Sequence> = Lazy::new(|| Sequence {
    items: Arc::from(Vec::<Item>::new()),
});

/// An immutable, ordered sequence of items.
///
/// Cloning is cheap: the items are shared. Every empty sequence handed out by this type is
/// the same shared instance.
#[derive(Clone)]
pub struct Sequence {
    items: Arc<[Item]>,
}

impl Sequence {
    /// The shared empty sequence.
    #[must_use]
    pub fn empty() -> Sequence {
        EMPTY.clone()
    }

    /// Build a sequence from items. Produces the shared empty sequence when there are none.
    pub fn new<I>(items: I) -> Sequence
    where
        I: IntoIterator<Item = Item>,
    {
        let items: Vec<Item> = items.into_iter().collect();
        if items.is_empty() {
            return Sequence::empty();
        }
        Sequence {
            items: Arc::from(items),
        }
    }

    pub fn singleton(item: impl Into<Item>) -> Sequence {
        Sequence {
            items: Arc::from(vec![item.into()]),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// The item at zero-based position `position`, or `None` when out of range.
    #[inline]
    #[must_use]
    pub fn item_at(&self, position: usize) -> Option<&Item> {
        self.items.get(position)
    }

    /// The element at `position`. A document yields its root element.
    ///
    /// Returns `Ok(None)` when the position is out of range, and an error when the item
    /// is an atomic value or a node other than an element or a document.
    pub fn element_at(&self, position: usize) -> Result<Option<Element>, ModelError> {
        match self.items.get(position) {
            None => Ok(None),
            Some(Item::Node(Node::Element(e))) => Ok(Some(e.clone())),
            Some(Item::Node(Node::Document(d))) => d.root_element().map(Some),
            Some(Item::Node(other)) => Err(ModelError::NotAnElement {
                position,
                kind: other.kind_name(),
            }),
            Some(atomic) => Err(ModelError::AtomicValue {
                position,
                value: atomic.string_value(),
            }),
        }
    }

    /// The items from zero-based `start` to the end.
    ///
    /// A negative `start` or one at or past the end yields the empty sequence, and `0`
    /// yields a sequence equal to this one.
    #[must_use]
    pub fn sub_sequence(&self, start: isize) -> Sequence {
        let Ok(start) = usize::try_from(start) else {
            return Sequence::empty();
        };
        if start == 0 {
            return self.clone();
        }
        match self.items.get(start..) {
            Some(rest) if !rest.is_empty() => Sequence {
                items: Arc::from(rest.to_vec()),
            },
            _ => Sequence::empty(),
        }
    }

    /// True when both sequences share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// True when this is the shared empty sequence.
    #[must_use]
    pub fn is_shared_empty(&self) -> bool {
        self.ptr_eq(&EMPTY)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Sequence::empty()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.items[..] == other.items[..]
    }
}

impl Eq for Sequence {}

impl Debug for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl FromIterator<Item> for Sequence {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Sequence::new(iter)
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
