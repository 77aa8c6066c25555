//! # Data Model
//!
//! A processor-neutral view of the values exchanged between Servlex and the processing
//! engines: items, sequences of items, and the node tree (documents, elements, attributes,
//! text and comments).
//!
//! ## Overview
//!
//! - [`Item`] is either an atomic value or a [`Node`].
//! - [`Sequence`] is an immutable, ordered collection of items. The empty sequence is a
//!   shared singleton (see [`Sequence::empty`]).
//! - [`Element::elements`] iterates the element children of an element, skipping comments
//!   and whitespace-only text, and failing on anything else (see [`classify_child`]).
//! - [`DocumentBuilder`] implements the [`TreeBuilder`] contract and produces a
//!   [`Document`]. The request document is built through it.
//!
//! All node values are reference counted and immutable, so sequences and documents can be
//! cloned freely and shared across threads.
//!
//! ## Example
//!
//! ```rust
//! use servlex::model::{Item, Sequence};
//!
//! let seq = Sequence::new([Item::from("a"), Item::from("b"), Item::from("c")]);
//! assert_eq!(seq.len(), 3);
//! assert_eq!(seq.sub_sequence(1).len(), 2);
//! assert!(seq.sub_sequence(3).is_empty());
//! assert!(seq.item_at(5).is_none());
//! ```

mod builder;
mod node;
mod qname;
mod sequence;
#[cfg(test)]
mod tests;

pub use builder::{DocumentBuilder, TreeBuilder};
pub use node::{
    classify_child, is_whitespace_only, Attribute, ChildDisposition, Document, Element,
    ElementIter, Node,
};
pub use qname::{QName, PRIVATE_NS, WEBAPP_NS, WEBAPP_PREFIX};
pub use sequence::{Item, Sequence};
