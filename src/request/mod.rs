//! # Request Module
//!
//! Turns an HTTP request into the `request` document components receive.
//!
//! [`HttpRequest`] is the host-neutral view of a request: method, URL, context and servlet
//! paths, multi-valued parameters and headers (order and duplicates preserved), and an
//! optional body. [`RequestParser`] walks it, together with the route selected by the
//! [`Router`](crate::router::Router), and emits the document through the
//! [`TreeBuilder`](crate::model::TreeBuilder) contract. The element and attribute names
//! are an external contract and must not change.
//!
//! Bodies are decoded to items: textual media types (`text/*`, XML, JSON) become strings,
//! anything else stays binary. The body items follow the `request` element in the
//! connector's input sequence.

mod core;
mod parser;

pub use crate::model::TreeBuilder;
pub use core::{authority, HttpRequest, RequestBody};
pub use parser::{build_request_input, build_with, RequestInput, RequestParser};
