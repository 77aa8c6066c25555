//! # Connector Module
//!
//! A [`Connector`] carries the current payload between the steps of a chain, along with the
//! response metadata (status code and headers) accumulated so far.
//!
//! ## Kinds
//!
//! - **Request** - the first connector of a chain. Its payload is the `request` element
//!   followed by the decoded bodies, and it also exposes the request document.
//! - **Sequence** - the output of a previous component.
//! - **Error** - a [`ComponentError`](crate::error::ComponentError) being handed to an
//!   error-handling pipeline. It only connects to pipelines.
//! - **Resource** - raw content of a static resource route, meant for the response. It
//!   connects to no component.
//!
//! ## Input shapes
//!
//! [`Connector::connect`] maps the payload to an [`EngineInput`] for a given
//! [`InputShape`]:
//!
//! | Shape | Request | Sequence |
//! |---|---|---|
//! | `Stylesheet` | context = request document, `web:input` = payload | context = first item (document or element), `web:input` = payload |
//! | `XsltCall` | private `input` = payload | private `input` = payload |
//! | `QueryFunction` | argument `input` = payload | argument `input` = payload |
//! | `QueryModule` | context = request document, `web:input` = payload | `web:input` = payload |
//! | `Pipeline` | port `source` = payload | port `source` = payload |
//!
//! Any shape that cannot be satisfied yields a 500
//! [`ServlexException`](crate::error::ServlexException).
//!
//! ## Response element
//!
//! Once the whole chain has run, [`Connector::apply_response`] reads a leading
//! `web:response` element: its `status` attribute and `web:header` children become the
//! response metadata, and the items after it become the bodies.

mod core;
#[cfg(test)]
mod tests;

pub use crate::components::InputShape;
pub use core::{Connector, ConnectorKind, EngineInput, HeaderVec, MAX_INLINE_HEADERS};
