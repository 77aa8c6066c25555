//! # Servlex Module
//!
//! The boundary between the host (an HTTP server, a test, the CLI) and the engine.
//!
//! For each request, [`Servlex`]:
//!
//! 1. splits the path info into the context root and the path inside the webapp
//!    (`/hello/greet/bob` is webapp `hello`, path `/greet/bob`)
//! 2. looks the webapp up in the [`WebRepository`](crate::repository::WebRepository)
//! 3. routes the path to the first matching servlet and collects the matching filters, or
//!    failing that to a static resource, which is served right away (`GET` only)
//! 4. builds the `request` document and the input sequence
//! 5. runs filters and the servlet chain through the
//!    [`PipelineExecutor`](crate::pipeline::PipelineExecutor)
//! 6. reads the status and headers of a leading `web:response` element
//! 7. maps the outcome to an [`HttpResponse`]
//!
//! Errors crossing the boundary are always [`ServlexException`](crate::ServlexException)s.
//! A component error nobody handled becomes a 500 whose JSON body still reports the error
//! code, a technical exception becomes a 500 with a generic message.
//!
//! Each request runs in a `tracing` span carrying its request id (taken from
//! `X-Request-Id` when the caller provides one), the context root and the servlet.

mod core;
mod response;

pub use core::{Servlex, REQUEST_ID_HEADER};
pub use response::{status_reason, HttpResponse, ResponseBody};
