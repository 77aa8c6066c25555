//! # Router Module
//!
//! The router maps a path inside an application to the servlet that handles it, and to the
//! filters that wrap that servlet.
//!
//! ## Overview
//!
//! - Servlet patterns are tried in declaration order; the **first** match wins.
//! - A pattern must match the **whole** path (patterns are anchored when loaded).
//! - Named capture groups become bindings. A group that did not participate in the match
//!   (for instance inside an optional `(...)?`) is omitted, it is never bound to an empty
//!   string.
//! - The path is also split into [`PathSegment`]s: literal text between groups, and the
//!   text matched by each group. The request document's `path` element is built from them.
//! - Resource patterns are tried after every servlet, see [`Router::target`]. No
//!   matching servlet or resource is a 404.
//!
//! ## Example
//!
//! ```rust,ignore
//! use servlex::descriptor::{load_descriptor_str, LoadOptions};
//!
//! let app = load_descriptor_str(yaml, LoadOptions::default())?;
//! let route = app.router().resolve("/user/42")?;
//! assert_eq!(route.servlet.name, "user");
//! assert_eq!(route.binding("id"), Some("42"));
//! ```
//!
//! ## Performance
//!
//! Matching is a linear scan over compiled regexes, O(n) in the number of servlets.
//! Bindings use [`ParamVec`] and stay on the stack for up to eight named groups.

mod core;
#[cfg(test)]
mod tests;

pub use core::{
    match_pattern, ParamVec, PathSegment, RouteMatch, Router, Target, MAX_INLINE_PARAMS,
};
