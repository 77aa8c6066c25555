//! # Descriptor Module
//!
//! The descriptor declares everything Servlex needs to know about a web application:
//! its name and context root, its components, the servlets binding URI patterns to
//! component chains, the filters wrapping them, and its configuration parameters.
//!
//! ## Descriptor Format
//!
//! Descriptors are YAML documents:
//!
//! ```yaml
//! name: http://example.org/hello
//! title: Hello World
//! context-root: hello
//! config-params:
//!   - id: greeting
//!     value: Hello
//! components:
//!   home:
//!     kind: xquery-function
//!     namespace: http://example.org/hello
//!     local-name: home
//!   layout:
//!     kind: xslt-transform
//!     stylesheet: layout.xsl
//! servlets:
//!   - name: home
//!     pattern: /
//!     chain: [home, layout]
//!   - name: user
//!     pattern: /user/(?P<id>[0-9]+)(/(edit))?
//!     groups: [null, null, action]
//!     chain: [home]
//! filters:
//!   - name: auth
//!     pattern: /user/.*
//!     chain: [check-auth]
//!     outbound: [add-headers]
//! resources:
//!   - pattern: /style/(.+)\.css
//!     rewrite: static/css/$1.css
//!     media-type: text/css
//! ```
//!
//! Patterns are anchored regular expressions matched against the path inside the
//! application. Capture groups are named either by the regex itself or, by position,
//! through `groups`.
//!
//! Resources are tried after every servlet. They answer `GET` only, with the content of
//! the package file named by the rewritten path.
//!
//! Loading is all-or-nothing: any unknown component reference, invalid pattern or invalid
//! context root fails the whole descriptor. Once loaded, an [`Application`] is immutable
//! apart from its webapp-scoped fields and its compile cells.

mod core;
mod load;

pub use core::{
    is_valid_context_root, Application, ConfigParam, Filter, Resource, Servlet, UriPattern,
};
pub use load::{load_descriptor, load_descriptor_str, LoadOptions};
