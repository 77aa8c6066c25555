//! # Extension Functions
//!
//! Helpers exposed to components through the processor: repository management, config
//! params, scoped fields and header parsing. A processor adapter binds each of them to a
//! function name in the webapp namespace (`web:installed-webapps`, `web:parse-basic-auth`
//! and so on) and converts arguments and results.
//!
//! Failures are [`ComponentError`]s with a code in the webapp namespace, so applications can
//! catch them like their own errors:
//!
//! | Code | Raised by |
//! |------|-----------|
//! | `web:already-installed` | [`install_webapp`] on a name/version conflict |
//! | `web:invalid-context-root` | [`install_webapp`] |
//! | `web:cannot-install` | [`install_webapp`], [`remove_webapp`] |
//! | `web:not-found` | [`remove_webapp`] |
//! | `web:invalid-param` | [`set_field`] |
//! | `web:unexpected` | [`reload_webapps`] |

use crate::descriptor::Application;
use crate::error::{ComponentError, InvocationError};
use crate::fields::{FieldContext, FieldScope};
use crate::model::{DocumentBuilder, Element, Item, QName, Sequence, TreeBuilder, WEBAPP_NS, WEBAPP_PREFIX};
use crate::repository::{InstallError, WebRepository};
use base64::Engine as _;
use std::sync::Arc;
use tracing::debug;

fn fun_error(code: &str, message: impl Into<String>) -> ComponentError {
    ComponentError::new(QName::web(code), message, Sequence::empty())
}

/// An opaque reference to the web repository, compared by identity.
#[derive(Debug, Clone)]
pub struct RepositoryHandle(Arc<WebRepository>);

impl RepositoryHandle {
    #[must_use]
    pub fn repository(&self) -> &WebRepository {
        &self.0
    }
}

impl PartialEq for RepositoryHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RepositoryHandle {}

/// The server's web repository.
#[must_use]
pub fn repository(repo: &Arc<WebRepository>) -> RepositoryHandle {
    debug!("web:repository()");
    RepositoryHandle(Arc::clone(repo))
}

fn roots_sequence(roots: Vec<String>) -> Sequence {
    roots.into_iter().map(Item::String).collect()
}

/// The context roots of the deployed webapps, sorted.
#[must_use]
pub fn installed_webapps(repo: &WebRepository) -> Sequence {
    debug!(location = %repo.location(), "web:installed-webapps()");
    roots_sequence(repo.context_roots())
}

/// Reload every webapp, returning the new context roots.
pub fn reload_webapps(repo: &WebRepository) -> Result<Sequence, ComponentError> {
    debug!(location = %repo.location(), "web:reload-webapps()");
    let roots = repo.reload().map_err(|e| {
        fun_error("unexpected", "Unexpected error reloading the web repository.").with_cause(e)
    })?;
    Ok(roots_sequence(roots))
}

#[must_use]
pub fn install_enabled(repo: &WebRepository) -> bool {
    repo.can_install()
}

fn install_error(err: InstallError) -> ComponentError {
    let code = match &err {
        InstallError::AlreadyInstalled { .. } => "already-installed",
        InstallError::InvalidContextRoot(_) => "invalid-context-root",
        InstallError::NotFound(_) => "not-found",
        _ => "cannot-install",
    };
    fun_error(code, err.to_string()).with_cause(err)
}

/// Install a package archive at `context_root`, returning the application name.
pub fn install_webapp(
    repo: &WebRepository,
    package: &[u8],
    context_root: &str,
) -> Result<Sequence, ComponentError> {
    debug!(context_root = %context_root, size = package.len(), "web:install-webapp()");
    let name = repo
        .install(package, context_root, false)
        .map_err(install_error)?;
    Ok(Sequence::singleton(name))
}

pub fn remove_webapp(repo: &WebRepository, context_root: &str) -> Result<(), ComponentError> {
    debug!(context_root = %context_root, "web:remove-webapp()");
    repo.remove(context_root).map_err(install_error)
}

/// The value of a config param of the current webapp, or `default` when it is not declared.
#[must_use]
pub fn config_param(app: &Application, id: &str, default: Option<&str>) -> Sequence {
    app.config_param(id)
        .map(|p| p.value.as_str())
        .or(default)
        .map(Sequence::singleton)
        .unwrap_or_default()
}

/// The value of a field, or the empty sequence.
#[must_use]
pub fn get_field(fields: &FieldContext<'_>, scope: FieldScope, key: &str) -> Sequence {
    fields.get(scope, key)
}

/// Store a field, returning the previous value (or the empty sequence).
pub fn set_field(
    fields: &FieldContext<'_>,
    scope: FieldScope,
    key: &str,
    value: Sequence,
) -> Result<Sequence, ComponentError> {
    fields
        .set(scope, key, value)
        .map(Option::unwrap_or_default)
        .map_err(|e| fun_error("invalid-param", e.message().to_string()).with_cause(e))
}

/// The sorted field names of a scope.
#[must_use]
pub fn field_names(fields: &FieldContext<'_>, scope: FieldScope) -> Sequence {
    let keys = match scope {
        FieldScope::Request => fields.request.keys(),
        FieldScope::Session => fields
            .session
            .as_ref()
            .map(|s| s.keys())
            .unwrap_or_default(),
        FieldScope::Webapp => fields.webapp.keys(),
        FieldScope::Server => {
            let mut keys = fields.server.keys();
            keys.sort();
            keys
        }
    };
    keys.into_iter().map(Item::String).collect()
}

/// Parse an `Authorization: Basic` value into a `web:basic-auth` element carrying the
/// `username` and `password` attributes.
pub fn parse_basic_auth(header: &str) -> Result<Element, InvocationError> {
    let encoded = header.trim().strip_prefix("Basic ").ok_or_else(|| {
        ComponentError::unknown("Basic auth string wrong format, does not start with 'Basic '")
    })?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ComponentError::unknown(format!("Basic auth string is not base64: {e}")))?;
    let decoded = String::from_utf8_lossy(&bytes);
    let (username, password) = decoded.split_once(':').ok_or_else(|| {
        ComponentError::unknown("Basic auth string wrong format, does not contain ':'")
    })?;

    let mut b = DocumentBuilder::new(WEBAPP_NS, Some(WEBAPP_PREFIX));
    b.start_elem("basic-auth")?;
    b.attribute("username", username)?;
    b.attribute("password", password)?;
    b.start_content()?;
    b.end_elem()?;
    Ok(b.finish()?.root_element()?)
}

/// Parse a structured header value into a `web:header` element.
///
/// `text/html;q=0.9, application/xml` gives:
///
/// ```text
/// header
///   element @name=text/html
///     param @name=q @value=0.9
///   element @name=application/xml
/// ```
///
/// Elements are separated by commas, parameters by semicolons. Values may be quoted, with
/// backslash escapes.
pub fn parse_header_value(value: &str) -> Result<Element, InvocationError> {
    debug!(value = %value, "web:parse-header-value()");
    let mut b = DocumentBuilder::new(WEBAPP_NS, Some(WEBAPP_PREFIX));
    b.start_elem("header")?;
    b.start_content()?;
    for raw in split_unquoted(value, ',') {
        let mut parts = split_unquoted(raw, ';').into_iter();
        let (name, val) = parts.next().map(name_value).unwrap_or_default();
        if name.is_empty() && val.is_none() {
            continue;
        }
        b.start_elem("element")?;
        b.attribute("name", &name)?;
        if let Some(v) = &val {
            b.attribute("value", v)?;
        }
        b.start_content()?;
        for (pname, pval) in parts.map(name_value).filter(|(n, _)| !n.is_empty()) {
            b.start_elem("param")?;
            b.attribute("name", &pname)?;
            if let Some(v) = &pval {
                b.attribute("value", v)?;
            }
            b.start_content()?;
            b.end_elem()?;
        }
        b.end_elem()?;
    }
    b.end_elem()?;
    Ok(b.finish()?.root_element()?)
}

/// Split on `sep` outside double quotes.
fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if quoted && c == '\\' {
            escaped = true;
        } else if c == '"' {
            quoted = !quoted;
        } else if c == sep && !quoted {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

fn name_value(part: &str) -> (String, Option<String>) {
    match part.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), Some(unquote(value.trim()))),
        None => (part.trim().to_string(), None),
    }
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| value.len() >= 2)
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}
