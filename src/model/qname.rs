use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Namespace of the webapp vocabulary (request document, extension functions, error codes).
pub const WEBAPP_NS: &str = "http://expath.org/ns/webapp";

/// Prefix conventionally bound to [`WEBAPP_NS`].
pub const WEBAPP_PREFIX: &str = "web";

/// Namespace used for parameters Servlex passes to components internally.
pub const PRIVATE_NS: &str = "http://expath.org/ns/webapp/private";

/// A qualified name: namespace URI, local name and an optional prefix.
///
/// Two names are equal when their namespace and local name are equal; the prefix is only
/// a serialization hint.
#[derive(Debug, Clone, Serialize)]
pub struct QName {
    namespace: String,
    local: String,
    prefix: Option<String>,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(
        namespace: impl Into<String>,
        local: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
            prefix: Some(prefix.into()),
        }
    }

    /// A name in no namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }

    /// A name in the webapp namespace, with the `web` prefix.
    pub fn web(local: impl Into<String>) -> Self {
        Self::with_prefix(WEBAPP_NS, local, WEBAPP_PREFIX)
    }

    /// A name in the private namespace.
    pub fn private(local: impl Into<String>) -> Self {
        Self::new(PRIVATE_NS, local)
    }

    /// `web:ERRUNKNOWN`, used when a component error carries no code.
    pub fn unknown_error() -> Self {
        Self::web("ERRUNKNOWN")
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// `prefix:local` when a prefix is known, the bare local name otherwise.
    #[must_use]
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(p) if !p.is_empty() => format!("{p}:{}", self.local),
            _ => self.local.clone(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local.hash(state);
    }
}

/// Clark notation: `{namespace}local`, or just `local` in no namespace.
impl Display for QName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}
