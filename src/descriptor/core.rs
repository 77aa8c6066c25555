use crate::cache::ArtifactCache;
use crate::components::{Component, Resolver};
use crate::error::TechnicalException;
use crate::fields::Properties;
use crate::router::Router;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, info};

/// A URI pattern: a regular expression matched against the whole path, plus optional
/// names for its capture groups.
#[derive(Clone)]
pub struct UriPattern {
    source: String,
    regex: Regex,
    group_names: Vec<Option<Arc<str>>>,
}

impl UriPattern {
    /// Compile `pattern`, anchored at both ends.
    ///
    /// # Arguments
    ///
    /// * `pattern` - The regular expression, as written in the descriptor
    /// * `groups` - Names for the capture groups, by position. A missing or `None` entry
    ///   falls back to the group's own `(?P<name>...)` name, if any.
    pub fn new(pattern: &str, groups: &[Option<String>]) -> Result<Self, TechnicalException> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            TechnicalException::with_cause(format!("invalid URI pattern: {pattern}"), e)
        })?;
        let group_count = regex.captures_len() - 1;
        if groups.len() > group_count {
            return Err(TechnicalException::new(format!(
                "pattern {pattern} has {group_count} groups but {} names were given",
                groups.len()
            )));
        }
        let group_names = regex
            .capture_names()
            .skip(1)
            .enumerate()
            .map(|(i, own)| {
                groups
                    .get(i)
                    .and_then(|g| g.as_deref())
                    .or(own)
                    .map(Arc::from)
            })
            .collect();
        Ok(Self {
            source: pattern.to_string(),
            regex,
            group_names,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    #[inline]
    #[must_use]
    pub fn captures<'p>(&self, path: &'p str) -> Option<Captures<'p>> {
        self.regex.captures(path)
    }

    /// Name of the 1-based capture group `index`, if it has one.
    #[must_use]
    pub fn group_name(&self, index: usize) -> Option<&Arc<str>> {
        index
            .checked_sub(1)
            .and_then(|i| self.group_names.get(i))
            .and_then(Option::as_ref)
    }

    /// Replace the match of the pattern in `path` with `rewrite`, where `$1` or `$name`
    /// refer to capture groups.
    #[must_use]
    pub fn rewrite(&self, path: &str, rewrite: &str) -> String {
        self.regex.replace(path, rewrite).into_owned()
    }

    /// Number of capture groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_names.len()
    }
}

impl Debug for UriPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriPattern")
            .field("pattern", &self.source)
            .field("groups", &self.group_names)
            .finish()
    }
}

/// A URI pattern bound to a chain of components.
#[derive(Debug)]
pub struct Servlet {
    pub name: String,
    pub pattern: UriPattern,
    pub chain: Vec<Arc<Component>>,
}

/// A URI pattern whose components wrap every matching servlet.
///
/// Inbound components run before the servlet chain, outbound components after it.
#[derive(Debug)]
pub struct Filter {
    pub name: Option<String>,
    pub pattern: UriPattern,
    pub inbound: Vec<Arc<Component>>,
    pub outbound: Vec<Arc<Component>>,
}

impl Filter {
    /// Display name, falling back to the pattern for anonymous filters.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.pattern.as_str())
    }
}

/// A URI pattern served straight from the package content.
#[derive(Debug)]
pub struct Resource {
    pub pattern: UriPattern,
    /// Replacement turning the matched path into a resource URI. Without one, the path
    /// itself (minus its leading slash) is the URI.
    pub rewrite: Option<String>,
    pub media_type: String,
}

impl Resource {
    /// URI of the resource to serve for `path`.
    #[must_use]
    pub fn target(&self, path: &str) -> String {
        let target = match &self.rewrite {
            Some(rewrite) => self.pattern.rewrite(path, rewrite),
            None => path.to_string(),
        };
        match target.strip_prefix('/') {
            Some(relative) => relative.to_string(),
            None => target,
        }
    }
}

/// A configuration parameter declared by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParam {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: String,
}

/// An installed web application.
///
/// Everything but the webapp-scoped fields and the compile cells is immutable once loaded.
pub struct Application {
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) context_root: String,
    pub(crate) servlets: Vec<Arc<Servlet>>,
    pub(crate) filters: Vec<Arc<Filter>>,
    pub(crate) resources: Vec<Arc<Resource>>,
    pub(crate) components: BTreeMap<String, Arc<Component>>,
    pub(crate) config_params: BTreeMap<String, ConfigParam>,
    pub(crate) properties: Properties,
    pub(crate) cache: ArtifactCache,
    pub(crate) resolver: Arc<dyn Resolver>,
    pub(crate) router: Router,
}

impl Application {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn context_root(&self) -> &str {
        &self.context_root
    }

    /// Servlets, in declaration order.
    #[must_use]
    pub fn servlets(&self) -> &[Arc<Servlet>] {
        &self.servlets
    }

    /// Filters, in declaration order.
    #[must_use]
    pub fn filters(&self) -> &[Arc<Filter>] {
        &self.filters
    }

    /// Resources, in declaration order. They are tried after every servlet.
    #[must_use]
    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Arc<Component>> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Arc<Component>> {
        self.components.values()
    }

    #[must_use]
    pub fn config_param(&self, id: &str) -> Option<&ConfigParam> {
        self.config_params.get(id)
    }

    pub fn config_params(&self) -> impl Iterator<Item = &ConfigParam> {
        self.config_params.values()
    }

    /// Webapp-scoped fields.
    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    #[must_use]
    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Log the application's configuration: a summary at info level, then each servlet,
    /// filter and component at debug level.
    pub fn log_application(&self) {
        info!(
            application = %self.name,
            context_root = %self.context_root,
            servlets = self.servlets.len(),
            filters = self.filters.len(),
            resources = self.resources.len(),
            components = self.components.len(),
            "Application"
        );
        for servlet in &self.servlets {
            debug!(
                servlet = %servlet.name,
                pattern = %servlet.pattern.as_str(),
                chain = ?servlet.chain.iter().map(|c| c.name()).collect::<Vec<_>>(),
                "Servlet"
            );
        }
        for filter in &self.filters {
            debug!(
                filter = %filter.label(),
                pattern = %filter.pattern.as_str(),
                inbound = filter.inbound.len(),
                outbound = filter.outbound.len(),
                "Filter"
            );
        }
        for resource in &self.resources {
            debug!(
                pattern = %resource.pattern.as_str(),
                rewrite = ?resource.rewrite,
                media_type = %resource.media_type,
                "Resource"
            );
        }
        for component in self.components.values() {
            component.log_application();
        }
        for param in self.config_params.values() {
            debug!(param = %param.id, value = %param.value, "Config param");
        }
    }
}

impl Debug for Application {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.name)
            .field("context_root", &self.context_root)
            .field("servlets", &self.servlets.len())
            .field("filters", &self.filters.len())
            .field("resources", &self.resources.len())
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

/// True when `root` is a valid context root: one or more ASCII letters, digits or `-`.
#[must_use]
pub fn is_valid_context_root(root: &str) -> bool {
    !root.is_empty() && root.chars().all(|c| c == '-' || c.is_ascii_alphanumeric())
}
