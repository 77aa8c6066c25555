//! Router core module - hot path for request routing.

use crate::descriptor::{Filter, Resource, Servlet, UriPattern};
use crate::error::ServlexException;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of named captures stored inline.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Named capture bindings. Names come from the descriptor and are shared, values are
/// per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One piece of the matched path, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Text of the path outside any capture group.
    Literal(String),
    /// Text captured by a group, with the group's name when it has one.
    Match {
        name: Option<Arc<str>>,
        value: String,
    },
}

/// Result of routing a path.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The first servlet whose pattern matches.
    pub servlet: Arc<Servlet>,
    /// Named groups that participated in the match, in group order.
    pub bindings: ParamVec,
    /// The path split into literal and matched pieces.
    pub segments: Vec<PathSegment>,
    /// Filters whose pattern matches the path, in declaration order.
    pub filters: Vec<Arc<Filter>>,
}

impl RouteMatch {
    /// Value bound to the named group `name`.
    ///
    /// # Arguments
    /// * `name` - The group name (e.g. "id")
    ///
    /// # Returns
    /// The captured text, or `None` if the group is unknown or did not participate
    #[inline]
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What a path resolves to inside an application.
#[derive(Debug, Clone)]
pub enum Target {
    Servlet(RouteMatch),
    Resource(Arc<Resource>),
}

/// Matches paths inside an application against its servlets, in declaration order.
///
/// The routing table is built once per application load and never mutated.
#[derive(Debug, Clone, Default)]
pub struct Router {
    servlets: Vec<Arc<Servlet>>,
    filters: Vec<Arc<Filter>>,
    resources: Vec<Arc<Resource>>,
}

impl Router {
    /// Build a routing table.
    ///
    /// # Arguments
    ///
    /// * `servlets` - Servlets in declaration order. The first match wins.
    /// * `filters` - Filters in declaration order.
    pub fn new(servlets: Vec<Arc<Servlet>>, filters: Vec<Arc<Filter>>) -> Self {
        info!(
            servlets_count = servlets.len(),
            filters_count = filters.len(),
            "Routing table loaded"
        );
        for servlet in &servlets {
            debug!(servlet = %servlet.name, pattern = %servlet.pattern.as_str(), "Registered servlet pattern");
        }
        Self {
            servlets,
            filters,
            resources: Vec::new(),
        }
    }

    /// Add static resources, tried in order after every servlet.
    #[must_use]
    pub fn with_resources(mut self, resources: Vec<Arc<Resource>>) -> Self {
        for resource in &resources {
            debug!(pattern = %resource.pattern.as_str(), media_type = %resource.media_type, "Registered resource pattern");
        }
        self.resources = resources;
        self
    }

    #[must_use]
    pub fn servlets(&self) -> &[Arc<Servlet>] {
        &self.servlets
    }

    /// Route `path` to the first servlet whose pattern matches it entirely.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - The servlet, its bindings, the path segments and the
    ///   applicable filters
    /// * `None` - No servlet matches
    pub fn route(&self, path: &str) -> Option<RouteMatch> {
        for servlet in &self.servlets {
            debug!(servlet = %servlet.name, path = %path, "Trying servlet");
            if let Some((bindings, segments)) = match_pattern(&servlet.pattern, path) {
                info!(servlet = %servlet.name, path = %path, bindings = bindings.len(), "Route matched");
                return Some(RouteMatch {
                    servlet: Arc::clone(servlet),
                    bindings,
                    segments,
                    filters: self.filters_for(path),
                });
            }
        }
        None
    }

    /// Like [`Router::route`], with the no-match case as a 404.
    pub fn resolve(&self, path: &str) -> Result<RouteMatch, ServlexException> {
        self.route(path).ok_or_else(|| {
            warn!(path = %path, servlets_checked = self.servlets.len(), "No servlet matches");
            ServlexException::not_found(format!("Page not found: {path}"))
        })
    }

    /// Resolve `path` to the first matching servlet, or failing that to the first matching
    /// resource. No match at all is a 404.
    pub fn target(&self, path: &str) -> Result<Target, ServlexException> {
        if let Some(route) = self.route(path) {
            return Ok(Target::Servlet(route));
        }
        match self.resources.iter().find(|r| r.pattern.is_match(path)) {
            Some(resource) => {
                info!(pattern = %resource.pattern.as_str(), path = %path, "Resource matched");
                Ok(Target::Resource(Arc::clone(resource)))
            }
            None => {
                warn!(
                    path = %path,
                    servlets_checked = self.servlets.len(),
                    resources_checked = self.resources.len(),
                    "No servlet or resource matches"
                );
                Err(ServlexException::not_found(format!("Page not found: {path}")))
            }
        }
    }

    /// Filters whose pattern matches `path`, in declaration order.
    pub fn filters_for(&self, path: &str) -> Vec<Arc<Filter>> {
        self.filters
            .iter()
            .filter(|f| f.pattern.is_match(path))
            .map(Arc::clone)
            .collect()
    }

    /// Print the routing table to stdout.
    pub fn dump_routes(&self) {
        for servlet in &self.servlets {
            let chain: Vec<&str> = servlet.chain.iter().map(|c| c.name()).collect();
            println!(
                "[servlet] {:<20} {:<40} -> {}",
                servlet.name,
                servlet.pattern.as_str(),
                chain.join(" | ")
            );
        }
        for filter in &self.filters {
            let inbound: Vec<&str> = filter.inbound.iter().map(|c| c.name()).collect();
            let outbound: Vec<&str> = filter.outbound.iter().map(|c| c.name()).collect();
            println!(
                "[filter]  {:<20} {:<40} -> in: {} / out: {}",
                filter.label(),
                filter.pattern.as_str(),
                inbound.join(" | "),
                outbound.join(" | ")
            );
        }
        for resource in &self.resources {
            println!(
                "[resource] {:<19} {:<40} -> {}",
                resource.media_type,
                resource.pattern.as_str(),
                resource.rewrite.as_deref().unwrap_or("<path>")
            );
        }
    }
}

/// Match `path` against `pattern`, producing the bindings and the ordered path segments.
///
/// For each group in order: the text between the previous match end and the group start
/// becomes a literal segment, then the group's text becomes a match segment. Groups that
/// did not participate produce nothing. Trailing text becomes a final literal.
pub fn match_pattern(pattern: &UriPattern, path: &str) -> Option<(ParamVec, Vec<PathSegment>)> {
    let caps = pattern.captures(path)?;
    let mut bindings = ParamVec::new();
    let mut segments = Vec::new();
    let mut last = 0;
    for index in 1..caps.len() {
        let Some(group) = caps.get(index) else {
            continue;
        };
        if last < group.start() {
            segments.push(PathSegment::Literal(path[last..group.start()].to_string()));
        }
        let name = pattern.group_name(index).map(Arc::clone);
        if let Some(n) = &name {
            bindings.push((Arc::clone(n), group.as_str().to_string()));
        }
        segments.push(PathSegment::Match {
            name,
            value: group.as_str().to_string(),
        });
        // a nested group ends inside its parent
        last = last.max(group.end());
    }
    if last < path.len() {
        segments.push(PathSegment::Literal(path[last..].to_string()));
    }
    Some((bindings, segments))
}
