use super::core::{
    is_valid_context_root, Application, ConfigParam, Filter, Resource, Servlet, UriPattern,
};
use crate::cache::ArtifactCache;
use crate::components::{Component, ComponentKind, NoResolver, Resolver};
use crate::error::TechnicalException;
use crate::fields::Properties;
use crate::router::Router;
use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct DescriptorDoc {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    context_root: Option<String>,
    #[serde(default)]
    config_params: Vec<ConfigParamDoc>,
    #[serde(default)]
    components: BTreeMap<String, ComponentKind>,
    #[serde(default)]
    servlets: Vec<ServletDoc>,
    #[serde(default)]
    filters: Vec<FilterDoc>,
    #[serde(default)]
    resources: Vec<ResourceDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigParamDoc {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServletDoc {
    name: String,
    pattern: String,
    #[serde(default)]
    groups: Vec<Option<String>>,
    chain: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterDoc {
    #[serde(default)]
    name: Option<String>,
    pattern: String,
    #[serde(default)]
    chain: Vec<String>,
    #[serde(default)]
    outbound: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ResourceDoc {
    pattern: String,
    #[serde(default)]
    rewrite: Option<String>,
    media_type: String,
}

/// Deployment-time inputs to descriptor loading.
#[derive(Clone)]
pub struct LoadOptions {
    /// Overrides the context root declared in the descriptor.
    pub context_root: Option<String>,
    /// Resolves component sources inside the deployment.
    pub resolver: Arc<dyn Resolver>,
    /// Values replacing the declared config params, by id.
    pub config_overrides: BTreeMap<String, String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            context_root: None,
            resolver: Arc::new(NoResolver),
            config_overrides: BTreeMap::new(),
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn with_context_root(mut self, root: impl Into<String>) -> Self {
        self.context_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

/// Load a descriptor file from disk.
///
/// # Arguments
///
/// * `path` - Path to the YAML descriptor
/// * `options` - Context root override, resolver and config overrides
///
/// # Errors
///
/// Returns an error if the file cannot be read or the descriptor is invalid.
pub fn load_descriptor<P: AsRef<Path>>(path: P, options: LoadOptions) -> anyhow::Result<Application> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
    let app = load_descriptor_str(&content, options)
        .with_context(|| format!("Invalid descriptor {}", path.display()))?;
    Ok(app)
}

/// Parse and validate a YAML descriptor.
///
/// Unknown component references, invalid patterns, duplicate names and invalid context
/// roots are all load errors.
pub fn load_descriptor_str(yaml: &str, options: LoadOptions) -> Result<Application, TechnicalException> {
    let doc: DescriptorDoc = serde_yaml::from_str(yaml)
        .map_err(|e| TechnicalException::with_cause("cannot parse the descriptor", e))?;

    let context_root = options
        .context_root
        .clone()
        .or(doc.context_root.clone())
        .ok_or_else(|| {
            TechnicalException::new(format!("application {} has no context root", doc.name))
        })?;
    if !is_valid_context_root(&context_root) {
        return Err(TechnicalException::new(format!(
            "invalid context root '{context_root}', must match [-a-zA-Z0-9]+"
        )));
    }

    let cache = ArtifactCache::new();
    let components: BTreeMap<String, Arc<Component>> = doc
        .components
        .into_iter()
        .map(|(name, kind)| {
            let cell = cache.cell(&format!("{context_root}/{name}"));
            let component = Arc::new(Component::new(name.as_str(), kind, cell));
            (name, component)
        })
        .collect();

    let lookup = |owner: &str, names: &[String]| -> Result<Vec<Arc<Component>>, TechnicalException> {
        names
            .iter()
            .map(|n| {
                components.get(n).map(Arc::clone).ok_or_else(|| {
                    TechnicalException::new(format!("{owner} refers to unknown component {n}"))
                })
            })
            .collect()
    };

    let mut seen = HashSet::new();
    let mut servlets = Vec::with_capacity(doc.servlets.len());
    for s in &doc.servlets {
        if !seen.insert(s.name.as_str()) {
            return Err(TechnicalException::new(format!("duplicate servlet name {}", s.name)));
        }
        if s.chain.is_empty() {
            return Err(TechnicalException::new(format!(
                "servlet {} has an empty chain",
                s.name
            )));
        }
        let pattern = UriPattern::new(&s.pattern, &s.groups)?;
        let chain = lookup(&format!("servlet {}", s.name), &s.chain)?;
        servlets.push(Arc::new(Servlet {
            name: s.name.clone(),
            pattern,
            chain,
        }));
    }

    let mut filters = Vec::with_capacity(doc.filters.len());
    for f in &doc.filters {
        let owner = format!("filter {}", f.name.as_deref().unwrap_or(&f.pattern));
        if f.chain.is_empty() && f.outbound.is_empty() {
            return Err(TechnicalException::new(format!("{owner} has no component")));
        }
        filters.push(Arc::new(Filter {
            name: f.name.clone(),
            pattern: UriPattern::new(&f.pattern, &[])?,
            inbound: lookup(&owner, &f.chain)?,
            outbound: lookup(&owner, &f.outbound)?,
        }));
    }

    let resources = doc
        .resources
        .iter()
        .map(|r| {
            Ok(Arc::new(Resource {
                pattern: UriPattern::new(&r.pattern, &[])?,
                rewrite: r.rewrite.clone(),
                media_type: r.media_type.clone(),
            }))
        })
        .collect::<Result<Vec<_>, TechnicalException>>()?;

    let mut config_params: BTreeMap<String, ConfigParam> = doc
        .config_params
        .into_iter()
        .map(|p| {
            (
                p.id.clone(),
                ConfigParam {
                    id: p.id,
                    name: p.name,
                    description: p.description,
                    value: p.value,
                },
            )
        })
        .collect();
    for (id, value) in &options.config_overrides {
        match config_params.get_mut(id) {
            Some(param) => param.value = value.clone(),
            None => warn!(application = %doc.name, param = %id, "Ignoring override of an undeclared config param"),
        }
    }

    let router = Router::new(servlets.clone(), filters.clone()).with_resources(resources.clone());
    info!(
        application = %doc.name,
        context_root = %context_root,
        servlets = servlets.len(),
        components = components.len(),
        "Descriptor loaded"
    );

    Ok(Application {
        title: doc.title.unwrap_or_else(|| doc.name.clone()),
        name: doc.name,
        context_root,
        servlets,
        filters,
        resources,
        components,
        config_params,
        properties: Properties::new(),
        cache,
        resolver: options.resolver,
        router,
    })
}
