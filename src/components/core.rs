use super::engine::{CompileRequest, RunContext, SourceKind};
use crate::auditor::Auditor;
use crate::cache::{CellState, CompileCell, CompiledUnit};
use crate::connector::Connector;
use crate::error::{InvocationError, TechnicalException};
use crate::model::{Item, Node, Sequence};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// The processing-component variants, with the data each one needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ComponentKind {
    /// Apply a whole stylesheet.
    #[serde(rename = "xslt-transform")]
    XsltTransform { stylesheet: String },
    /// Call a function defined in a stylesheet.
    #[serde(rename = "xslt-function", rename_all = "kebab-case")]
    XsltFunction {
        import_uri: String,
        namespace: String,
        local_name: String,
    },
    /// Call a named template defined in a stylesheet.
    #[serde(rename = "xslt-template", rename_all = "kebab-case")]
    XsltTemplate {
        import_uri: String,
        namespace: String,
        local_name: String,
    },
    /// Call a function of an XQuery library module.
    #[serde(rename = "xquery-function", rename_all = "kebab-case")]
    XQueryFunction {
        namespace: String,
        local_name: String,
    },
    /// Evaluate a main XQuery module.
    #[serde(rename = "xquery-module")]
    XQueryModule { uri: String },
    /// Run an XProc pipeline.
    #[serde(rename = "xproc-pipeline")]
    XProcPipeline { uri: String },
    /// Run a step declared in an XProc library.
    #[serde(rename = "xproc-step", rename_all = "kebab-case")]
    XProcStep {
        import_uri: String,
        namespace: String,
        local_name: String,
    },
}

/// The way a component expects its input to be passed. See
/// [`Connector::connect`](crate::connector::Connector::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputShape {
    /// Context item plus the `web:input` parameter.
    Stylesheet,
    /// A private `input` parameter to a stylesheet function or template.
    XsltCall,
    /// The single `input` argument of a query function.
    QueryFunction,
    /// Context item plus the external `web:input` variable.
    QueryModule,
    /// Ports and options of a pipeline or step.
    Pipeline,
}

impl ComponentKind {
    /// Descriptor name of the variant.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            ComponentKind::XsltTransform { .. } => "xslt-transform",
            ComponentKind::XsltFunction { .. } => "xslt-function",
            ComponentKind::XsltTemplate { .. } => "xslt-template",
            ComponentKind::XQueryFunction { .. } => "xquery-function",
            ComponentKind::XQueryModule { .. } => "xquery-module",
            ComponentKind::XProcPipeline { .. } => "xproc-pipeline",
            ComponentKind::XProcStep { .. } => "xproc-step",
        }
    }

    /// URI of the source to compile. Query functions are looked up by module namespace.
    #[must_use]
    pub fn source_uri(&self) -> &str {
        match self {
            ComponentKind::XsltTransform { stylesheet } => stylesheet,
            ComponentKind::XsltFunction { import_uri, .. }
            | ComponentKind::XsltTemplate { import_uri, .. }
            | ComponentKind::XProcStep { import_uri, .. } => import_uri,
            ComponentKind::XQueryFunction { namespace, .. } => namespace,
            ComponentKind::XQueryModule { uri } | ComponentKind::XProcPipeline { uri } => uri,
        }
    }

    #[must_use]
    pub fn source_kind(&self) -> SourceKind {
        match self {
            ComponentKind::XsltTransform { .. }
            | ComponentKind::XsltFunction { .. }
            | ComponentKind::XsltTemplate { .. } => SourceKind::Xslt,
            ComponentKind::XQueryFunction { .. } | ComponentKind::XQueryModule { .. } => {
                SourceKind::XQuery
            }
            ComponentKind::XProcPipeline { .. } | ComponentKind::XProcStep { .. } => {
                SourceKind::XProc
            }
        }
    }

    #[must_use]
    pub fn input_shape(&self) -> InputShape {
        match self {
            ComponentKind::XsltTransform { .. } => InputShape::Stylesheet,
            ComponentKind::XsltFunction { .. } | ComponentKind::XsltTemplate { .. } => {
                InputShape::XsltCall
            }
            ComponentKind::XQueryFunction { .. } => InputShape::QueryFunction,
            ComponentKind::XQueryModule { .. } => InputShape::QueryModule,
            ComponentKind::XProcPipeline { .. } | ComponentKind::XProcStep { .. } => {
                InputShape::Pipeline
            }
        }
    }
}

/// A named processing component of an application.
///
/// Components are immutable once loaded, apart from their compile cell, and are shared by
/// every request of the application.
#[derive(Debug)]
pub struct Component {
    name: Arc<str>,
    kind: ComponentKind,
    cell: Arc<CompileCell>,
}

impl Component {
    pub fn new(name: impl Into<Arc<str>>, kind: ComponentKind, cell: Arc<CompileCell>) -> Self {
        Self {
            name: name.into(),
            kind,
            cell,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    #[must_use]
    pub fn cell(&self) -> &Arc<CompileCell> {
        &self.cell
    }

    /// Invoke the component on the current connector and return the next one.
    ///
    /// Compiles the component on first use, connects the payload to the component's input
    /// shape, evaluates it, and wraps the result. Response metadata already set on the
    /// connector is carried over.
    pub fn run(
        &self,
        connector: Connector,
        ctx: &RunContext<'_>,
        auditor: &Auditor,
    ) -> Result<Connector, InvocationError> {
        auditor.invoke(&self.name);
        let unit = self.compiled(ctx, auditor)?;
        let input = connector.connect(self.kind.input_shape())?;
        let result = ctx
            .processor
            .evaluate(&unit, input, ctx)
            .map_err(|e| e.into_invocation_error(&self.name))?;
        let result = match self.kind {
            ComponentKind::XsltTransform { .. } => document_children(result),
            _ => result,
        };
        Ok(connector.chain(result))
    }

    /// Release the per-request resources of the component. Nothing to do if the component
    /// never compiled.
    pub fn cleanup(&self, ctx: &RunContext<'_>, auditor: &Auditor) -> Result<(), InvocationError> {
        auditor.cleanup(&self.name);
        match self.cell.state() {
            CellState::Ready(unit) => ctx
                .processor
                .cleanup(&unit)
                .map_err(|e| e.into_invocation_error(&self.name)),
            _ => Ok(()),
        }
    }

    /// Log the component's configuration at debug level.
    pub fn log_application(&self) {
        debug!(
            component = %self.name,
            kind = self.kind.kind_name(),
            source = %self.kind.source_uri(),
            cache_state = self.cell.state().name(),
            "Component"
        );
    }

    fn compiled(
        &self,
        ctx: &RunContext<'_>,
        auditor: &Auditor,
    ) -> Result<CompiledUnit, TechnicalException> {
        self.cell.get_or_compile(|| {
            auditor.compilation_starts(&self.name, self.kind.kind_name());
            let started = Instant::now();
            let outcome = self.compile(ctx);
            let elapsed = started.elapsed();
            if elapsed > ctx.slow_compile {
                warn!(
                    component = %self.name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = ctx.slow_compile.as_millis() as u64,
                    "Slow compilation"
                );
            }
            auditor.compilation_stops(&self.name);
            outcome
        })
    }

    fn compile(&self, ctx: &RunContext<'_>) -> Result<CompiledUnit, TechnicalException> {
        let uri = self.kind.source_uri();
        let source = ctx
            .resolver
            .resolve(uri, self.kind.source_kind())
            .map_err(|e| {
                TechnicalException::with_cause(
                    format!("cannot resolve the source of component {}", self.name),
                    e,
                )
            })?;
        let request = CompileRequest {
            component: &self.name,
            kind: &self.kind,
            source: &source,
        };
        ctx.processor.compile(&request).map_err(|e| {
            TechnicalException::with_cause(format!("error compiling component {}", self.name), e)
        })
    }
}

/// A transform result is a document; its children are the result sequence.
fn document_children(result: Sequence) -> Sequence {
    if result.len() != 1 {
        return result;
    }
    match result.item_at(0) {
        Some(Item::Node(Node::Document(doc))) => doc
            .children()
            .iter()
            .cloned()
            .map(Item::Node)
            .collect(),
        _ => result,
    }
}
