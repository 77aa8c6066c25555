use crate::auditor::Auditor;
use crate::components::{Component, RunContext};
use crate::connector::Connector;
use crate::descriptor::{Filter, Servlet};
use crate::error::{InvocationError, TechnicalException};
use crate::router::RouteMatch;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Which part of the invocation a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRole {
    Inbound,
    Servlet,
    Outbound,
}

/// One component to run, with where it comes from.
#[derive(Debug, Clone)]
pub struct Step {
    pub role: StepRole,
    pub component: Arc<Component>,
}

/// The servlet selected for a request and the filters wrapping it.
#[derive(Debug, Clone)]
pub struct InvocationPlan {
    pub servlet: Arc<Servlet>,
    pub filters: Vec<Arc<Filter>>,
}

impl InvocationPlan {
    pub fn new(servlet: Arc<Servlet>, filters: Vec<Arc<Filter>>) -> Self {
        Self { servlet, filters }
    }

    pub fn from_route(route: &RouteMatch) -> Self {
        Self::new(Arc::clone(&route.servlet), route.filters.clone())
    }

    /// Steps in execution order: inbound components of each filter in declaration order,
    /// then the servlet chain, then outbound components with the last declared filter
    /// first.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        let step = |role| move |c: &Arc<Component>| Step {
            role,
            component: Arc::clone(c),
        };
        let inbound = self
            .filters
            .iter()
            .flat_map(|f| f.inbound.iter().map(step(StepRole::Inbound)));
        let chain = self.servlet.chain.iter().map(step(StepRole::Servlet));
        let outbound = self
            .filters
            .iter()
            .rev()
            .flat_map(|f| f.outbound.iter().map(step(StepRole::Outbound)));
        inbound.chain(chain).chain(outbound).collect()
    }
}

/// Runs invocation plans.
///
/// Components run in order, each consuming the previous connector. The first error aborts
/// the rest of the chain. Every component that was entered is cleaned up afterwards, on
/// success, on error and on panic alike.
pub struct PipelineExecutor<'a> {
    ctx: RunContext<'a>,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self { ctx }
    }

    /// Execute `plan` starting from `connector`.
    pub fn execute(
        &self,
        plan: &InvocationPlan,
        connector: Connector,
        auditor: &Auditor,
    ) -> Result<Connector, InvocationError> {
        debug!(
            servlet = %plan.servlet.name,
            filters = plan.filters.len(),
            "Executing invocation plan"
        );
        self.run_steps(&plan.steps(), connector, auditor)
    }

    /// Run `steps` in order, then clean up every entered component.
    ///
    /// When the chain fails, cleanup errors are logged and the chain's error is returned.
    /// When the chain succeeds, the first cleanup error becomes the result.
    pub fn run_steps(
        &self,
        steps: &[Step],
        connector: Connector,
        auditor: &Auditor,
    ) -> Result<Connector, InvocationError> {
        let mut entered: Vec<Arc<Component>> = Vec::with_capacity(steps.len());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut current = connector;
            for step in steps {
                entered.push(Arc::clone(&step.component));
                current = step.component.run(current, &self.ctx, auditor)?;
            }
            Ok(current)
        }));

        let outcome = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let component = entered.last().map(|c| c.name()).unwrap_or("<none>");
                let message = panic_message(payload.as_ref());
                error!(component = %component, panic_message = %message, "Component panicked");
                Err(TechnicalException::new(format!(
                    "unexpected fault in component {component}: {message}"
                ))
                .into())
            }
        };

        let cleanup_error = self.cleanup(&entered, auditor);
        match (outcome, cleanup_error) {
            (Ok(result), None) => Ok(result),
            (Ok(_), Some(err)) => Err(err),
            (Err(err), Some(masked)) => {
                warn!(error = %masked, original = %err, "Cleanup failed while unwinding a failed chain");
                Err(err)
            }
            (Err(err), None) => Err(err),
        }
    }

    /// Clean up entered components, most recent first. Returns the first error.
    fn cleanup(&self, entered: &[Arc<Component>], auditor: &Auditor) -> Option<InvocationError> {
        let mut first = None;
        for component in entered.iter().rev() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                component.cleanup(&self.ctx, auditor)
            }))
            .unwrap_or_else(|payload| {
                Err(TechnicalException::new(format!(
                    "unexpected fault cleaning up component {}: {}",
                    component.name(),
                    panic_message(payload.as_ref())
                ))
                .into())
            });
            if let Err(err) = result {
                error!(component = %component.name(), error = %err, "Component cleanup failed");
                first.get_or_insert(err);
            }
        }
        first
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
