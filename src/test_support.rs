//! Engine fakes shared by the unit tests.

use crate::cache::CompiledUnit;
use crate::components::{
    CompileRequest, EngineError, Processor, ResolveError, Resolver, RunContext, Source, SourceKind,
};
use crate::connector::EngineInput;
use crate::model::{Item, QName, Sequence};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the scripted engine does when a component is evaluated.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Return the input unchanged.
    Echo,
    /// Return the input followed by a string item.
    Append(&'static str),
    /// Return this sequence, whatever the input.
    Return(Sequence),
    /// Fail with a dynamic error carrying this code.
    Raise(&'static str),
    /// Fail with an internal engine error.
    Crash,
    Panic,
}

/// A processor whose behavior is scripted per component name.
#[derive(Default)]
pub struct ScriptedProcessor {
    behaviors: HashMap<String, Behavior>,
    failing_compiles: Vec<String>,
    failing_cleanups: Vec<String>,
    pub compiles: AtomicUsize,
    pub log: Mutex<Vec<String>>,
}

impl ScriptedProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, component: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(component.to_string(), behavior);
        self
    }

    pub fn failing_compile(mut self, component: &str) -> Self {
        self.failing_compiles.push(component.to_string());
        self
    }

    pub fn failing_cleanup(mut self, component: &str) -> Self {
        self.failing_cleanups.push(component.to_string());
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

fn input_of(input: &EngineInput) -> Sequence {
    input
        .params
        .first()
        .map(|(_, v)| v.clone())
        .or_else(|| input.ports.first().map(|(_, v)| v.clone()))
        .unwrap_or_default()
}

impl Processor for ScriptedProcessor {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledUnit, EngineError> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        self.record(format!("compile {}", request.component));
        if self.failing_compiles.iter().any(|c| c == request.component) {
            return Err(EngineError::internal(format!(
                "static error in {}",
                request.source.uri
            )));
        }
        Ok(CompiledUnit::new(
            request.component,
            request.component.to_string(),
        ))
    }

    fn evaluate(
        &self,
        unit: &CompiledUnit,
        input: EngineInput,
        _ctx: &RunContext<'_>,
    ) -> Result<Sequence, EngineError> {
        let name = unit.downcast_ref::<String>().cloned().unwrap_or_default();
        self.record(format!("run {name}"));
        let payload = input_of(&input);
        match self.behaviors.get(&name).cloned().unwrap_or(Behavior::Echo) {
            Behavior::Echo => Ok(payload),
            Behavior::Append(text) => Ok(payload
                .iter()
                .cloned()
                .chain(std::iter::once(Item::from(text)))
                .collect()),
            Behavior::Return(result) => Ok(result),
            Behavior::Raise(code) => Err(EngineError::dynamic(
                Some(QName::new("http://example.org/err", code)),
                format!("{name} raised {code}"),
            )),
            Behavior::Crash => Err(EngineError::internal(format!("{name} crashed"))),
            Behavior::Panic => panic!("{name} panicked"),
        }
    }

    fn cleanup(&self, unit: &CompiledUnit) -> Result<(), EngineError> {
        let name = unit.downcast_ref::<String>().cloned().unwrap_or_default();
        self.record(format!("cleanup {name}"));
        if self.failing_cleanups.contains(&name) {
            return Err(EngineError::internal(format!("cannot release {name}")));
        }
        Ok(())
    }
}

/// Resolves every URI to an empty source.
pub struct AnyResolver;

impl Resolver for AnyResolver {
    fn resolve(&self, uri: &str, _kind: SourceKind) -> Result<Source, ResolveError> {
        Ok(Source {
            uri: uri.to_string(),
            system_id: format!("mem:/{uri}"),
            text: Arc::from(""),
        })
    }
}
