#![allow(dead_code)]

pub mod temp_files {
    use std::path::Path;

    /// Write a directory repository: `webapps.yaml` plus one package directory per webapp,
    /// each holding `servlex.yaml` and its sources.
    ///
    /// `webapps` is `(context root, package dir, descriptor, sources)`.
    pub fn write_repository(root: &Path, webapps: &[(&str, &str, &str, &[(&str, &str)])]) {
        let mut list = String::new();
        for (context_root, package, descriptor, sources) in webapps {
            list.push_str(&format!("- context-root: {context_root}\n  package: {package}\n"));
            let dir = root.join(package);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("servlex.yaml"), descriptor).unwrap();
            for (name, text) in sources.iter() {
                std::fs::write(dir.join(name), text).unwrap();
            }
        }
        std::fs::write(root.join("webapps.yaml"), list).unwrap();
    }
}

pub mod engine {
    use parking_lot::Mutex;
    use servlex::cache::CompiledUnit;
    use servlex::components::{
        CompileRequest, EngineError, Processor, ResolveError, Resolver, RunContext, Source,
        SourceKind,
    };
    use servlex::connector::EngineInput;
    use servlex::fields::FieldScope;
    use servlex::model::{Item, QName, Sequence};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// What the fake engine does when a component is evaluated.
    #[derive(Debug, Clone)]
    pub enum Step {
        /// Return the component's main input unchanged.
        Echo,
        /// Return the input followed by a string.
        Append(&'static str),
        /// Fail with a dynamic error `{urn:test}code`.
        Raise(&'static str),
        /// Fail with an engine crash.
        Crash,
        /// Return the value of a field.
        ReadField(FieldScope, &'static str),
        /// Store the input in a field and return it.
        WriteField(FieldScope, &'static str),
    }

    /// A fake processor scripted per component name, recording what happens.
    #[derive(Default)]
    pub struct FakeProcessor {
        steps: HashMap<String, Step>,
        compile_delay: Duration,
        pub compiles: AtomicUsize,
        pub events: Mutex<Vec<String>>,
    }

    impl FakeProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(mut self, component: &str, step: Step) -> Self {
            self.steps.insert(component.to_string(), step);
            self
        }

        /// Make every compilation take at least `delay`.
        pub fn slow(mut self, delay: Duration) -> Self {
            self.compile_delay = delay;
            self
        }

        pub fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        pub fn compile_count(&self) -> usize {
            self.compiles.load(Ordering::SeqCst)
        }
    }

    fn main_input(input: &EngineInput) -> Sequence {
        input
            .params
            .first()
            .map(|(_, v)| v.clone())
            .or_else(|| input.ports.first().map(|(_, v)| v.clone()))
            .unwrap_or_default()
    }

    impl Processor for FakeProcessor {
        fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledUnit, EngineError> {
            if !self.compile_delay.is_zero() {
                std::thread::sleep(self.compile_delay);
            }
            self.compiles.fetch_add(1, Ordering::SeqCst);
            self.events.lock().push(format!("compile {}", request.component));
            if request.source.text.contains("syntax error") {
                return Err(EngineError::internal(format!(
                    "static error in {}",
                    request.source.uri
                )));
            }
            Ok(CompiledUnit::new(request.component, request.component.to_string()))
        }

        fn evaluate(
            &self,
            unit: &CompiledUnit,
            input: EngineInput,
            ctx: &RunContext<'_>,
        ) -> Result<Sequence, EngineError> {
            let name = unit.downcast_ref::<String>().cloned().unwrap_or_default();
            self.events.lock().push(format!("run {name}"));
            let payload = main_input(&input);
            match self.steps.get(&name).cloned().unwrap_or(Step::Echo) {
                Step::Echo => Ok(payload),
                Step::Append(text) => Ok(payload
                    .iter()
                    .cloned()
                    .chain(std::iter::once(Item::from(text)))
                    .collect()),
                Step::Raise(code) => Err(EngineError::dynamic(
                    Some(QName::new("urn:test", code)),
                    format!("{name} raised {code}"),
                )
                .with_payload(payload)),
                Step::Crash => Err(EngineError::internal(format!("{name} crashed"))),
                Step::ReadField(scope, key) => Ok(ctx
                    .fields
                    .map(|f| f.get(scope, key))
                    .unwrap_or_default()),
                Step::WriteField(scope, key) => {
                    let fields = ctx
                        .fields
                        .ok_or_else(|| EngineError::internal("no fields in context"))?;
                    fields
                        .set(scope, key, payload.clone())
                        .map_err(|e| EngineError::internal(e.message().to_string()))?;
                    Ok(payload)
                }
            }
        }

        fn cleanup(&self, unit: &CompiledUnit) -> Result<(), EngineError> {
            let name = unit.downcast_ref::<String>().cloned().unwrap_or_default();
            self.events.lock().push(format!("cleanup {name}"));
            Ok(())
        }
    }

    /// Resolves URIs from an in-memory map.
    #[derive(Default, Clone)]
    pub struct MapResolver {
        sources: HashMap<String, Arc<str>>,
    }

    impl MapResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, uri: &str, text: &str) -> Self {
            self.sources.insert(uri.to_string(), Arc::from(text));
            self
        }
    }

    impl Resolver for MapResolver {
        fn resolve(&self, uri: &str, kind: SourceKind) -> Result<Source, ResolveError> {
            let text = self.sources.get(uri).ok_or_else(|| ResolveError::NotFound {
                uri: uri.to_string(),
                kind,
            })?;
            Ok(Source {
                uri: uri.to_string(),
                system_id: format!("map:{uri}"),
                text: Arc::clone(text),
            })
        }
    }
}

pub mod builders {
    use servlex::error::TechnicalException;
    use servlex::request::TreeBuilder;
    use std::fmt::Write;

    /// Records tree-builder events as text, one bracketed event each.
    #[derive(Default)]
    pub struct StringTreeBuilder {
        pub out: String,
    }

    impl TreeBuilder for StringTreeBuilder {
        fn start_elem(&mut self, local: &str) -> Result<(), TechnicalException> {
            let _ = write!(self.out, "[start:{local}]");
            Ok(())
        }

        fn attribute(&mut self, local: &str, value: &str) -> Result<(), TechnicalException> {
            let _ = write!(self.out, "[@{local}={value}]");
            Ok(())
        }

        fn start_content(&mut self) -> Result<(), TechnicalException> {
            self.out.push_str("[content]");
            Ok(())
        }

        fn characters(&mut self, value: &str) -> Result<(), TechnicalException> {
            let _ = write!(self.out, "[text:{value}]");
            Ok(())
        }

        fn end_elem(&mut self) -> Result<(), TechnicalException> {
            self.out.push_str("[end]");
            Ok(())
        }
    }
}
