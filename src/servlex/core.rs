use super::response::HttpResponse;
use crate::auditor::Auditor;
use crate::components::{Processor, ResolveError, RunContext};
use crate::config::ServerConfig;
use crate::connector::Connector;
use crate::descriptor::{Application, Resource};
use crate::error::{InvocationError, ServlexException};
use crate::fields::{
    FieldContext, FieldStore, Properties, SessionStore, PRODUCT_NAME, PRODUCT_VERSION,
};
use crate::ids::RequestId;
use crate::pipeline::{InvocationPlan, PipelineExecutor};
use crate::repository::WebRepository;
use crate::request::{build_with, HttpRequest, RequestParser};
use crate::router::{RouteMatch, Target};
use std::sync::Arc;
use tracing::{error, info, info_span, warn};

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// The request boundary: looks up the webapp, routes, builds the request document and runs
/// the pipeline.
pub struct Servlex {
    config: ServerConfig,
    repository: Arc<WebRepository>,
    processor: Arc<dyn Processor>,
    server_fields: Arc<dyn FieldStore>,
    sessions: SessionStore,
}

impl Servlex {
    /// A request boundary over `repository`.
    ///
    /// `server_fields` is shared by every request of every webapp, usually
    /// [`Properties::server`].
    pub fn new(
        config: ServerConfig,
        repository: Arc<WebRepository>,
        processor: Arc<dyn Processor>,
        server_fields: Arc<dyn FieldStore>,
    ) -> Self {
        let sessions = SessionStore::with_limits(config.max_sessions, config.session_timeout());
        Self {
            config,
            repository,
            processor,
            server_fields,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<WebRepository> {
        &self.repository
    }

    /// Server-scoped fields, shared by every request.
    #[must_use]
    pub fn server_fields(&self) -> &dyn FieldStore {
        self.server_fields.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Serve one request, returning the final connector.
    ///
    /// # Errors
    ///
    /// 404 when no webapp is deployed at the context root or no servlet or resource
    /// matches, 405 for a resource requested with another method than `GET`, and the HTTP
    /// mapping of any error raised by the pipeline.
    pub fn service(&self, request: &HttpRequest) -> Result<Connector, ServlexException> {
        self.invoke(request).map_err(InvocationError::into_servlex)
    }

    /// Serve one request and turn the outcome into a response.
    ///
    /// The bare server root (`/`) shows a welcome page listing the deployed webapps.
    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let (context_root, _) = request.split_path();
        if context_root.is_empty() {
            return self.welcome();
        }
        match self.invoke(request) {
            Ok(connector) => HttpResponse::from_connector(connector),
            Err(e) => HttpResponse::from_error(e),
        }
    }

    fn invoke(&self, request: &HttpRequest) -> Result<Connector, InvocationError> {
        let (context_root, path) = request.split_path();
        let app = self.repository.application(context_root).ok_or_else(|| {
            warn!(context_root = %context_root, "No webapp deployed at context root");
            ServlexException::not_found(format!("Application not found: {context_root}"))
        })?;
        match app.router().target(path)? {
            Target::Servlet(route) => self.invoke_servlet(request, &app, path, &route),
            Target::Resource(resource) => {
                serve_resource(request, &app, path, &resource).map_err(InvocationError::from)
            }
        }
    }

    fn invoke_servlet(
        &self,
        request: &HttpRequest,
        app: &Application,
        path: &str,
        route: &RouteMatch,
    ) -> Result<Connector, InvocationError> {
        let context_root = app.context_root();
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        let span = info_span!(
            "request",
            request_id = %request_id,
            context_root = %context_root,
            servlet = %route.servlet.name,
            method = %request.method,
        );
        let _enter = span.enter();

        let auditor = Auditor::new(request_id);
        auditor.begin(&request.method, path);

        let request_fields = Properties::request(&request_id.to_string());
        let fields = FieldContext {
            request: &request_fields,
            session: request
                .session_id
                .as_deref()
                .map(|id| self.sessions.get_or_create(id)),
            webapp: app.properties(),
            server: self.server_fields.as_ref(),
        };

        let parser = RequestParser::new(request, path, context_root)
            .with_route(route)
            .with_default_charset(&self.config.default_charset);
        let result = build_with(&parser)
            .map_err(InvocationError::from)
            .and_then(|input| {
                let ctx = RunContext::new(self.processor.as_ref(), app.resolver())
                    .with_fields(&fields)
                    .with_slow_compile(self.config.slow_compile());
                PipelineExecutor::new(ctx).execute(
                    &InvocationPlan::from_route(route),
                    Connector::request(input.document, input.input),
                    &auditor,
                )
            })
            .and_then(|connector| connector.apply_response().map_err(InvocationError::from));

        match result {
            Ok(connector) => {
                auditor.end(connector.status().unwrap_or(200));
                Ok(connector)
            }
            Err(e) => {
                match &e {
                    InvocationError::Component(err) => warn!(
                        code = %err.code(),
                        message = %err.message(),
                        "Unhandled component error"
                    ),
                    InvocationError::Technical(err) => {
                        error!(error = %err, "Technical error while serving the request")
                    }
                    InvocationError::Servlex(err) => {
                        info!(status = err.status(), message = %err.message(), "Request refused")
                    }
                }
                let status = match &e {
                    InvocationError::Servlex(err) => err.status(),
                    _ => 500,
                };
                auditor.end(status);
                Err(e)
            }
        }
    }

    fn welcome(&self) -> HttpResponse {
        let items: String = self
            .repository
            .context_roots()
            .iter()
            .map(|root| format!("<li><a href=\"{root}/\">{root}</a></li>"))
            .collect();
        HttpResponse::html(
            200,
            format!(
                "<html><head><title>{PRODUCT_NAME}</title></head><body>\
                 <h1>{PRODUCT_NAME} {PRODUCT_VERSION}</h1>\
                 <p>Installed webapps:</p><ul>{items}</ul></body></html>"
            ),
        )
    }
}

/// Serve a static resource: `GET` only, the rewritten path resolved inside the package.
fn serve_resource(
    request: &HttpRequest,
    app: &Application,
    path: &str,
    resource: &Resource,
) -> Result<Connector, ServlexException> {
    if !request.method.eq_ignore_ascii_case("GET") {
        warn!(method = %request.method, path = %path, "Method not allowed on a resource");
        return Err(ServlexException::method_not_allowed(
            format!("Method not allowed: {}", request.method),
            "GET",
        ));
    }
    let target = resource.target(path);
    match app.resolver().resolve_bytes(&target) {
        Ok(content) => {
            info!(
                context_root = %app.context_root(),
                resource = %target,
                media_type = %resource.media_type,
                size = content.len(),
                "Serving resource"
            );
            Ok(Connector::resource(content, resource.media_type.as_str()))
        }
        Err(ResolveError::NotFound { .. }) => {
            warn!(resource = %target, path = %path, "Resource not found");
            Err(ServlexException::not_found(format!("Page not found: {path}")))
        }
        Err(e) => {
            error!(resource = %target, error = %e, "Cannot read resource");
            Err(ServlexException::with_cause(500, "Internal server error", e))
        }
    }
}
