//! Deployment upload.
//!
//! The deploy endpoint receives a package archive as the body of a `POST` to
//! `<deploy mount>/<context-root>` and installs it into the web repository:
//!
//! | Outcome | Status |
//! |---------|--------|
//! | installed | 200, `{"status": "success", "message": ...}` |
//! | method other than `POST` | 405 with `Allow: POST` |
//! | read-only repository | 501 |
//! | invalid context root, empty body, bad archive | 400 |
//! | same package name and version already installed | 409 |
//! | anything else | 500 |
//!
//! Error bodies are `{"status": "error", "message": ...}`.

use crate::descriptor::is_valid_context_root;
use crate::repository::{InstallError, WebRepository};
use crate::request::HttpRequest;
use crate::servlex::HttpResponse;
use http::Method;
use serde_json::json;
use tracing::{info, warn};

/// Response of the deploy endpoint.
pub type DeployResponse = HttpResponse;

fn deploy_error(status: u16, message: impl Into<String>) -> DeployResponse {
    let message = message.into();
    warn!(status, message = %message, "Deployment refused");
    HttpResponse::json(status, json!({ "status": "error", "message": message }))
}

/// Handle one request to the deploy endpoint. The request path info is `/<context-root>`.
pub fn deploy_webapp(repo: &WebRepository, request: &HttpRequest) -> DeployResponse {
    if !request.method.eq_ignore_ascii_case(Method::POST.as_str()) {
        return deploy_error(405, "Method Not Allowed").with_header("Allow", "POST");
    }
    if !repo.can_install() {
        return deploy_error(501, "Install not supported, storage is read-only.");
    }
    let Some(root) = request.path_info.strip_prefix('/') else {
        return deploy_error(500, "Path info does not start with /.");
    };
    if !is_valid_context_root(root) {
        return deploy_error(400, format!("The webapp context root is not valid: {root}"));
    }
    let archive = match &request.body {
        Some(body) if !body.bytes.is_empty() => &body.bytes,
        _ => return deploy_error(400, "The request has no package archive in its body."),
    };

    match repo.install(archive, root, false) {
        Ok(name) => {
            info!(context_root = %root, webapp = %name, "Webapp deployed");
            HttpResponse::json(
                200,
                json!({
                    "status": "success",
                    "message": format!("The webapp at {root} has been successfully installed."),
                    "name": name,
                    "context-root": root,
                }),
            )
        }
        Err(err @ InstallError::Failed(_)) => {
            deploy_error(500, format!("Error installing the webapp: {err}"))
        }
        Err(err) => deploy_error(err.status(), err.to_string()),
    }
}
