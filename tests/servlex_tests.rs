use servlex::components::Processor;
use servlex::config::ServerConfig;
use servlex::fields::{FieldScope, Properties};
use servlex::model::{Item, Node};
use servlex::repository::{DirectoryStore, WebRepository};
use servlex::request::HttpRequest;
use servlex::servlex::{ResponseBody, Servlex};
use std::sync::Arc;
use tempfile::TempDir;

mod common;
use common::engine::{FakeProcessor, Step};
use common::temp_files::write_repository;

const CART: &str = r#"
name: http://example.org/cart
title: Cart
components:
  put: { kind: xquery-module, uri: put.xq }
  show: { kind: xquery-module, uri: show.xq }
  visit: { kind: xquery-module, uri: visit.xq }
  visits: { kind: xquery-module, uri: visits.xq }
  broken: { kind: xquery-module, uri: broken.xq }
  in: { kind: xquery-module, uri: in.xq }
  out: { kind: xquery-module, uri: out.xq }
servlets:
  - { name: put, pattern: /put, chain: [put] }
  - { name: show, pattern: /show, chain: [show] }
  - { name: visit, pattern: /visit, chain: [visit] }
  - { name: visits, pattern: /visits, chain: [visits] }
  - { name: broken, pattern: /broken, chain: [broken] }
filters:
  - { name: wrap, pattern: "/(put|show)", chain: [in], outbound: [out] }
"#;

const SOURCES: &[(&str, &str)] = &[
    ("put.xq", "put"),
    ("show.xq", "show"),
    ("visit.xq", "visit"),
    ("visits.xq", "visits"),
    ("broken.xq", "this is a syntax error"),
    ("in.xq", "in"),
    ("out.xq", "out"),
];

struct Fixture {
    _dir: TempDir,
    servlex: Servlex,
    processor: Arc<FakeProcessor>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    write_repository(dir.path(), &[("cart", "cart-1.0", CART, SOURCES)]);
    let store = DirectoryStore::open(dir.path()).unwrap();
    let repo = Arc::new(WebRepository::open(Arc::new(store)).unwrap());
    let processor = Arc::new(
        FakeProcessor::new()
            .on("put", Step::WriteField(FieldScope::Session, "cart"))
            .on("show", Step::ReadField(FieldScope::Session, "cart"))
            .on("visit", Step::WriteField(FieldScope::Webapp, "last-visit"))
            .on("visits", Step::ReadField(FieldScope::Webapp, "last-visit"))
            .on("out", Step::Append("done")),
    );
    let servlex = Servlex::new(
        ServerConfig::default(),
        repo,
        Arc::clone(&processor) as Arc<dyn Processor>,
        Arc::new(Properties::server()),
    );
    Fixture {
        _dir: dir,
        servlex,
        processor,
    }
}

fn get(path: &str) -> HttpRequest {
    HttpRequest::from_url("GET", &format!("http://localhost:8080/servlex{path}"), "/servlex")
        .unwrap()
}

fn request_paths(body: &ResponseBody) -> Vec<String> {
    match body {
        ResponseBody::Sequence(seq) => seq
            .iter()
            .filter_map(|item| match item {
                Item::Node(Node::Element(e)) => e.attribute("path").map(str::to_string),
                _ => None,
            })
            .collect(),
        ResponseBody::Empty => Vec::new(),
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn test_session_fields_live_across_requests() {
    let f = fixture();
    let put = f.servlex.handle(&get("/cart/put").with_session("alice"));
    assert_eq!(put.status, 200);

    let mine = f.servlex.handle(&get("/cart/show").with_session("alice"));
    assert_eq!(request_paths(&mine.body), vec!["/put"]);

    let other = f.servlex.handle(&get("/cart/show").with_session("bob"));
    assert!(request_paths(&other.body).is_empty());
    assert_eq!(f.servlex.sessions().len(), 2);
}

#[test]
fn test_session_field_without_session_is_an_error() {
    let f = fixture();
    let response = f.servlex.handle(&get("/cart/put"));
    assert_eq!(response.status, 500);
}

#[test]
fn test_webapp_fields_are_shared_by_all_requests() {
    let f = fixture();
    f.servlex.service(&get("/cart/visit")).unwrap();
    let connector = f.servlex.service(&get("/cart/visits").with_session("carol")).unwrap();
    let element = connector.payload().element_at(0).unwrap().unwrap();
    assert_eq!(element.attribute("path"), Some("/visit"));
}

#[test]
fn test_filter_wraps_servlet_and_components_compile_once() {
    let f = fixture();
    for _ in 0..3 {
        let response = f.servlex.handle(&get("/cart/show").with_session("dave"));
        assert_eq!(response.status, 200);
    }
    let events = f.processor.events();
    let first_request: Vec<&str> = events.iter().take(8).map(String::as_str).collect();
    assert_eq!(
        first_request,
        vec![
            "compile in",
            "run in",
            "compile show",
            "run show",
            "compile out",
            "run out",
            "cleanup out",
            "cleanup show",
        ]
    );
    assert_eq!(f.processor.compile_count(), 3);
}

#[test]
fn test_outbound_filter_output_is_the_response() {
    let f = fixture();
    f.servlex.handle(&get("/cart/put").with_session("erin"));
    let response = f.servlex.handle(&get("/cart/show").with_session("erin"));
    match &response.body {
        ResponseBody::Sequence(seq) => {
            assert_eq!(seq.iter().last().and_then(Item::as_str), Some("done"));
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn test_compile_failure_is_500_and_cached() {
    let f = fixture();
    let first = f.servlex.handle(&get("/cart/broken"));
    let second = f.servlex.handle(&get("/cart/broken"));
    assert_eq!(first.status, 500);
    assert_eq!(second.status, 500);
    let compiles = f
        .processor
        .events()
        .iter()
        .filter(|e| e.as_str() == "compile broken")
        .count();
    assert_eq!(compiles, 1);
}

#[test]
fn test_unknown_webapp_is_404_and_runs_nothing() {
    let f = fixture();
    let response = f.servlex.handle(&get("/shop/put"));
    assert_eq!(response.status, 404);
    match response.body {
        ResponseBody::Json(body) => assert_eq!(body["message"], "Application not found: shop"),
        other => panic!("unexpected body {other:?}"),
    }
    assert!(f.processor.events().is_empty());
}
