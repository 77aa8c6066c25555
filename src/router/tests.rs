use super::{match_pattern, PathSegment, Router, Target};
use crate::descriptor::{load_descriptor_str, Application, LoadOptions, UriPattern};

const APP: &str = r#"
name: routes
context-root: routes
components:
  c: { kind: xquery-module, uri: main.xq }
  f: { kind: xquery-module, uri: filter.xq }
servlets:
  - { name: first, pattern: "/a.*", chain: [c] }
  - { name: second, pattern: "/ab", chain: [c] }
  - { name: user, pattern: "/user/(?P<id>[0-9]+)(/(?P<action>edit))?", chain: [c] }
filters:
  - { name: all, pattern: ".*", chain: [f] }
  - { name: users, pattern: "/user/.*", chain: [f] }
"#;

fn app() -> Application {
    load_descriptor_str(APP, LoadOptions::default()).unwrap()
}

fn literal(s: &str) -> PathSegment {
    PathSegment::Literal(s.to_string())
}

fn matched(name: Option<&str>, value: &str) -> PathSegment {
    PathSegment::Match {
        name: name.map(Into::into),
        value: value.to_string(),
    }
}

#[test]
fn test_first_match_wins() {
    let app = app();
    let route = app.router().route("/ab").unwrap();
    assert_eq!(route.servlet.name, "first");
}

#[test]
fn test_no_match_is_404() {
    let app = app();
    assert!(app.router().route("/zzz").is_none());
    let err = app.router().resolve("/zzz").unwrap_err();
    assert_eq!(err.status(), 404);
}

#[test]
fn test_unmatched_optional_group_is_omitted() {
    let app = app();
    let route = app.router().route("/user/42").unwrap();
    assert_eq!(route.servlet.name, "user");
    assert_eq!(route.binding("id"), Some("42"));
    assert_eq!(route.binding("action"), None);
    assert_eq!(route.bindings.len(), 1);
    assert_eq!(
        route.segments,
        vec![literal("/user/"), matched(Some("id"), "42")]
    );

    let route = app.router().route("/user/42/edit").unwrap();
    assert_eq!(route.binding("action"), Some("edit"));
    assert_eq!(
        route.segments,
        vec![
            literal("/user/"),
            matched(Some("id"), "42"),
            matched(None, "/edit"),
            matched(Some("action"), "edit"),
        ]
    );
}

#[test]
fn test_filters_in_declaration_order() {
    let app = app();
    let route = app.router().route("/user/1").unwrap();
    let names: Vec<_> = route.filters.iter().map(|f| f.label()).collect();
    assert_eq!(names, vec!["all", "users"]);

    let route = app.router().route("/abc").unwrap();
    assert_eq!(route.filters.len(), 1);
}

#[test]
fn test_segments_with_trailing_literal() {
    let pattern = UriPattern::new("/remove/([a-z]+)/now", &[Some("what".into())]).unwrap();
    let (bindings, segments) = match_pattern(&pattern, "/remove/filters/now").unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(
        segments,
        vec![
            literal("/remove/"),
            matched(Some("what"), "filters"),
            literal("/now")
        ]
    );
}

#[test]
fn test_pattern_without_groups_is_one_literal() {
    let pattern = UriPattern::new("/", &[]).unwrap();
    let (bindings, segments) = match_pattern(&pattern, "/").unwrap();
    assert!(bindings.is_empty());
    assert_eq!(segments, vec![literal("/")]);
    assert!(match_pattern(&pattern, "/x").is_none());
}

#[test]
fn test_nested_group_does_not_repeat_text() {
    let pattern = UriPattern::new("/(a(b)c)", &[]).unwrap();
    let (_, segments) = match_pattern(&pattern, "/abc").unwrap();
    assert_eq!(
        segments,
        vec![literal("/"), matched(None, "abc"), matched(None, "b")]
    );
}

#[test]
fn test_empty_router() {
    let router = Router::default();
    assert!(router.route("/").is_none());
    assert!(router.filters_for("/").is_empty());
}

const SITE: &str = r#"
name: site
context-root: site
components:
  c: { kind: xquery-module, uri: main.xq }
servlets:
  - { name: page, pattern: "/page/.*", chain: [c] }
resources:
  - { pattern: "/page/.*\\.png", media-type: image/png }
  - { pattern: "/style/(.+)\\.css", rewrite: "static/css/$1.css", media-type: text/css }
  - { pattern: "/.*\\.js", media-type: application/javascript }
"#;

#[test]
fn test_servlets_win_over_resources() {
    let app = load_descriptor_str(SITE, LoadOptions::default()).unwrap();
    match app.router().target("/page/logo.png").unwrap() {
        Target::Servlet(route) => assert_eq!(route.servlet.name, "page"),
        other => panic!("expected the servlet, got {other:?}"),
    }
}

#[test]
fn test_resource_target_rewrites_the_path() {
    let app = load_descriptor_str(SITE, LoadOptions::default()).unwrap();
    match app.router().target("/style/main.css").unwrap() {
        Target::Resource(resource) => {
            assert_eq!(resource.media_type, "text/css");
            assert_eq!(resource.target("/style/main.css"), "static/css/main.css");
        }
        other => panic!("expected a resource, got {other:?}"),
    }
    match app.router().target("/lib/app.js").unwrap() {
        Target::Resource(resource) => assert_eq!(resource.target("/lib/app.js"), "lib/app.js"),
        other => panic!("expected a resource, got {other:?}"),
    }
    assert_eq!(app.router().target("/nothing").unwrap_err().status(), 404);
}
