use servlex::descriptor::{load_descriptor_str, Application, LoadOptions};
use servlex::router::PathSegment;
use std::sync::Arc;

fn shop() -> Application {
    let yaml = r#"
name: http://example.org/shop
context-root: shop
components:
  page: { kind: xquery-function, namespace: "urn:shop", local-name: page }
  log: { kind: xquery-function, namespace: "urn:shop", local-name: log }
  auth: { kind: xquery-function, namespace: "urn:shop", local-name: auth }
servlets:
  - name: item
    pattern: /item/(?P<id>[0-9]+)
    chain: [page]
  - name: item-any
    pattern: /item/(.+)
    groups: [slug]
    chain: [page]
  - name: user-posts
    pattern: /user/([^/]+)/posts/([0-9]+)
    groups: [user]
    chain: [page]
  - name: archive
    pattern: /archive/(([0-9]{4})/([0-9]{2}))
    groups: [date, year, month]
    chain: [page]
  - name: home
    pattern: /
    chain: [page]
filters:
  - { name: log, pattern: ".*", chain: [log] }
  - { name: auth, pattern: "/user/.*", chain: [auth] }
"#;
    load_descriptor_str(yaml, LoadOptions::default()).unwrap()
}

fn literal(text: &str) -> PathSegment {
    PathSegment::Literal(text.to_string())
}

fn matched(name: Option<&str>, value: &str) -> PathSegment {
    PathSegment::Match {
        name: name.map(Arc::from),
        value: value.to_string(),
    }
}

#[test]
fn test_first_matching_servlet_wins() {
    let app = shop();
    let numeric = app.router().route("/item/42").unwrap();
    assert_eq!(numeric.servlet.name, "item");
    assert_eq!(numeric.binding("id"), Some("42"));

    let slug = app.router().route("/item/blue-shirt").unwrap();
    assert_eq!(slug.servlet.name, "item-any");
    assert_eq!(slug.binding("slug"), Some("blue-shirt"));
    assert_eq!(slug.binding("id"), None);
}

#[test]
fn test_patterns_match_the_whole_path() {
    let app = shop();
    assert!(app.router().route("/item/").is_none());
    assert!(app.router().route("/prefix/item/42").is_none());
    assert_eq!(app.router().route("/").unwrap().servlet.name, "home");

    let err = app.router().resolve("/nothing").unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(err.message(), "Page not found: /nothing");
}

#[test]
fn test_segments_alternate_literals_and_matches() {
    let app = shop();
    let route = app.router().route("/user/alice/posts/7").unwrap();
    assert_eq!(route.servlet.name, "user-posts");
    assert_eq!(
        route.segments,
        vec![
            literal("/user/"),
            matched(Some("user"), "alice"),
            literal("/posts/"),
            matched(None, "7"),
        ]
    );
    // only named groups are bound
    assert_eq!(route.bindings.len(), 1);
}

#[test]
fn test_nested_groups_do_not_repeat_text() {
    let app = shop();
    let route = app.router().route("/archive/2024/05").unwrap();
    assert_eq!(route.binding("date"), Some("2024/05"));
    assert_eq!(route.binding("year"), Some("2024"));
    assert_eq!(route.binding("month"), Some("05"));
    assert_eq!(
        route.segments,
        vec![
            literal("/archive/"),
            matched(Some("date"), "2024/05"),
            matched(Some("year"), "2024"),
            matched(Some("month"), "05"),
        ]
    );
}

#[test]
fn test_filters_apply_in_declaration_order() {
    let app = shop();
    let user = app.router().route("/user/bob/posts/1").unwrap();
    let labels: Vec<&str> = user.filters.iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["log", "auth"]);

    let item = app.router().route("/item/1").unwrap();
    let labels: Vec<&str> = item.filters.iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["log"]);
}

#[test]
fn test_concurrent_routing_shares_the_table() {
    let app = Arc::new(shop());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let app = Arc::clone(&app);
            std::thread::spawn(move || {
                for n in 0..200 {
                    let path = format!("/item/{}", i * 1000 + n);
                    let route = app.router().route(&path).unwrap();
                    assert_eq!(route.servlet.name, "item");
                    assert_eq!(route.binding("id"), Some(path.trim_start_matches("/item/")));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
