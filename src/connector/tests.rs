use super::*;
use crate::error::ComponentError;
use crate::model::{
    Attribute, Document, Element, Item, Node, QName, Sequence, PRIVATE_NS, WEBAPP_NS,
};
use std::sync::Arc;

fn request_doc() -> (Document, Element) {
    let root = Element::new(QName::web("request"), None, Vec::new(), Vec::new());
    (Document::with_root(root.clone()), root)
}

fn element(local: &str) -> Element {
    Element::new(QName::local(local), None, Vec::new(), Vec::new())
}

#[test]
fn test_request_to_query_module_sets_context_and_input() {
    let (doc, root) = request_doc();
    let input = Sequence::new([Item::from(root), Item::from("body")]);
    let connector = Connector::request(doc.clone(), input.clone());

    let engine_input = connector.connect(InputShape::QueryModule).unwrap();
    assert_eq!(engine_input.context_item, Some(Item::from(doc)));
    assert_eq!(
        engine_input.param(&QName::new(WEBAPP_NS, "input")),
        Some(&input)
    );
}

#[test]
fn test_request_to_function_passes_the_whole_input() {
    let (doc, root) = request_doc();
    let input = Sequence::singleton(root);
    let connector = Connector::request(doc, input.clone());

    let f = connector.connect(InputShape::QueryFunction).unwrap();
    assert!(f.context_item.is_none());
    assert_eq!(f.param(&QName::local("input")), Some(&input));

    let x = connector.connect(InputShape::XsltCall).unwrap();
    assert_eq!(x.param(&QName::new(PRIVATE_NS, "input")), Some(&input));

    let p = connector.connect(InputShape::Pipeline).unwrap();
    assert_eq!(p.port("source"), Some(&input));
}

#[test]
fn test_sequence_to_stylesheet_uses_first_node_as_context() {
    let e = element("page");
    let payload = Sequence::new([Item::from(e.clone()), Item::from("trailing")]);
    let input = Connector::sequence(payload.clone())
        .connect(InputShape::Stylesheet)
        .unwrap();
    assert_eq!(input.context_item, Some(Item::from(e)));
    assert_eq!(input.param(&QName::web("input")), Some(&payload));
}

#[test]
fn test_stylesheet_rejects_unusable_context() {
    let empty = Connector::sequence(Sequence::empty()).connect(InputShape::Stylesheet);
    assert_eq!(empty.unwrap_err().status(), 500);

    let atomic = Connector::sequence(Sequence::singleton("text")).connect(InputShape::Stylesheet);
    assert!(atomic.unwrap_err().message().contains("atomic"));

    let comment = Connector::sequence(Sequence::singleton(Item::Node(Node::Comment(
        "c".into(),
    ))))
    .connect(InputShape::Stylesheet);
    assert!(comment.unwrap_err().message().contains("comment"));
}

#[test]
fn test_error_connects_only_to_pipelines() {
    let (doc, _) = request_doc();
    let payload = Sequence::singleton("detail");
    let err = ComponentError::new(
        QName::with_prefix("http://example.org/err", "E42", "app"),
        "it broke",
        payload.clone(),
    );
    let connector = Connector::from_error(err, doc.clone());

    let input = connector.connect(InputShape::Pipeline).unwrap();
    assert_eq!(input.option(&QName::web("code-name")), Some("app:E42"));
    assert_eq!(
        input.option(&QName::web("code-namespace")),
        Some("http://example.org/err")
    );
    assert_eq!(input.option(&QName::web("message")), Some("it broke"));
    assert_eq!(input.port("source"), Some(&Sequence::singleton(doc)));
    assert_eq!(input.port("user-data"), Some(&payload));

    let refused = connector.connect(InputShape::QueryFunction).unwrap_err();
    assert_eq!(refused.status(), 500);
}

#[test]
fn test_error_without_payload_has_no_user_data_port() {
    let (doc, _) = request_doc();
    let connector = Connector::from_error(ComponentError::unknown("x"), doc);
    let input = connector.connect(InputShape::Pipeline).unwrap();
    assert!(input.port("user-data").is_none());
    assert_eq!(input.option(&QName::web("code-name")), Some("web:ERRUNKNOWN"));
}

#[test]
fn test_resource_connects_to_nothing() {
    let connector = Connector::resource(Arc::from(&b"png"[..]), "image/png");
    for shape in [
        InputShape::Stylesheet,
        InputShape::XsltCall,
        InputShape::QueryFunction,
        InputShape::QueryModule,
        InputShape::Pipeline,
    ] {
        assert_eq!(connector.connect(shape).unwrap_err().status(), 500);
    }
}

#[test]
fn test_chaining_keeps_response_metadata() {
    let mut connector = Connector::sequence(Sequence::empty()).with_status(201);
    connector.set_header("Content-Type", "text/plain");
    connector.set_header("content-type", "text/html");
    let next = connector.chain(Sequence::singleton("out"));
    assert_eq!(next.status(), Some(201));
    assert_eq!(next.headers().len(), 1);
    assert_eq!(next.headers()[0].1, "text/html");
    assert_eq!(next.kind().name(), "sequence");
}

fn response(attributes: Vec<Attribute>, children: Vec<Node>) -> Item {
    Item::from(Element::new(QName::web("response"), None, attributes, children))
}

fn web_child(local: &str, attributes: Vec<Attribute>) -> Node {
    Node::Element(Element::new(QName::web(local), None, attributes, Vec::new()))
}

fn attr(local: &str, value: &str) -> Attribute {
    Attribute::new(QName::local(local), value)
}

#[test]
fn test_response_element_becomes_metadata() {
    let payload = Sequence::new([
        response(
            vec![
                attr("status", "404"),
                attr("message", "Gone fishing"),
                Attribute::new(QName::new("urn:other", "hint"), "ignored"),
            ],
            vec![
                web_child("header", vec![attr("name", "X-Trace"), attr("value", "abc")]),
                web_child("body", vec![attr("content-type", "text/html")]),
            ],
        ),
        Item::from("<p>nope</p>"),
    ]);
    let connector = Connector::sequence(payload).apply_response().unwrap();
    assert_eq!(connector.status(), Some(404));
    let headers: Vec<(&str, &str)> = connector
        .headers()
        .iter()
        .map(|(n, v)| (n.as_ref(), v.as_str()))
        .collect();
    assert_eq!(headers, vec![("X-Trace", "abc"), ("Content-Type", "text/html")]);
    assert_eq!(connector.payload(), &Sequence::singleton("<p>nope</p>"));
}

#[test]
fn test_payload_without_response_element_is_unchanged() {
    let payload = Sequence::new([Item::from(element("html")), Item::from("tail")]);
    let connector = Connector::sequence(payload.clone()).apply_response().unwrap();
    assert_eq!(connector.status(), None);
    assert!(connector.headers().is_empty());
    assert_eq!(connector.payload(), &payload);
}

#[test]
fn test_malformed_response_element_is_500() {
    let cases = [
        response(vec![attr("status", "2000")], Vec::new()),
        response(vec![attr("colour", "red")], Vec::new()),
        response(Vec::new(), vec![web_child("footer", Vec::new())]),
        response(Vec::new(), vec![web_child("header", vec![attr("name", "X-Only")])]),
    ];
    for item in cases {
        let err = Connector::sequence(Sequence::singleton(item))
            .apply_response()
            .unwrap_err();
        assert_eq!(err.status(), 500, "{}", err.message());
    }
}
