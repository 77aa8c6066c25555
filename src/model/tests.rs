use super::*;
use crate::error::ModelError;

fn elem(local: &str, children: Vec<Node>) -> Element {
    Element::new(QName::local(local), None, Vec::new(), children)
}

#[test]
fn test_empty_sequence_is_a_singleton() {
    let a = Sequence::empty();
    let b = Sequence::new(Vec::new());
    let c: Sequence = std::iter::empty().collect();
    assert!(a.ptr_eq(&b));
    assert!(b.ptr_eq(&c));
    assert!(Sequence::default().is_shared_empty());
}

#[test]
fn test_item_at_out_of_range_is_absent() {
    let seq = Sequence::new([Item::from("a"), Item::Integer(2)]);
    assert_eq!(seq.item_at(1), Some(&Item::Integer(2)));
    assert!(seq.item_at(2).is_none());
    assert!(Sequence::empty().item_at(0).is_none());
}

#[test]
fn test_sub_sequence_boundaries() {
    let seq = Sequence::new([Item::from("a"), Item::from("b"), Item::from("c")]);
    assert_eq!(seq.sub_sequence(0), seq);
    assert_eq!(seq.sub_sequence(2), Sequence::singleton("c"));
    assert!(seq.sub_sequence(3).is_shared_empty());
    assert!(seq.sub_sequence(10).is_shared_empty());
    assert!(seq.sub_sequence(-1).is_shared_empty());
}

#[test]
fn test_element_at_unwraps_documents() {
    let root = elem("root", vec![]);
    let seq = Sequence::new([
        Item::from(Document::with_root(root.clone())),
        Item::from("atomic"),
        Item::Node(Node::Comment("c".into())),
    ]);
    assert_eq!(seq.element_at(0), Ok(Some(root)));
    assert!(matches!(
        seq.element_at(1),
        Err(ModelError::AtomicValue { position: 1, .. })
    ));
    assert!(matches!(
        seq.element_at(2),
        Err(ModelError::NotAnElement {
            position: 2,
            kind: "comment"
        })
    ));
    assert_eq!(seq.element_at(3), Ok(None));
}

#[test]
fn test_whitespace_predicate() {
    assert!(is_whitespace_only(" \t\n "));
    assert!(!is_whitespace_only(""));
    assert!(!is_whitespace_only("\r\n"));
    assert!(!is_whitespace_only("  x "));
}

#[test]
fn test_element_iterator_skips_comments_and_whitespace() {
    let a = elem("a", vec![]);
    let b = elem("b", vec![]);
    let parent = elem(
        "p",
        vec![
            Node::Text("\n  ".into()),
            Node::Element(a.clone()),
            Node::Comment("ignored".into()),
            Node::Text("\t".into()),
            Node::Element(b.clone()),
            Node::Text("\n".into()),
        ],
    );
    let children: Vec<_> = parent.elements().collect();
    assert_eq!(children, vec![Ok(a), Ok(b)]);
}

#[test]
fn test_element_iterator_fails_once_then_stops() {
    let a = elem("a", vec![]);
    let parent = elem(
        "p",
        vec![
            Node::Element(a.clone()),
            Node::Text("oops".into()),
            Node::Element(elem("b", vec![])),
        ],
    );
    let mut iter = parent.elements();
    assert_eq!(iter.next(), Some(Ok(a.clone())));
    assert_eq!(
        iter.next(),
        Some(Err(ModelError::UnexpectedText("oops".into())))
    );
    assert_eq!(iter.next(), None);

    iter.restart();
    assert_eq!(iter.next(), Some(Ok(a)));
}

#[test]
fn test_element_iterator_rejects_other_node_kinds() {
    let parent = elem(
        "p",
        vec![Node::ProcessingInstruction {
            target: "pi".into(),
            data: String::new(),
        }],
    );
    let first = parent.elements().next();
    assert_eq!(
        first,
        Some(Err(ModelError::UnexpectedNode("processing-instruction")))
    );
}

#[test]
fn test_qname_equality_ignores_prefix() {
    let a = QName::with_prefix(WEBAPP_NS, "request", "web");
    let b = QName::with_prefix(WEBAPP_NS, "request", "w");
    assert_eq!(a, b);
    assert_eq!(a.lexical(), "web:request");
    assert_eq!(a.to_string(), "{http://expath.org/ns/webapp}request");
    assert_ne!(a, QName::local("request"));
}

#[test]
fn test_document_builder_produces_tree() {
    let mut b = DocumentBuilder::new(WEBAPP_NS, Some(WEBAPP_PREFIX));
    b.start_elem("request").unwrap();
    b.attribute("method", "get").unwrap();
    b.start_content().unwrap();
    b.text_elem("uri", "http://x/y").unwrap();
    b.start_elem("param").unwrap();
    b.attribute("name", "a").unwrap();
    b.end_elem().unwrap();
    b.end_elem().unwrap();
    let doc = b.finish().unwrap();

    let root = doc.root_element().unwrap();
    assert_eq!(root.name(), &QName::web("request"));
    assert_eq!(root.attribute("method"), Some("get"));
    let children: Vec<Element> = root.elements().map(Result::unwrap).collect();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].string_value(), "http://x/y");
    assert_eq!(children[1].attribute("name"), Some("a"));
}

#[test]
fn test_document_builder_rejects_late_attributes_and_unclosed_elements() {
    let mut b = DocumentBuilder::new(WEBAPP_NS, None);
    b.start_elem("a").unwrap();
    b.start_content().unwrap();
    assert!(b.attribute("x", "1").is_err());
    assert!(b.finish().is_err());

    let mut b = DocumentBuilder::new(WEBAPP_NS, None);
    assert!(b.end_elem().is_err());
    assert!(b.characters("x").is_err());
}
