use criterion::{criterion_group, criterion_main, Criterion};
use servlex::descriptor::{load_descriptor_str, Application, LoadOptions};
use servlex::router::match_pattern;
use std::hint::black_box;

fn example_descriptor() -> &'static str {
    r#"
name: http://example.org/zoo
context-root: zoo
components:
  page: { kind: xquery-function, namespace: "urn:zoo", local-name: page }
  log: { kind: xquery-function, namespace: "urn:zoo", local-name: log }
servlets:
  - { name: root, pattern: /, chain: [page] }
  - { name: animals, pattern: /animals, chain: [page] }
  - { name: animal, pattern: "/animals/(?P<id>[0-9]+)", chain: [page] }
  - name: toy
    pattern: /animals/([0-9]+)/toys/([0-9]+)
    groups: [id, toy]
    chain: [page]
  - name: section
    pattern: /([a-z]+)/animals/([0-9]+)/habitats/([0-9]+)/sections/([0-9]+)
    groups: [category, id, habitat, section]
    chain: [page]
  - name: batch
    pattern: /inventory/([0-9]+)/feeds/([0-9]+)/items/([0-9]+)/batches/([0-9]+)
    groups: [warehouse, feed, item, batch]
    chain: [page]
  - name: archive
    pattern: /archive/(([0-9]{4})/([0-9]{2}))
    groups: [date, year, month]
    chain: [page]
  - { name: fallback, pattern: "/.*", chain: [page] }
filters:
  - { name: log, pattern: ".*", chain: [log] }
  - { name: inventory, pattern: "/inventory/.*", chain: [log] }
"#
}

fn load() -> Application {
    load_descriptor_str(example_descriptor(), LoadOptions::default())
        .expect("failed to load descriptor")
}

fn bench_route_throughput(c: &mut Criterion) {
    let app = load();
    let router = app.router();
    c.bench_function("route_match", |b| {
        let test_paths = [
            "/animals/123",
            "/animals/123/toys/456",
            "/cats/animals/123/habitats/88/sections/5",
            "/inventory/1/feeds/2/items/3/batches/4",
            "/archive/2024/05",
            "/nowhere/in/particular",
        ];
        b.iter(|| {
            for path in test_paths.iter() {
                let res = router.route(path);
                black_box(&res);
            }
        })
    });
}

fn bench_segments(c: &mut Criterion) {
    let app = load();
    let pattern = &app.servlets()[5].pattern;
    c.bench_function("match_pattern_segments", |b| {
        b.iter(|| black_box(match_pattern(pattern, black_box("/inventory/1/feeds/2/items/3/batches/4"))))
    });
}

criterion_group!(benches, bench_route_throughput, bench_segments);
criterion_main!(benches);
