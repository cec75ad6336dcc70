use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use notegraph::engine::{parse_command, EmbeddedDatabase, GraphDatabase};
use notegraph::layout::{compute_layout, LayoutConfig, LayoutGraph, Point};
use notegraph::Statement;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn ring(n: usize) -> (Vec<usize>, Vec<(usize, usize)>) {
    let nodes: Vec<usize> = (0..n).collect();
    let edges = (0..n).map(|i| (i, (i + 1) % n)).collect();
    (nodes, edges)
}

/// Benchmark a full layout run at the default iteration count
fn bench_force_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_layout");
    let config = LayoutConfig::default();

    for size in [10, 50, 200].iter() {
        let (nodes, edges) = ring(*size);
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(7);
                let positions = compute_layout(&view, &HashMap::new(), &config, &mut rng);
                criterion::black_box(positions.len());
            });
        });
    }
    group.finish();
}

/// Benchmark a layout run with a tenth of the nodes pinned
fn bench_pinned_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("pinned_layout");
    let config = LayoutConfig::default();

    for size in [50, 200].iter() {
        let (nodes, edges) = ring(*size);
        let view = LayoutGraph::new(&nodes, edges.iter().map(|(s, t)| (s, t)));
        let pinned: HashMap<usize, Point> = (0..*size)
            .step_by(10)
            .map(|i| (i, Point::new(i as f64, i as f64)))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(7);
                let positions = compute_layout(&view, &pinned, &config, &mut rng);
                criterion::black_box(positions.len());
            });
        });
    }
    group.finish();
}

/// Benchmark parsing of the statements the store issues most
fn bench_statement_parsing(c: &mut Criterion) {
    let insert = "CREATE (n:Person {id: $id, name: $p0, age: $p1}) RETURN n.id AS id";
    let edge = "MATCH (a:Person {id: $src}), (b:Person {id: $dst}) CREATE (a)-[r:KNOWS {id: $id}]->(b) RETURN r.id AS id";

    c.bench_function("parse_insert_node", |b| {
        b.iter(|| criterion::black_box(parse_command(insert).is_ok()))
    });
    c.bench_function("parse_insert_edge", |b| {
        b.iter(|| criterion::black_box(parse_command(edge).is_ok()))
    });
}

/// Benchmark a full-table scan on the embedded engine
fn bench_node_scan(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("node_scan");

    for size in [100, 1000].iter() {
        let db = EmbeddedDatabase::in_memory();
        rt.block_on(async {
            db.execute(&Statement::new("CREATE NODE TABLE Person (id STRING, name STRING, PRIMARY KEY (id))"))
                .await
                .expect("create table");
            for i in 0..*size {
                let statement = Statement::new("CREATE (n:Person {id: $id, name: $name})")
                    .param("id", format!("p{}", i))
                    .param("name", format!("Person{}", i));
                db.execute(&statement).await.expect("insert");
            }
        });

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let result = rt
                    .block_on(db.execute(&Statement::new("MATCH (n:Person) RETURN n")))
                    .expect("scan");
                criterion::black_box(result.rows.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_force_layout,
    bench_pinned_layout,
    bench_statement_parsing,
    bench_node_scan
);
criterion_main!(benches);
