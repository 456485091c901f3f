//! Spreading-activation and PageRank benchmarks — the two O(n) paths that
//! run on every `active` call and every background refresh.
//!
//! Run with: cargo bench -p floop-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use floop_core::activation::Seed;
use floop_core::config::{RankingConfig, SpreadingConfig};
use floop_core::model::{Behavior, BehaviorKind, Edge, EdgeKind};
use floop_core::ranking::pagerank;
use floop_core::spreading::spread;

fn build_graph(n: usize) -> (Vec<Behavior>, Vec<Edge>) {
    let behaviors: Vec<Behavior> = (0..n)
        .map(|i| Behavior::new(format!("behavior-{i}"), BehaviorKind::Directive, format!("do thing {i}")))
        .collect();

    let mut edges = Vec::with_capacity(n * 2);
    for i in 0..n {
        let next = (i + 1) % n;
        edges.push(Edge::new(behaviors[i].id.clone(), behaviors[next].id.clone(), EdgeKind::SimilarTo, 0.6));
        if i % 7 == 0 {
            let other = (i + 3) % n;
            edges.push(Edge::new(behaviors[i].id.clone(), behaviors[other].id.clone(), EdgeKind::Requires, 0.9));
        }
    }
    (behaviors, edges)
}

fn bench_spreading(c: &mut Criterion) {
    let (behaviors, edges) = build_graph(500);
    let config = SpreadingConfig::default();
    let seeds: Vec<Seed> = behaviors
        .iter()
        .take(10)
        .map(|b| Seed {
            behavior_id: b.id.clone(),
            activation: 1.0,
            specificity: 3,
            priority: 0,
            confidence: 0.9,
        })
        .collect();

    c.bench_function("spreading_500_nodes", |b| {
        b.iter(|| {
            black_box(spread(&seeds, &edges, &behaviors, &config));
        })
    });
}

fn bench_pagerank(c: &mut Criterion) {
    let (behaviors, edges) = build_graph(500);
    let ids: Vec<String> = behaviors.iter().map(|b| b.id.clone()).collect();
    let config = RankingConfig::default();

    c.bench_function("pagerank_500_nodes", |b| {
        b.iter(|| {
            black_box(pagerank(&ids, &edges, &config));
        })
    });
}

criterion_group!(benches, bench_spreading, bench_pagerank);
criterion_main!(benches);
