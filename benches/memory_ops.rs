//! Benchmarks for memory recall and request synthesis.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;

use gql_probe::graph::EndpointGraph;
use gql_probe::memory::{FuzzyMemory, MemoryValue, assoc};
use gql_probe::schema::Schema;
use gql_probe::synth::{SynthesisOptions, Synthesizer};

const LABELS: [&str; 8] = [
    "id", "name", "username", "password", "street", "city", "zipCode", "email",
];

fn filled_memory(entries: usize) -> FuzzyMemory {
    let mut memory = FuzzyMemory::default();
    for i in 0..entries {
        let label = LABELS[i % LABELS.len()];
        let typed = format!("Customer {label}");
        memory
            .store(
                MemoryValue::from(format!("value-{i}").as_str()),
                assoc(&[(label, 1.0), (typed.as_str(), 1.0), ("Customer", 0.3)]),
            )
            .unwrap();
    }
    memory
}

fn bench_store(c: &mut Criterion) {
    c.bench_function("store_1k", |bench| {
        bench.iter(|| black_box(filled_memory(1_000)))
    });
}

fn bench_query(c: &mut Criterion) {
    let memory = filled_memory(1_000);
    let labels = assoc(&[("customer id", 1.0), ("id", 0.5), ("ID", 0.2)]);

    c.bench_function("query_1k", |bench| {
        bench.iter(|| black_box(memory.query(&labels).unwrap()))
    });
}

fn bench_synthesize(c: &mut Criterion) {
    let schema = Schema::from_sdl(
        r#"
        type Query { customers(limit: Int, city: String, filter: Filter): [Customer] }
        input Filter { name: String zipCode: String next: Filter }
        type Customer { id: ID! name: String street: String city: String }
        "#,
    )
    .unwrap();
    let graph = EndpointGraph::from_schema(&schema).unwrap();
    let customers = graph.find("customers").unwrap();
    let memory = filled_memory(200);
    let options = SynthesisOptions::default();
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);

    c.bench_function("synthesize_customers", |bench| {
        bench.iter(|| {
            let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);
            black_box(synth.synthesize(&graph, customers).unwrap())
        })
    });
}

criterion_group!(benches, bench_store, bench_query, bench_synthesize);
criterion_main!(benches);
