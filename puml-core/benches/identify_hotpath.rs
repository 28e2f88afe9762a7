use criterion::{criterion_group, criterion_main, Criterion};
use puml_core::{identify, RenderRequest};
use std::hint::black_box;

fn bench_identify(c: &mut Criterion) {
    let small = RenderRequest::svg("@startuml\nA->B\n@enduml");
    let large = RenderRequest::png(
        (0..2_000)
            .map(|i| format!("Actor{} -> Actor{} : message {}\n", i, i + 1, i))
            .collect::<String>(),
    );

    c.bench_function("identify/small", |b| {
        b.iter(|| black_box(identify(black_box(&small))));
    });

    c.bench_function("identify/large", |b| {
        b.iter(|| black_box(identify(black_box(&large))));
    });
}

criterion_group!(benches, bench_identify);
criterion_main!(benches);
