#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use refcode::codec::{from_bytes, to_bytes};
use refcode::{Primitive, Refcode, RefcodeObject};
use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

#[derive(Default, RefcodeObject)]
struct BenchItem {
    id: u64,
    name: String,
    payload: Vec<u32>,
    owner: Option<Rc<RefCell<BenchItem>>>,
}

// Wide rather than deep: every item points at one of a few shared owners.
fn generate_graph(count: usize) -> Vec<Rc<RefCell<BenchItem>>> {
    let owners: Vec<_> = (0..16)
        .map(|i| {
            Rc::new(RefCell::new(BenchItem {
                id: i,
                name: format!("owner-{i}"),
                payload: vec![],
                owner: None,
            }))
        })
        .collect();
    (0..count)
        .map(|i| {
            Rc::new(RefCell::new(BenchItem {
                id: i as u64,
                name: format!("item-{}", i % 64),
                payload: (0..16).map(|v| v * i as u32).collect(),
                owner: Some(owners[i % owners.len()].clone()),
            }))
        })
        .collect()
}

fn generate_table(count: usize) -> Primitive {
    Primitive::Array(
        (0..count)
            .map(|i| match i % 4 {
                0 => Primitive::from(i as i64 - 500),
                1 => Primitive::from(format!("value-{i}")),
                2 => Primitive::from(i as f64 * 0.5),
                _ => Primitive::Data(vec![i as u8; 24]),
            })
            .collect(),
    )
}

// --- BENCHMARKS ---

fn bench_graph(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_graph(item_count);
    let bytes = Refcode::to_vec(&data).expect("graph serialization failed");

    let mut group = c.benchmark_group("Object Graph");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("refcode_serialize", |b| {
        b.iter(|| Refcode::to_vec(black_box(&data)).expect("serialize"));
    });

    group.bench_function("refcode_deserialize", |b| {
        b.iter(|| {
            let back: Vec<Rc<RefCell<BenchItem>>> =
                Refcode::from_slice(black_box(&bytes)).expect("deserialize");
            back
        });
    });

    group.bench_function("refcode_inspect", |b| {
        b.iter(|| Refcode::inspect(black_box(&bytes)).expect("inspect"));
    });

    group.finish();
}

fn bench_primitives(c: &mut Criterion) {
    let table = generate_table(100_000);
    let bytes = to_bytes(&table).expect("encode failed");

    let mut group = c.benchmark_group("Primitive Codec");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("encode", |b| {
        b.iter(|| to_bytes(black_box(&table)).expect("encode"));
    });

    group.bench_function("decode", |b| {
        b.iter(|| from_bytes(black_box(&bytes)).expect("decode"));
    });

    group.finish();
}

criterion_group!(benches, bench_graph, bench_primitives);
criterion_main!(benches);
