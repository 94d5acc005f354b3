use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use opal_domain::algs::communicator::NoComm;
use opal_domain::index::{AxisTag, IndexRange};
use opal_domain::layout::{FieldLayout, split_domain};
use opal_domain::solver::{ArbitraryDomain, Interpolation, SphereBoundary};

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_domain");
    let domain = IndexRange::from_lengths([256, 256, 512]);
    let tags = [AxisTag::Parallel; 3];
    // powers of two take the round-robin path, the rest the bisection tree
    for &vnodes in &[7usize, 64, 100, 1000, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(vnodes), &vnodes, |b, &n| {
            b.iter(|| split_domain(&domain, &tags, n).unwrap());
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let domain = IndexRange::from_lengths([128, 128, 128]);
    c.bench_function("field_layout_1000_vnodes", |b| {
        b.iter(|| FieldLayout::initialize(&NoComm, domain, None, Some(1000)).unwrap());
    });
}

fn bench_compute(c: &mut Criterion) {
    let n = 32;
    let h = 1.0 / n as f64;
    c.bench_function("arbitrary_domain_sphere_32", |b| {
        b.iter(|| {
            let geo = SphereBoundary::new([0.5; 3], 0.45);
            let mut dom = ArbitraryDomain::new(geo, [n; 3], [h; 3], Interpolation::Linear)
                .unwrap()
                .with_range([0.0; 3], [1.0; 3]);
            dom.compute(&NoComm, [h; 3], IndexRange::from_lengths([n; 3]))
                .unwrap();
            dom.total_dofs()
        });
    });
}

criterion_group!(benches, bench_split, bench_layout, bench_compute);
criterion_main!(benches);
