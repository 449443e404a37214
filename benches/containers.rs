use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{thread_rng, Rng};
use std::iter::FromIterator;

use im::{HashSet, Vector as ImVector};
use persistable::{List, Set, Vector};

fn random_values(length: usize) -> Vec<i64> {
    let mut rng = thread_rng();
    let mut vec = Vec::with_capacity(length);
    for _ in 0..length {
        vec.push(rng.gen_range(0..length as i64 * 4));
    }
    vec
}

fn criterion_benchmark(c: &mut Criterion) {
    let samples_100 = random_values(100);
    let samples_1000 = random_values(1000);
    let samples_10000 = random_values(10000);
    let samples_100000 = random_values(100000);

    for (label, samples) in [
        ("100", &samples_100),
        ("1000", &samples_1000),
        ("10000", &samples_10000),
        ("100000", &samples_100000),
    ] {
        c.bench_function(&format!("vector push_back {label}"), |b| {
            b.iter(|| {
                let mut v = Vector::empty();
                for x in black_box(samples) {
                    v = v.push_back(*x);
                }
                v
            })
        });
        c.bench_function(&format!("im vector push_back {label}"), |b| {
            b.iter(|| {
                let mut v = ImVector::new();
                for x in black_box(samples) {
                    v.push_back(*x);
                }
                v
            })
        });
        c.bench_function(&format!("list cons {label}"), |b| {
            b.iter(|| {
                let mut l = List::empty();
                for x in black_box(samples) {
                    l = List::cons(*x, l);
                }
                l
            })
        });
        c.bench_function(&format!("set insert {label}"), |b| {
            b.iter(|| Set::<i64>::from_list(black_box(samples).iter().copied()))
        });
        c.bench_function(&format!("im hashset insert {label}"), |b| {
            b.iter(|| HashSet::<i64>::from_iter(black_box(samples).iter().copied()))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
