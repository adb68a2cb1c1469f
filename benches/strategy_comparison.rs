use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use dual_hash::Store;
use dual_hash::chaining::SeparateChaining;
use dual_hash::mix::mix;
use dual_hash::open_addressing::OpenAddressing;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

const KEY_SPACE_MULTIPLIER: usize = 4;

fn hash_key(key: i32) -> u64 {
    mix(key as i64 as u64)
}

/// Thin baseline so every contender sees the same key mixer.
#[derive(Default)]
struct Hashbrown {
    table: HashbrownHashTable<(i32, String)>,
}

impl Hashbrown {
    fn insert(&mut self, key: i32, value: String) {
        match self
            .table
            .entry(hash_key(key), |(k, _)| *k == key, |(k, _)| hash_key(*k))
        {
            HashbrownEntry::Occupied(mut entry) => entry.get_mut().1 = value,
            HashbrownEntry::Vacant(entry) => {
                entry.insert((key, value));
            }
        }
    }

    fn search(&self, key: i32) -> Option<&str> {
        self.table
            .find(hash_key(key), |(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn remove(&mut self, key: i32) -> bool {
        match self.table.find_entry(hash_key(key), |(k, _)| *k == key) {
            Ok(entry) => {
                entry.remove();
                true
            }
            Err(_) => false,
        }
    }
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Search,
    Remove,
}

fn random_keys(count: usize) -> Vec<i32> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| rng.try_next_u32().unwrap() as i32)
        .collect()
}

fn filled<S: Store>(mut store: S, keys: &[i32]) -> S {
    for &key in keys {
        store.insert(key, key.to_string()).unwrap();
    }
    store
}

fn filled_hashbrown(keys: &[i32]) -> Hashbrown {
    let mut table = Hashbrown::default();
    for &key in keys {
        table.insert(key, key.to_string());
    }
    table
}

fn bench_insert_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("open_addressing/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| black_box(filled(OpenAddressing::with_capacity(16), &keys)),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("separate_chaining/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| black_box(filled(SeparateChaining::with_capacity(16), &keys)),
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| black_box(filled_hashbrown(&keys)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys(size);
        let mut probes = keys.clone();
        // Half of the lookups miss.
        probes.extend(random_keys(size));
        probes.shuffle(&mut SmallRng::from_os_rng());

        let open = filled(OpenAddressing::with_capacity(size), &keys);
        let chained = filled(SeparateChaining::with_capacity(size), &keys);
        let baseline = filled_hashbrown(&keys);

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("open_addressing/{size}"), |b| {
            b.iter(|| {
                for &key in &probes {
                    black_box(open.search(key));
                }
            })
        });
        group.bench_function(format!("separate_chaining/{size}"), |b| {
            b.iter(|| {
                for &key in &probes {
                    black_box(chained.search(key));
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for &key in &probes {
                    black_box(baseline.search(key));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys(size);
        let mut order = keys.clone();
        order.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("open_addressing/{size}"), |b| {
            b.iter_batched(
                || filled(OpenAddressing::with_capacity(size), &keys),
                |mut table| {
                    for &key in &order {
                        black_box(table.remove(key));
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("separate_chaining/{size}"), |b| {
            b.iter_batched(
                || filled(SeparateChaining::with_capacity(size), &keys),
                |mut table| {
                    for &key in &order {
                        black_box(table.remove(key));
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || filled_hashbrown(&keys),
                |mut table| {
                    for &key in &order {
                        black_box(table.remove(key));
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Mixed insert/search/remove traffic with keys drawn from a Zipf
/// distribution, so a small set of hot keys churns through tombstones and
/// recycled pool nodes.
fn bench_mixed_zipf(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_zipf");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    let mut rng = SmallRng::from_os_rng();

    for &size in SIZES {
        let key_distr = Zipf::new((size * KEY_SPACE_MULTIPLIER) as f64, 1.0).unwrap();
        let operations = (0..size * 3)
            .map(|_| {
                let op = match rng.random_range(0..10) {
                    0..=3 => Operation::Search,
                    4..=7 => Operation::Insert,
                    _ => Operation::Remove,
                };
                let key = rng.sample(key_distr) as i32;
                (op, key)
            })
            .collect::<Vec<_>>();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function(format!("open_addressing/{size}"), |b| {
            b.iter_batched(
                || OpenAddressing::with_capacity(16),
                |mut table| {
                    run_operations(&mut table, &operations);
                    table
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("separate_chaining/{size}"), |b| {
            b.iter_batched(
                || SeparateChaining::with_capacity(16),
                |mut table| {
                    run_operations(&mut table, &operations);
                    table
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                Hashbrown::default,
                |mut table| {
                    for &(op, key) in &operations {
                        match op {
                            Operation::Insert => table.insert(key, key.to_string()),
                            Operation::Search => {
                                black_box(table.search(key));
                            }
                            Operation::Remove => {
                                black_box(table.remove(key));
                            }
                        }
                    }
                    table
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn run_operations<S: Store>(table: &mut S, operations: &[(Operation, i32)]) {
    for &(op, key) in operations {
        match op {
            Operation::Insert => {
                black_box(table.insert(key, key.to_string()).unwrap());
            }
            Operation::Search => {
                black_box(table.search(key));
            }
            Operation::Remove => {
                black_box(table.remove(key));
            }
        }
    }
}

criterion_group!(
    benches,
    bench_insert_random,
    bench_search,
    bench_remove,
    bench_mixed_zipf,
);

criterion_main!(benches);
