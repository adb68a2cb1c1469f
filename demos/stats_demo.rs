use clap::Parser;
use clap::ValueEnum;
use dual_hash::HashMap;
use dual_hash::MemoryTracker;
use dual_hash::Strategy;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Open,
    Chained,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Open => Strategy::OpenAddressing,
            StrategyArg::Chained => Strategy::SeparateChaining,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 's', long = "strategy", value_enum, default_value_t = StrategyArg::Open)]
    strategy: StrategyArg,

    #[arg(short = 'c', long = "target_capacity", default_value_t = 16)]
    target_capacity: usize,

    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: i32,

    #[arg(short = 'l', long = "load_factor")]
    load_factor: Option<f64>,

    /// Remove every other key after filling, leaving tombstones or free nodes.
    #[arg(short = 'r', long = "remove_half")]
    remove_half: bool,
}

fn main() -> Result<(), dual_hash::Error> {
    let args = Args::parse();
    let tracker = MemoryTracker::new();

    let mut builder = HashMap::builder()
        .strategy(args.strategy.into())
        .initial_capacity(args.target_capacity)
        .tracker(tracker.clone());
    if let Some(load_factor) = args.load_factor {
        builder = builder.max_load_factor(load_factor);
    }
    let mut map = builder.build()?;

    println!(
        "Created {} map, capacity {}, max load factor {:.2}",
        map.strategy(),
        map.capacity(),
        map.max_load_factor()
    );

    for key in 0..args.count {
        map.insert(key, format!("value_{key}"))?;
    }
    for key in 0..args.count {
        assert_eq!(map.search(key), Some(format!("value_{key}").as_str()));
    }
    if args.remove_half {
        for key in (0..args.count).step_by(2) {
            map.remove(key);
        }
    }

    println!("Entries: {} / capacity {}", map.len(), map.capacity());
    println!(
        "Average probes: insert {:.3}, search {:.3}, remove {:.3}",
        map.avg_insert_probes(),
        map.avg_search_probes(),
        map.avg_remove_probes()
    );
    println!("Reported memory usage: {} bytes", map.memory_usage());

    map.debug_stats().print();

    drop(map);
    let stats = tracker.stats();
    println!("Allocator activity: {stats:#?}");
    println!("Leaked after drop: {} bytes", stats.leaked());

    Ok(())
}
