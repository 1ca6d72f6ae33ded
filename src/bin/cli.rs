use clap::{App, Arg, SubCommand};
use pktcache::{CacheConfig, CacheError, CacheHandle, CacheRegistry, Result};
use std::{sync::Arc, thread, time::Instant};

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("pktcache-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Packet buffer cache diagnostics")
        .subcommand(
            SubCommand::with_name("run")
                .about("Drive caches with a synthetic packet workload and print the registry")
                .arg(
                    Arg::with_name("sizes")
                        .short("s")
                        .long("sizes")
                        .value_name("SIZES")
                        .help("Comma-separated size classes, one cache each")
                        .default_value("1536,2048")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("packets")
                        .short("n")
                        .long("packets")
                        .value_name("COUNT")
                        .help("Packets acquired per thread per cache")
                        .default_value("10000")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("threads")
                        .short("t")
                        .long("threads")
                        .value_name("THREADS")
                        .help("Worker threads")
                        .default_value("4")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("burst")
                        .short("b")
                        .long("burst")
                        .value_name("BURST")
                        .help("Packets held at once before releasing")
                        .default_value("32")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("share_every")
                        .long("share-every")
                        .value_name("N")
                        .help("Alias every Nth payload across its release (0 = never)")
                        .default_value("50")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("low_water")
                        .short("l")
                        .long("low-water")
                        .value_name("MARK")
                        .help("Low-water mark of each cache")
                        .default_value("10")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("ticks")
                        .long("ticks")
                        .value_name("TICKS")
                        .help("Trim ticks to run by hand after the workload")
                        .default_value("0")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Show version and default settings"),
        )
        .get_matches();

    match matches.subcommand() {
        ("run", Some(run_matches)) => handle_run(run_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

fn parse_arg(matches: &clap::ArgMatches, name: &str) -> Result<usize> {
    matches
        .value_of(name)
        .unwrap_or_default()
        .parse()
        .map_err(|_| CacheError::invalid_parameter(name, "Expected a non-negative integer"))
}

fn handle_run(matches: &clap::ArgMatches) -> Result<()> {
    let sizes = matches
        .value_of("sizes")
        .unwrap_or_default()
        .split(',')
        .map(|s| {
            s.trim().parse::<usize>().map_err(|_| {
                CacheError::invalid_parameter("sizes", format!("Invalid size '{}'", s))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let packets = parse_arg(matches, "packets")?;
    let threads = parse_arg(matches, "threads")?.max(1);
    let burst = parse_arg(matches, "burst")?.max(1);
    let share_every = parse_arg(matches, "share_every")?;
    let low_water = parse_arg(matches, "low_water")?;
    let ticks = parse_arg(matches, "ticks")?;

    let registry = CacheRegistry::global();
    let caches = sizes
        .iter()
        .map(|&size| {
            let config =
                CacheConfig::new(format!("skb-{}", size), size).with_low_water_mark(low_water);
            registry.create(config).map(Arc::new)
        })
        .collect::<Result<Vec<Arc<CacheHandle>>>>()?;

    println!("Running workload...");
    println!("  Caches: {:?}", sizes);
    println!("  Threads: {}", threads);
    println!("  Packets per thread per cache: {}", packets);

    let start = Instant::now();
    let workers: Vec<_> = (0..threads)
        .map(|_| {
            let caches = caches.clone();
            thread::spawn(move || -> Result<()> {
                for cache in &caches {
                    run_bursts(cache, packets, burst, share_every)?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .map_err(|_| CacheError::invalid_parameter("threads", "Worker thread panicked"))??;
    }
    let elapsed = start.elapsed();

    for cache in &caches {
        for _ in 0..ticks {
            cache.run_timer_tick();
        }
    }

    let total_ops = (packets * threads * caches.len()) as f64;
    println!("\nResults:");
    println!("  Total time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    println!("  Operations/sec: {:.0}", total_ops / elapsed.as_secs_f64().max(f64::EPSILON));
    for cache in &caches {
        println!("  {}: {}", cache.name(), cache.stats().summary());
    }
    println!("\n{}", registry.snapshot());

    Ok(())
}

fn run_bursts(cache: &CacheHandle, packets: usize, burst: usize, share_every: usize) -> Result<()> {
    let mut held = Vec::with_capacity(burst);
    let mut aliases = Vec::new();

    for i in 0..packets {
        let mut packet = cache.acquire()?;
        let fill = (i % 251) as u8;
        let len = packet.capacity().min(64);
        packet.put(&vec![fill; len])?;

        if share_every > 0 && i % share_every == 0 {
            aliases.push(packet.share_payload());
        }
        held.push(packet);

        if held.len() == burst {
            held.clear();
            aliases.clear();
        }
    }
    Ok(())
}

fn show_info() -> Result<()> {
    println!("pktcache v{}", pktcache::VERSION);
    println!("  Default alignment: {} bytes", pktcache::config::DEFAULT_ALIGNMENT);
    println!("  Default low-water mark: {}", pktcache::config::DEFAULT_LOW_WATER_MARK);
    println!("  Default trim interval: {:?}", pktcache::config::DEFAULT_TRIM_INTERVAL);
    Ok(())
}
