//! Scan demo: fills an in-memory hash, walks it with a paginated cursor while
//! erasing some entries, and checks the result against a bulk read.
//!
//! # Usage
//!
//! ```sh
//! scan-demo --entries 1000 --page-size 32 --empty-page-interval 4 --erase-every 3
//! RUST_LOG=remote_hash_core=debug scan-demo --binarize
//! ```

use std::collections::BTreeSet;

use anyhow::{ensure, Result};
use clap::Parser;
use remote_hash_core::{HashConfig, RemoteHash};
use remote_hash_store::{Keyspace, MemoryHash, StoreConfig};
use tracing::info;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "scan-demo")]
#[command(about = "Walk an in-memory remote hash with a paginated cursor")]
struct Args {
    /// Number of entries to seed.
    #[arg(short, long, default_value_t = 1000, env = "SCAN_DEMO_ENTRIES")]
    entries: u32,

    /// Pairs requested per scan call.
    #[arg(short, long, default_value_t = 32, env = "SCAN_DEMO_PAGE_SIZE")]
    page_size: usize,

    /// Encode keys and values as fixed-width big-endian bytes.
    #[arg(short, long, env = "SCAN_DEMO_BINARIZE")]
    binarize: bool,

    /// Every n-th scan call returns an empty, non-terminal page.
    #[arg(long, env = "SCAN_DEMO_EMPTY_PAGE_INTERVAL")]
    empty_page_interval: Option<usize>,

    /// Erase every n-th visited entry during the walk. 0 disables.
    #[arg(long, default_value_t = 0, env = "SCAN_DEMO_ERASE_EVERY")]
    erase_every: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let keyspace = Keyspace::new(StoreConfig {
        empty_page_interval: args.empty_page_interval,
    });
    let config = HashConfig::default()
        .with_page_size(args.page_size)
        .with_binarize(args.binarize);
    let map: RemoteHash<u32, u64, MemoryHash> = RemoteHash::new(keyspace.hash("demo"), config);

    for i in 0..args.entries {
        map.insert(&i, &(u64::from(i) * 10), false)?;
    }
    info!(collection = map.name(), entries = map.len()?, "seeded");

    let mut visited = 0u64;
    let mut erased = 0u64;
    let mut it = map.iter()?;
    while !it.is_end() {
        let key = *it.key()?;
        let value = *it.value()?;
        ensure!(value == u64::from(key) * 10, "key {key} holds {value}");
        visited += 1;
        if args.erase_every > 0 && visited % args.erase_every == 0 {
            it = map.erase(it, true)?;
            erased += 1;
        } else {
            it.advance(1)?;
        }
    }
    let scan_calls = map.commands().scan_calls();
    info!(visited, erased, scan_calls, "walk finished");

    let bulk: BTreeSet<u32> = map.keys(0)?.into_iter().collect();
    let paged: BTreeSet<u32> = map.keys(args.page_size.max(1))?.into_iter().collect();
    ensure!(bulk == paged, "bulk and paginated key sets differ");
    ensure!(
        visited == u64::from(args.entries),
        "visited {visited} of {} entries",
        args.entries
    );

    info!(
        remaining = bulk.len(),
        extra_scan_calls = map.commands().scan_calls() - scan_calls,
        "bulk and paginated reads agree"
    );
    Ok(())
}
