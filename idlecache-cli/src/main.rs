//! idlecache CLI
//!
//! Demonstrates named cache tables with idle-time expiry.

use std::any::Any;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use idlecache_core::{Entry, TableConfig};
use idlecache_registry::Registry;

/// idlecache - in-process cache tables with idle expiry
#[derive(Parser)]
#[command(name = "idlecache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (includes per-table diagnostics)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate a table through its loader, then list what survives a pause
    Demo {
        /// Number of keys to look up
        #[arg(short, long, default_value = "10")]
        keys: usize,
        /// Idle TTL given to loaded entries, in milliseconds
        #[arg(long, default_value = "5000")]
        ttl_ms: u64,
        /// Pause before listing, in milliseconds
        #[arg(long, default_value = "3000")]
        wait_ms: u64,
    },

    /// Add entries with staggered TTLs and watch sweeps reclaim them
    Watch {
        /// Number of entries to add
        #[arg(short, long, default_value = "5")]
        keys: usize,
        /// TTL of the first entry, in milliseconds; each next entry gets one more step
        #[arg(long, default_value = "200")]
        step_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "idlecache=debug,info"
    } else {
        "idlecache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = if cli.verbose {
        TableConfig::new().trace_events()
    } else {
        TableConfig::new()
    };

    match cli.command {
        Commands::Demo {
            keys,
            ttl_ms,
            wait_ms,
        } => cmd_demo(&config, keys, ttl_ms, wait_ms).await,
        Commands::Watch { keys, step_ms } => cmd_watch(&config, keys, step_ms).await,
    }
}

/// Loader-driven population, as a read-through cache would see it
async fn cmd_demo(config: &TableConfig, keys: usize, ttl_ms: u64, wait_ms: u64) -> Result<()> {
    println!("{}", "📦 Loading values through the table loader...".cyan().bold());

    let table = Registry::global().get_or_create_with::<String, String>("demo", config);
    let ttl = Duration::from_millis(ttl_ms);
    table.set_loader(move |key: &String, _: &[&dyn Any]| {
        // A real loader would read from a database, network or file here.
        Some(Entry::new(key.clone(), format!("This is a test with key {key}"), ttl))
    });

    for i in 0..keys {
        let key = format!("someKey_{i}");
        let entry = table
            .get(&key)
            .with_context(|| format!("Failed to load {key}"))?;
        println!("   {} {}", "Found value in cache:".dimmed(), entry.value());
    }

    println!("\n{} {}", "Count:".yellow(), table.count());

    tokio::time::sleep(Duration::from_millis(wait_ms)).await;

    println!("\n{}", "📋 Entries after pause:".yellow().bold());
    table.for_each(|key, entry| {
        println!("   {} {} {} {}", "Key:".dimmed(), key, "Val:".dimmed(), entry.value());
    });
    if table.is_empty() {
        println!("   {}", "(all entries expired)".dimmed());
    }

    Ok(())
}

/// Staggered expiry; the sweep wakes once per expiry instead of polling
async fn cmd_watch(config: &TableConfig, keys: usize, step_ms: u64) -> Result<()> {
    println!("{}", "⏱️  Watching idle expiry...".cyan().bold());

    let table = Registry::global().get_or_create_with::<usize, ()>("watch", config);
    table.set_delete_callback(|entry: &Entry<usize, ()>| {
        info!(
            key = entry.key(),
            idle_ms = u64::try_from(entry.last_accessed_at().elapsed().as_millis())
                .unwrap_or(u64::MAX),
            "Entry expired"
        );
    });

    for i in 0..keys {
        table.add(i, (), staggered_ttl(step_ms, i));
    }

    let pb = ProgressBar::new(keys as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} expired ({elapsed})")?
            .progress_chars("#>-"),
    );

    while !table.is_empty() {
        pb.set_position((keys - table.count()) as u64);
        tokio::time::sleep(Duration::from_millis(step_ms.max(10) / 4 + 1)).await;
    }
    pb.set_position(keys as u64);
    pb.finish_with_message("done");

    let stats = table.stats();
    println!(
        "\n{} {} entries left, next sweep: {:?}",
        "✅".green(),
        stats.total_entries,
        stats.next_sweep_in
    );

    Ok(())
}

/// Idle TTL of the `index`-th watched key: one step more than the previous.
fn staggered_ttl(step_ms: u64, index: usize) -> Duration {
    let rank = u64::try_from(index).map_or(u64::MAX, |i| i.saturating_add(1));
    Duration::from_millis(step_ms.saturating_mul(rank))
}
