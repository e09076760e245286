// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frugal - a cost-aware LLM query router.
//!
//! This is the binary entry point for the `frugal` command line tool.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod bench;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use frugal_config::FrugalConfig;
use frugal_router::ClassifierRules;

/// Frugal - route each query to the cheapest model that can answer it.
#[derive(Parser, Debug)]
#[command(name = "frugal", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a query and print the result as JSON.
    Classify {
        /// The query text.
        text: String,
    },
    /// Load and validate the configuration.
    CheckConfig,
    /// Route a built-in query corpus through a simulated provider.
    Bench {
        /// How many times to route the corpus. Rounds after the first hit the cache.
        #[arg(long, default_value_t = 3)]
        rounds: usize,
        /// Print Prometheus metrics after the report.
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => frugal_config::load_and_validate_path(path),
        None => frugal_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            frugal_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Classify { text }) => classify(&config, &text),
        Some(Commands::CheckConfig) => {
            check_config(&config);
            Ok(())
        }
        Some(Commands::Bench { rounds, metrics }) => run_bench(config, rounds, metrics).await,
        None => {
            println!("frugal: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn classify(config: &FrugalConfig, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let rules = ClassifierRules::from_config(&config.classifier)?;
    let result = rules.classify(text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn check_config(config: &FrugalConfig) {
    let routing = &config.routing;
    println!("configuration ok ({})", config.service.name);
    println!(
        "  routing: simple={} medium={} complex={} reference={}{}",
        routing.simple_provider,
        routing.medium_provider,
        routing.complex_provider,
        routing.reference_provider,
        if routing.enabled { "" } else { " (disabled)" }
    );
    println!(
        "  cache: enabled={} threshold={} ttl={}s capacity={} eviction={}",
        config.cache.enabled,
        config.cache.similarity_threshold,
        config.cache.ttl_secs,
        config.cache.capacity,
        config.cache.eviction
    );
    println!("  providers: {}", config.providers.len());
}

async fn run_bench(
    config: FrugalConfig,
    rounds: usize,
    metrics: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let exporter = if metrics {
        Some(frugal_prometheus::PrometheusExporter::install()?)
    } else {
        None
    };

    info!(rounds, "starting benchmark");
    let mut report = bench::run(config, rounds).await?;
    report.heap_allocated_bytes = heap_allocated_bytes();
    if let Some(bytes) = report.heap_allocated_bytes {
        frugal_prometheus::set_memory_heap(bytes as f64);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(exporter) = exporter {
        println!("{}", exporter.render());
    }
    Ok(())
}

#[cfg(not(target_env = "msvc"))]
fn heap_allocated_bytes() -> Option<u64> {
    // Stats are cached until the epoch advances.
    tikv_jemalloc_ctl::epoch::advance().ok()?;
    tikv_jemalloc_ctl::stats::allocated::read()
        .ok()
        .map(|bytes| bytes as u64)
}

#[cfg(target_env = "msvc")]
fn heap_allocated_bytes() -> Option<u64> {
    None
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("frugal={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    #[serial_test::serial]
    fn binary_loads_config_defaults() {
        let config = frugal_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.service.name, "frugal");
    }

    #[test]
    fn classify_uses_rules_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frugal.toml");
        std::fs::write(&path, "[classifier]\nsimple_max_score = 0\nmedium_max_score = 1\n")
            .unwrap();

        let config = frugal_config::load_and_validate_path(&path).unwrap();
        assert_eq!(config.classifier.medium_max_score, 1);
        classify(&config, "Why is the sky blue?").unwrap();
    }

    #[test]
    fn cli_parses_bench_flags() {
        let cli = Cli::parse_from(["frugal", "bench", "--rounds", "5", "--metrics"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Bench {
                rounds: 5,
                metrics: true
            })
        ));
    }

    #[test]
    fn cli_accepts_global_config_path() {
        let cli = Cli::parse_from(["frugal", "classify", "hello", "--config", "/tmp/frugal.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/frugal.toml")));
        assert!(matches!(cli.command, Some(Commands::Classify { ref text }) if text == "hello"));
    }
}
