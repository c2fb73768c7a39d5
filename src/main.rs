//! Multi-tenant dispatch gate.
//!
//! Gates outbound calls to shared, rate-limited downstream pools (AI
//! backends, messaging accounts, database replicas) on behalf of many
//! tenants.
//!
//! ```text
//!   business logic
//!        │ dispatch(class, tenant, call)
//!        ▼
//!  ┌──────────────┐   select    ┌──────────────┐
//!  │  invoker     │────────────▶│  registry    │── shard map / round-robin
//!  │  (failover)  │             └──────┬───────┘
//!  │              │   token            │ health, exclusion
//!  │              │────────────▶ rate limiter
//!  │              │   call             │
//!  │              │────────────▶ circuit breaker ──▶ downstream pool
//!  └──────────────┘
//!        │ health snapshot
//!        ▼
//!  admin API  ·  metrics exporter
//! ```
//!
//! This binary loads configuration, builds the service objects, and serves
//! the admin and metrics endpoints until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use dispatch_gate::admin;
use dispatch_gate::config::{load_config, GateConfig};
use dispatch_gate::lifecycle::{self, signals::wait_for_shutdown_signal, Shutdown, StartupError};
use dispatch_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dispatch-gate")]
#[command(about = "Resilient multi-tenant dispatch layer", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration, print the pool table, and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path).map_err(StartupError::from)?,
        None => GateConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-gate starting");

    let services = lifecycle::build(config)?;

    if args.check {
        println!("{:<24} {:<10} {:>8} {:>7} {:>9} {:>11}", "POOL", "CLASS", "RATE/MIN", "BURST", "SHARDS", "THRESHOLD");
        for pool in services.registry.pools() {
            let shards = pool
                .shard_range
                .as_ref()
                .map(|r| format!("{}-{}", r.start(), r.end()))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<24} {:<10} {:>8} {:>7.2} {:>9} {:>11}",
                pool.name, pool.service_class.as_str(), pool.rate_limit_per_minute, pool.burst_fraction, shards, pool.failure_threshold
            );
        }
        if let Some(replicas) = &services.replicas {
            println!("primary: {}", replicas.route_write().name);
        }
        return Ok(());
    }

    let observability = &services.config.observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();

    let admin_task = if services.config.admin.enabled {
        let address = services.config.admin.bind_address.clone();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;
        let state = services.admin_state();
        let rx = shutdown.subscribe();
        Some(tokio::spawn(admin::serve(listener, state, rx)))
    } else {
        None
    };

    wait_for_shutdown_signal().await;
    shutdown.trigger();

    if let Some(task) = admin_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin server failed"),
            Err(e) => tracing::error!(error = %e, "Admin server task panicked"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
