//! # Axisweep - Sweep Expansion CLI
//!
//! The main binary for the axisweep sweep-expansion engine.
//!
//! This application builds demonstration axis graphs from command-line
//! flags and streams their expanded events as JSON lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               apps/axisweep (THE BINARY)         │
//! │                                                  │
//! │   ┌─────────────┐          ┌─────────────────┐   │
//! │   │    CLI      │          │  JSON output    │   │
//! │   │   (clap)    │          │  (serde_json)   │   │
//! │   └──────┬──────┘          └────────┬────────┘   │
//! │          │                          │            │
//! │          └────────────┬─────────────┘            │
//! │                       ▼                          │
//! │              ┌─────────────────┐                 │
//! │              │  axisweep-core  │                 │
//! │              │  (THE ENGINE)   │                 │
//! │              └─────────────────┘                 │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Expand the default 2x2x2 sweep
//! axisweep run
//!
//! # Unbounded time axis, capped output, with run-boundary markers
//! axisweep run --unbounded --limit 20 --mark-time
//!
//! # Report axis cardinalities
//! axisweep lengths --unbounded
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — AXISWEEP_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("AXISWEEP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "axisweep=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the axisweep startup banner.
fn print_banner() {
    eprintln!(
        "axisweep v{} — deterministic sweep expansion",
        env!("CARGO_PKG_VERSION")
    );
}
