//! # Axisweep CLI Module
//!
//! This module implements the CLI interface for axisweep.
//!
//! ## Available Commands
//!
//! - `run` - Expand a demonstration sweep and stream events as JSON lines
//! - `lengths` - Report per-axis cardinality and graph finiteness

mod commands;

use clap::{Args, Parser, Subcommand};

pub use commands::AppError;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Axisweep - deterministic sweep expansion
///
/// Declaratively describes a multi-dimensional sweep as composable axes
/// and expands it into an ordered, possibly infinite stream of events.
#[derive(Parser, Debug)]
#[command(name = "axisweep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Expand a sweep and stream its events as JSON lines
    Run {
        #[command(flatten)]
        spec: SweepSpec,

        /// Maximum number of events to emit
        #[arg(short, long)]
        limit: Option<usize>,

        /// Flag events whose successor differs only in z
        #[arg(long)]
        hold: bool,

        /// Inject a marker event at every timepoint boundary
        #[arg(long)]
        mark_time: bool,
    },

    /// Report per-axis cardinality and graph finiteness
    Lengths {
        #[command(flatten)]
        spec: SweepSpec,
    },
}

/// Shape of the demonstration sweep.
#[derive(Args, Debug)]
pub struct SweepSpec {
    /// Number of timepoints
    #[arg(short, long, default_value = "2")]
    pub timepoints: usize,

    /// Iterate time without bound instead of a fixed count
    #[arg(short, long)]
    pub unbounded: bool,

    /// Comma-separated position names
    #[arg(short, long, default_value = "P0,P1", value_delimiter = ',')]
    pub positions: Vec<String>,

    /// Number of z slices per position
    #[arg(short = 'z', long, default_value = "2")]
    pub slices: usize,

    /// Replace the first position with a nested single-slice z override
    #[arg(long)]
    pub override_first: bool,
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Execute the parsed command.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Run {
            spec,
            limit,
            hold,
            mark_time,
        } => commands::run(&spec, limit, hold, mark_time),
        Commands::Lengths { spec } => commands::lengths(&spec),
    }
}
