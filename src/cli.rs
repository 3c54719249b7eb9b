// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `depengine`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "depengine",
    version,
    about = "Exercise the dependency engine with synthetic workloads.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPENGINE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Push a randomized read/write workload and check exclusivity.
    Stress(StressArgs),
    /// Parse + validate a config file and print the result.
    CheckConfig {
        /// Path to the config file (TOML).
        #[arg(long, value_name = "PATH", default_value = "Depengine.toml")]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct StressArgs {
    /// Optional config file; otherwise `DEPENGINE_CONFIG` / defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of variables.
    #[arg(long, default_value_t = 16)]
    pub vars: usize,

    /// Number of operations to push.
    #[arg(long, default_value_t = 10_000)]
    pub ops: usize,

    /// Maximum variables touched by one operation.
    #[arg(long, default_value_t = 3)]
    pub fan_in: usize,

    /// Probability that a touched variable is written rather than read.
    #[arg(long, default_value_t = 0.3)]
    pub write_ratio: f64,

    /// Upper bound on simulated work per operation, in microseconds.
    #[arg(long, default_value_t = 50)]
    pub max_work_us: u64,

    /// RNG seed, for reproducible workloads.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
