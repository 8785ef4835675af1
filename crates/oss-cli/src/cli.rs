use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use oss_types::Version;

#[derive(Parser)]
#[command(
    name = "ossync",
    about = "Versioned object stores with two-way reconciliation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration naming both replicas
    #[arg(long, global = true, default_value = "ossync.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// One of the two configured replicas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a file as the next version of an object
    Put(PutArgs),
    /// Fetch an object's latest or a specific version
    Get(GetArgs),
    /// Show an object's version history
    Log(LogArgs),
    /// List objects with their latest version
    Ls(LsArgs),
    /// Show what a sync would do without applying it
    Plan(PlanArgs),
    /// Reconcile the two replicas
    Sync(SyncArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub side: Side,
    pub key: String,
    pub file: PathBuf,
    /// Explicit version; must exceed the latest recorded one
    #[arg(long)]
    pub version: Option<Version>,
}

#[derive(Args)]
pub struct GetArgs {
    pub side: Side,
    pub key: String,
    #[arg(long)]
    pub version: Option<Version>,
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct LogArgs {
    pub side: Side,
    pub key: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub side: Side,
}

#[derive(Args)]
pub struct PlanArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Stop scheduling copies after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}
