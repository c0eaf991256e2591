//! Command-line interface definitions for `ddup`.
//!
//! All arguments and subcommands use the clap derive API. Global options
//! cover verbosity and database selection; subcommands map one to one onto
//! the index operations.
//!
//! # Example
//!
//! ```bash
//! # Create a case database
//! ddup --db case.sqlite init
//!
//! # Register acquisition devices
//! ddup --db case.sqlite device add --id 1 --case incident-442 --metadata "reference image"
//!
//! # Ingest precomputed (digest, path, device, slack) tuples
//! ddup --db case.sqlite ingest observations.jsonl
//!
//! # Query the merged canonical set as JSON
//! ddup --db case.sqlite uniques --algorithm all --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::digest::HashAlgorithm;

/// Deduplication index for multi-device forensic acquisitions.
///
/// ddup indexes file observations from forensic acquisitions, collapses
/// repeated observations of identical content into one canonical row per
/// digest algorithm, and unions the per-algorithm views.
#[derive(Debug, Parser)]
#[command(name = "ddup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit errors as structured JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Path to the case database (falls back to the platform data directory)
    #[arg(long, value_name = "PATH", global = true, env = "DDUP_DB")]
    pub db: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a clean case database
    Init(InitArgs),
    /// Manage acquisition devices
    Device(DeviceArgs),
    /// Manage the known-benign digest whitelist
    Whitelist(WhitelistArgs),
    /// Append element observations from a JSON-lines stream
    Ingest(IngestArgs),
    /// Apply a case configuration file (devices + whitelist)
    Apply(ApplyArgs),
    /// Query canonical (unique, non-whitelisted) elements
    Uniques(UniquesArgs),
}

/// Arguments for the init subcommand.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing database
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the device subcommand.
#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub action: DeviceAction,
}

/// Device management actions.
#[derive(Debug, Subcommand)]
pub enum DeviceAction {
    /// Register a device (insert-or-fail; an existing id is never replaced)
    Add {
        /// Caller-assigned unique device id; lower ids win canonical ties
        #[arg(long)]
        id: i64,

        /// Case cluster identifier (non-empty, at most 60 chars)
        #[arg(long = "case", value_name = "CLUSTER")]
        case_cluster_id: String,

        /// Free-form label, mount path or similar
        #[arg(long)]
        metadata: Option<String>,
    },
    /// List registered devices
    List,
}

/// Arguments for the whitelist subcommand.
#[derive(Debug, Args)]
pub struct WhitelistArgs {
    #[command(subcommand)]
    pub action: WhitelistAction,
}

/// Whitelist management actions.
#[derive(Debug, Subcommand)]
pub enum WhitelistAction {
    /// Add a known-benign digest entry (at least one digest required)
    Add {
        /// SHA-1 digest (40 hex chars)
        #[arg(long, value_name = "DIGEST")]
        sha1: Option<String>,

        /// SHA-256 digest (64 hex chars)
        #[arg(long, value_name = "DIGEST")]
        sha256: Option<String>,

        /// MD5 digest (32 hex chars)
        #[arg(long, value_name = "DIGEST")]
        md5: Option<String>,

        /// Explanatory note
        #[arg(long)]
        note: Option<String>,
    },
    /// List whitelist entries
    List,
}

/// Arguments for the ingest subcommand.
#[derive(Debug, Args)]
pub struct IngestArgs {
    /// JSON-lines input file (stdin when omitted)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Buffered inserts per commit
    #[arg(long, value_name = "N", default_value_t = crate::store::DEFAULT_WRITE_THRESHOLD)]
    pub write_threshold: usize,
}

/// Arguments for the apply subcommand.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Case configuration file (JSON)
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the uniques subcommand.
#[derive(Debug, Args)]
pub struct UniquesArgs {
    /// Algorithm whose canonical set to resolve
    #[arg(short, long, value_enum, default_value = "all")]
    pub algorithm: AlgorithmArg,

    /// Restrict the output to rows owned by one device
    #[arg(long, value_name = "ID")]
    pub device: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Algorithm selector for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Sha1,
    Sha256,
    Md5,
    /// Union of all three canonical sets
    All,
}

impl AlgorithmArg {
    /// Convert to the resolver's algorithm, `None` meaning the merged union.
    #[must_use]
    pub fn to_algorithm(self) -> Option<HashAlgorithm> {
        match self {
            Self::Sha1 => Some(HashAlgorithm::Sha1),
            Self::Sha256 => Some(HashAlgorithm::Sha256),
            Self::Md5 => Some(HashAlgorithm::Md5),
            Self::All => None,
        }
    }

    /// Label used in output documents.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Md5 => "md5",
            Self::All => "all",
        }
    }
}

/// Output format for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}
