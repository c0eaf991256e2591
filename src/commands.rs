//! Command dispatch for the `ddup` binary.
//!
//! Glue between the CLI surface and the index/store layers: opens the case
//! database, runs one subcommand, and maps the result onto an exit code.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::cli::{
    Cli, Commands, DeviceAction, IngestArgs, OutputFormat, UniquesArgs, WhitelistAction,
};
use crate::config::{self, CaseConfig};
use crate::digest::{Digest, HashAlgorithm};
use crate::error::ExitCode;
use crate::index::{Device, Element, WhitelistEntry};
use crate::output::{CsvOutput, JsonOutput};
use crate::store::{CreateMode, SqliteStore};

/// Run the application logic for a parsed command line.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    crate::logging::init_logging(cli.verbose, cli.quiet);

    let db = resolve_db_path(cli.db)?;
    log::debug!("case database: {}", db.display());

    match cli.command {
        Commands::Init(args) => {
            if let Some(parent) = db.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mode = if args.force {
                CreateMode::ForceRecreate
            } else {
                CreateMode::CreateIfMissing
            };
            let store = SqliteStore::open(&db, mode)?;
            store.close()?;
            log::info!("database ready at {}", db.display());
            Ok(ExitCode::Success)
        }
        Commands::Device(args) => {
            let mut store = SqliteStore::open(&db, CreateMode::MustExist)?;
            let code = match args.action {
                DeviceAction::Add { id, case_cluster_id, metadata } => {
                    let device = Device::new(id, case_cluster_id, metadata)?;
                    store.insert_device(&device)?;
                    log::info!("registered device {id}");
                    ExitCode::Success
                }
                DeviceAction::List => {
                    let devices = store.devices()?;
                    for device in &devices {
                        println!(
                            "{}\t{}\t{}",
                            device.id(),
                            device.case_cluster_id(),
                            device.metadata().unwrap_or("-")
                        );
                    }
                    if devices.is_empty() {
                        ExitCode::EmptyResult
                    } else {
                        ExitCode::Success
                    }
                }
            };
            store.close()?;
            Ok(code)
        }
        Commands::Whitelist(args) => {
            let mut store = SqliteStore::open(&db, CreateMode::MustExist)?;
            let code = match args.action {
                WhitelistAction::Add { sha1, sha256, md5, note } => {
                    let entry = WhitelistEntry {
                        sha1: parse_digest_arg(HashAlgorithm::Sha1, sha1)?,
                        sha256: parse_digest_arg(HashAlgorithm::Sha256, sha256)?,
                        md5: parse_digest_arg(HashAlgorithm::Md5, md5)?,
                        note,
                    };
                    if entry.sha1.is_none() && entry.sha256.is_none() && entry.md5.is_none() {
                        bail!("whitelist entry needs at least one digest");
                    }
                    store.add_whitelist_entry(&entry)?;
                    log::info!("whitelist entry added");
                    ExitCode::Success
                }
                WhitelistAction::List => {
                    let entries = store.whitelist_entries()?;
                    for entry in &entries {
                        println!(
                            "{}\t{}\t{}\t{}",
                            entry.sha1.as_ref().map_or("-".into(), Digest::to_string),
                            entry.sha256.as_ref().map_or("-".into(), Digest::to_string),
                            entry.md5.as_ref().map_or("-".into(), Digest::to_string),
                            entry.note.as_deref().unwrap_or("-")
                        );
                    }
                    if entries.is_empty() {
                        ExitCode::EmptyResult
                    } else {
                        ExitCode::Success
                    }
                }
            };
            store.close()?;
            Ok(code)
        }
        Commands::Ingest(args) => {
            let store = SqliteStore::open(&db, CreateMode::MustExist)?
                .with_write_threshold(args.write_threshold);
            run_ingest(store, args)
        }
        Commands::Apply(args) => {
            let config = CaseConfig::load(&args.config)?;
            // Validate everything before the first write
            let devices = config.devices()?;
            let entries = config.whitelist_entries()?;

            let mut store = SqliteStore::open(&db, CreateMode::MustExist)?;
            for device in &devices {
                store.insert_device(device)?;
            }
            for entry in &entries {
                store.add_whitelist_entry(entry)?;
            }
            store.close()?;
            log::info!(
                "applied case file: {} devices, {} whitelist entries",
                devices.len(),
                entries.len()
            );
            Ok(ExitCode::Success)
        }
        Commands::Uniques(args) => {
            let mut store = SqliteStore::open(&db, CreateMode::MustExist)?;
            let code = run_uniques(&mut store, &args)?;
            store.close()?;
            Ok(code)
        }
    }
}

/// One element observation on the JSONL ingest stream.
///
/// Digests are hex strings, `file_slack` is base64. Produced by the external
/// extraction/hashing collaborator.
#[derive(Debug, Deserialize)]
struct IngestRecord {
    #[serde(default)]
    sha1: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    device_id: Option<i64>,
    path: String,
    #[serde(default)]
    file_slack: Option<String>,
}

impl IngestRecord {
    fn into_element(self) -> Result<Element> {
        let file_slack = self
            .file_slack
            .map(|b64| BASE64.decode(b64).context("file_slack is not valid base64"))
            .transpose()?;
        Ok(Element {
            sha1: parse_digest_arg(HashAlgorithm::Sha1, self.sha1)?,
            sha256: parse_digest_arg(HashAlgorithm::Sha256, self.sha256)?,
            md5: parse_digest_arg(HashAlgorithm::Md5, self.md5)?,
            device_id: self.device_id,
            path: self.path,
            file_slack,
        })
    }
}

fn run_ingest(mut store: SqliteStore, args: IngestArgs) -> Result<ExitCode> {
    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("failed to open ingest file {}", path.display())
        })?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut appended = 0usize;
    let mut rejected = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Malformed records are rejected per-record, never stored, and never
        // abort the run
        let element = serde_json::from_str::<IngestRecord>(&line)
            .map_err(anyhow::Error::from)
            .and_then(IngestRecord::into_element);
        match element {
            Ok(element) => {
                store.append_element(&element)?;
                appended += 1;
            }
            Err(e) => {
                log::warn!("rejected record at line {}: {e:#}", line_no + 1);
                rejected += 1;
            }
        }
    }
    store.close()?;

    log::info!("ingest complete: {appended} appended, {rejected} rejected");
    if rejected > 0 {
        Ok(ExitCode::PartialSuccess)
    } else {
        Ok(ExitCode::Success)
    }
}

fn run_uniques(store: &mut SqliteStore, args: &UniquesArgs) -> Result<ExitCode> {
    let mut rows = store.canonical_rows(args.algorithm.to_algorithm())?;
    if let Some(device_id) = args.device {
        rows.retain(|row| row.device_id == Some(device_id));
    }

    match args.output {
        OutputFormat::Json => {
            let output = JsonOutput::new(args.algorithm.label(), &rows);
            let rendered = if args.pretty {
                output.to_json_pretty()?
            } else {
                output.to_json()?
            };
            println!("{rendered}");
        }
        OutputFormat::Csv => {
            CsvOutput::new(&rows).write_to(io::stdout())?;
        }
    }

    if rows.is_empty() {
        Ok(ExitCode::EmptyResult)
    } else {
        Ok(ExitCode::Success)
    }
}

fn resolve_db_path(db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => config::default_db_path(),
    }
}

fn parse_digest_arg(algorithm: HashAlgorithm, hex: Option<String>) -> Result<Option<Digest>> {
    hex.map(|h| Digest::new(algorithm, &h).map_err(anyhow::Error::from))
        .transpose()
}
