//! ddup - Deduplication index for multi-device forensic acquisitions.
//!
//! Indexes file observations (digests, owning device, path, file slack)
//! collected from multiple storage devices, collapses repeated observations
//! of identical content into one canonical representative per digest
//! algorithm, filters known-benign digests through a whitelist, and unions
//! the per-algorithm canonical sets.

pub mod cli;
pub mod commands;
pub mod config;
pub mod digest;
pub mod error;
pub mod index;
pub mod logging;
pub mod output;
pub mod store;

pub use commands::run_app;
