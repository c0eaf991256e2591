//! CSV output formatter for canonical sets.
//!
//! One row per canonical element.
//!
//! # Columns
//!
//! - `sha1`, `sha256`, `md5`: digests (empty when not computed)
//! - `device_id`: owning device (empty for unknown provenance)
//! - `path`: original location on the source device
//! - `file_slack`: base64-encoded slack payload (empty when not captured)
//! - `device_known`: whether the device reference resolves in the registry

use std::io;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;

use crate::digest::Digest;
use crate::index::CanonicalElement;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow {
    sha1: Option<String>,
    sha256: Option<String>,
    md5: Option<String>,
    device_id: Option<i64>,
    path: String,
    file_slack: Option<String>,
    device_known: bool,
}

/// CSV formatter over resolved canonical rows.
#[derive(Debug)]
pub struct CsvOutput<'a> {
    rows: &'a [CanonicalElement],
}

impl<'a> CsvOutput<'a> {
    /// Create a formatter for the given rows.
    #[must_use]
    pub fn new(rows: &'a [CanonicalElement]) -> Self {
        Self { rows }
    }

    /// Write CSV (with header) to the given writer.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        // serialize() only emits the header alongside the first record, so an
        // empty set needs it written by hand
        if self.rows.is_empty() {
            csv_writer.write_record([
                "sha1",
                "sha256",
                "md5",
                "device_id",
                "path",
                "file_slack",
                "device_known",
            ])?;
        }
        for row in self.rows {
            csv_writer.serialize(CsvRow {
                sha1: row.sha1.as_ref().map(Digest::to_string),
                sha256: row.sha256.as_ref().map(Digest::to_string),
                md5: row.md5.as_ref().map(Digest::to_string),
                device_id: row.device_id,
                path: row.path.clone(),
                file_slack: row.file_slack.as_ref().map(|s| BASE64.encode(s)),
                device_known: row.device_known,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Render to an in-memory string.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::HashAlgorithm;

    #[test]
    fn test_csv_header_and_rows() {
        let rows = vec![CanonicalElement {
            sha1: Some(Digest::new(HashAlgorithm::Sha1, &"a".repeat(40)).unwrap()),
            sha256: None,
            md5: None,
            device_id: Some(2),
            path: "/evidence/file.bin".into(),
            file_slack: None,
            device_known: false,
        }];

        let rendered = CsvOutput::new(&rows).to_string().unwrap();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next().unwrap(),
            "sha1,sha256,md5,device_id,path,file_slack,device_known"
        );
        let data = lines.next().unwrap();
        assert!(data.starts_with(&"a".repeat(40)));
        assert!(data.contains("/evidence/file.bin"));
        assert!(data.ends_with("false"));
    }

    #[test]
    fn test_empty_rows_header_only() {
        let rendered = CsvOutput::new(&[]).to_string().unwrap();
        assert_eq!(rendered.lines().count(), 1);
    }
}
