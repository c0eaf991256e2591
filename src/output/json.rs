//! JSON output formatter for canonical sets.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "algorithm": "sha1",
//!   "count": 2,
//!   "uniques": [
//!     {
//!       "sha1": "aaaa...",
//!       "sha256": null,
//!       "md5": null,
//!       "device_id": 1,
//!       "path": "/evidence/a",
//!       "file_slack": "3q2+7w==",
//!       "device_known": true
//!     }
//!   ]
//! }
//! ```
//!
//! File slack is base64-encoded; absent fields are `null`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::digest::Digest;
use crate::index::CanonicalElement;

/// A single canonical row in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonCanonicalRow {
    pub sha1: Option<String>,
    pub sha256: Option<String>,
    pub md5: Option<String>,
    pub device_id: Option<i64>,
    pub path: String,
    /// Base64-encoded slack payload
    pub file_slack: Option<String>,
    pub device_known: bool,
}

impl From<&CanonicalElement> for JsonCanonicalRow {
    fn from(row: &CanonicalElement) -> Self {
        Self {
            sha1: row.sha1.as_ref().map(Digest::to_string),
            sha256: row.sha256.as_ref().map(Digest::to_string),
            md5: row.md5.as_ref().map(Digest::to_string),
            device_id: row.device_id,
            path: row.path.clone(),
            file_slack: row.file_slack.as_ref().map(|s| BASE64.encode(s)),
            device_known: row.device_known,
        }
    }
}

/// Complete JSON document for one query.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    /// Algorithm the set was resolved under ("all" for the merged union)
    pub algorithm: String,
    /// Number of canonical rows
    pub count: usize,
    /// The canonical rows
    pub uniques: Vec<JsonCanonicalRow>,
}

impl JsonOutput {
    /// Build the document from resolved rows.
    #[must_use]
    pub fn new(algorithm: &str, rows: &[CanonicalElement]) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            count: rows.len(),
            uniques: rows.iter().map(JsonCanonicalRow::from).collect(),
        }
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
