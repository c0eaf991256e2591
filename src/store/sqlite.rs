//! SQLite-backed persistent element store.
//!
//! Persists devices, elements and whitelist entries, and exposes the four
//! derived read-only views: one canonical set per algorithm plus their union.
//! The views encode the same election rule as the in-memory resolver
//! (partition by digest, order by `device_id IS NULL, device_id, id`), so a
//! database queried through the views and a database loaded into a
//! [`DedupIndex`] agree row for row.
//!
//! Writes are batched: inserts accumulate inside an open transaction and are
//! committed every `write_threshold` rows. Query methods flush pending
//! writes first so readers always see a consistent snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;

use crate::digest::{Digest, DigestError, HashAlgorithm};
use crate::index::{
    CanonicalElement, DedupIndex, Device, Element, RegistryError, Whitelist, WhitelistEntry,
};

/// Default number of buffered inserts before an intermediate commit.
pub const DEFAULT_WRITE_THRESHOLD: usize = 1000;

const SETUP_SCRIPT: &str = "\
CREATE TABLE devices (
    id              INTEGER PRIMARY KEY,
    case_cluster_id VARCHAR(60) NOT NULL,
    metadata        TEXT
);

CREATE TABLE elements (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    sha1      CHAR(40),
    sha256    CHAR(64),
    md5       CHAR(32),
    device_id INTEGER,
    path      TEXT,
    file_slack BLOB
);

CREATE INDEX idx_elements_sha1   ON elements (sha1);
CREATE INDEX idx_elements_sha256 ON elements (sha256);
CREATE INDEX idx_elements_md5    ON elements (md5);

CREATE TABLE whitelist (
    sha1   CHAR(40),
    sha256 CHAR(64),
    md5    CHAR(32),
    note   TEXT
);

CREATE VIEW unique_sha1 AS
SELECT sha1, sha256, md5, device_id, path, file_slack
FROM (
    SELECT e.*, ROW_NUMBER() OVER (
        PARTITION BY e.sha1
        ORDER BY e.device_id IS NULL, e.device_id, e.id
    ) AS pick
    FROM elements AS e
    WHERE e.sha1 IS NOT NULL
      AND NOT EXISTS (SELECT 1 FROM whitelist AS w WHERE w.sha1 = e.sha1)
)
WHERE pick = 1;

CREATE VIEW unique_sha256 AS
SELECT sha1, sha256, md5, device_id, path, file_slack
FROM (
    SELECT e.*, ROW_NUMBER() OVER (
        PARTITION BY e.sha256
        ORDER BY e.device_id IS NULL, e.device_id, e.id
    ) AS pick
    FROM elements AS e
    WHERE e.sha256 IS NOT NULL
      AND NOT EXISTS (SELECT 1 FROM whitelist AS w WHERE w.sha256 = e.sha256)
)
WHERE pick = 1;

CREATE VIEW unique_md5 AS
SELECT sha1, sha256, md5, device_id, path, file_slack
FROM (
    SELECT e.*, ROW_NUMBER() OVER (
        PARTITION BY e.md5
        ORDER BY e.device_id IS NULL, e.device_id, e.id
    ) AS pick
    FROM elements AS e
    WHERE e.md5 IS NOT NULL
      AND NOT EXISTS (SELECT 1 FROM whitelist AS w WHERE w.md5 = e.md5)
)
WHERE pick = 1;

CREATE VIEW unique_all AS
SELECT * FROM unique_sha1
UNION
SELECT * FROM unique_sha256
UNION
SELECT * FROM unique_md5;
";

/// How [`SqliteStore::open`] treats a missing or pre-existing database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Fail if the database file does not exist.
    MustExist,
    /// Create a clean database if the file is missing, open otherwise.
    CreateIfMissing,
    /// Always create a clean database, overwriting any existing file.
    ForceRecreate,
}

/// Errors from the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file absent and [`CreateMode::MustExist`] requested.
    #[error("database not found at {0} and no create specified")]
    DatabaseMissing(PathBuf),

    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure (removing a database for recreation).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Device registration conflict or invalid device row.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Stored digest failed validation on load.
    #[error("stored digest is malformed: {0}")]
    Digest(#[from] DigestError),
}

/// Persistent store over a single SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    pending: usize,
    write_threshold: usize,
}

impl SqliteStore {
    /// Open (or create, per `mode`) a database at `path`.
    pub fn open(path: &Path, mode: CreateMode) -> Result<Self, StoreError> {
        let exists = path.exists();
        match mode {
            CreateMode::MustExist if !exists => {
                return Err(StoreError::DatabaseMissing(path.to_path_buf()));
            }
            CreateMode::ForceRecreate if exists => {
                log::warn!("overwriting existing database at {}", path.display());
                fs::remove_file(path)?;
            }
            _ => {}
        }
        let create = !path.exists();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        if create {
            log::info!("creating clean database at {}", path.display());
            conn.execute_batch(SETUP_SCRIPT)?;
        }
        // Inserts run inside a long-lived transaction, committed in batches
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            pending: 0,
            write_threshold: DEFAULT_WRITE_THRESHOLD,
        })
    }

    /// Open an in-memory database with a clean schema. Used by tests and
    /// throwaway resolutions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SETUP_SCRIPT)?;
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            pending: 0,
            write_threshold: DEFAULT_WRITE_THRESHOLD,
        })
    }

    /// Override the batched-write threshold. Zero or negative-like input is
    /// not representable; a threshold of 1 commits every insert.
    #[must_use]
    pub fn with_write_threshold(mut self, threshold: usize) -> Self {
        self.write_threshold = threshold.max(1);
        self
    }

    /// Insert a device row, failing on id collision with the existing row
    /// left untouched.
    pub fn insert_device(&mut self, device: &Device) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO devices (id, case_cluster_id, metadata) VALUES (?1, ?2, ?3)",
            params![device.id(), device.case_cluster_id(), device.metadata()],
        );
        match result {
            Ok(_) => {
                self.bump_pending()?;
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(RegistryError::DuplicateDeviceId(device.id()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Append an element row. Returns the database row id.
    pub fn append_element(&mut self, element: &Element) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO elements (sha1, sha256, md5, device_id, path, file_slack)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                element.sha1.as_ref().map(Digest::as_hex),
                element.sha256.as_ref().map(Digest::as_hex),
                element.md5.as_ref().map(Digest::as_hex),
                element.device_id,
                element.path,
                element.file_slack,
            ],
        )?;
        let row_id = self.conn.last_insert_rowid();
        self.bump_pending()?;
        Ok(row_id)
    }

    /// Insert a whitelist entry.
    pub fn add_whitelist_entry(&mut self, entry: &WhitelistEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO whitelist (sha1, sha256, md5, note) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.sha1.as_ref().map(Digest::as_hex),
                entry.sha256.as_ref().map(Digest::as_hex),
                entry.md5.as_ref().map(Digest::as_hex),
                entry.note,
            ],
        )?;
        self.bump_pending()?;
        Ok(())
    }

    /// All device rows, ascending by id.
    pub fn devices(&mut self) -> Result<Vec<Device>, StoreError> {
        self.flush()?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, case_cluster_id, metadata FROM devices ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        rows.into_iter()
            .map(|(id, cluster, metadata)| Ok(Device::new(id, cluster, metadata)?))
            .collect()
    }

    /// All whitelist rows, in insertion order.
    pub fn whitelist_entries(&mut self) -> Result<Vec<WhitelistEntry>, StoreError> {
        self.flush()?;
        let mut stmt = self
            .conn
            .prepare("SELECT sha1, sha256, md5, note FROM whitelist ORDER BY rowid ASC")?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        raw.into_iter()
            .map(|(sha1, sha256, md5, note)| {
                Ok(WhitelistEntry {
                    sha1: parse_opt_digest(HashAlgorithm::Sha1, sha1)?,
                    sha256: parse_opt_digest(HashAlgorithm::Sha256, sha256)?,
                    md5: parse_opt_digest(HashAlgorithm::Md5, md5)?,
                    note,
                })
            })
            .collect()
    }

    /// Canonical rows from one per-algorithm view, or from the union view
    /// when `algorithm` is `None`. `device_known` is computed against the
    /// devices table.
    pub fn canonical_rows(
        &mut self,
        algorithm: Option<HashAlgorithm>,
    ) -> Result<Vec<CanonicalElement>, StoreError> {
        self.flush()?;
        let view = match algorithm {
            Some(HashAlgorithm::Sha1) => "unique_sha1",
            Some(HashAlgorithm::Sha256) => "unique_sha256",
            Some(HashAlgorithm::Md5) => "unique_md5",
            None => "unique_all",
        };
        let sql = format!(
            "SELECT v.sha1, v.sha256, v.md5, v.device_id, v.path, v.file_slack,
                    EXISTS (SELECT 1 FROM devices AS d WHERE d.id = v.device_id)
             FROM {view} AS v"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<Vec<u8>>>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        raw.into_iter()
            .map(|(sha1, sha256, md5, device_id, path, file_slack, device_known)| {
                Ok(CanonicalElement {
                    sha1: parse_opt_digest(HashAlgorithm::Sha1, sha1)?,
                    sha256: parse_opt_digest(HashAlgorithm::Sha256, sha256)?,
                    md5: parse_opt_digest(HashAlgorithm::Md5, md5)?,
                    device_id,
                    path: path.unwrap_or_default(),
                    file_slack,
                    device_known,
                })
            })
            .collect()
    }

    /// Paths of canonical rows owned by one device, ascending by path.
    pub fn uniques_for_device(&mut self, device_id: i64) -> Result<Vec<String>, StoreError> {
        self.flush()?;
        let mut stmt = self.conn.prepare(
            "SELECT path FROM unique_all WHERE device_id = ?1 ORDER BY path ASC",
        )?;
        let paths = stmt
            .query_map([device_id], |row| {
                row.get::<_, Option<String>>(0).map(Option::unwrap_or_default)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(paths)
    }

    /// Load the whole database into an in-memory [`DedupIndex`] snapshot.
    ///
    /// Elements are loaded ascending by row id so the in-memory insertion
    /// sequence reproduces the database tie-break order.
    pub fn load_index(&mut self) -> Result<DedupIndex, StoreError> {
        self.flush()?;
        let mut index = DedupIndex::new();

        for device in self.devices()? {
            index.devices.register(device)?;
        }

        let mut stmt = self.conn.prepare(
            "SELECT sha1, sha256, md5, device_id, path, file_slack
             FROM elements ORDER BY id ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<Vec<u8>>>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        for (sha1, sha256, md5, device_id, path, file_slack) in raw {
            let element = Element {
                sha1: parse_opt_digest(HashAlgorithm::Sha1, sha1)?,
                sha256: parse_opt_digest(HashAlgorithm::Sha256, sha256)?,
                md5: parse_opt_digest(HashAlgorithm::Md5, md5)?,
                device_id,
                path: path.unwrap_or_default(),
                file_slack,
            };
            index.elements.append(element);
        }

        let mut whitelist = Whitelist::new();
        for entry in self.whitelist_entries()? {
            whitelist.add(entry);
        }
        index.whitelist = whitelist;

        log::debug!(
            "loaded snapshot: {} devices, {} elements, {} whitelist entries",
            index.devices.len(),
            index.elements.len(),
            index.whitelist.len()
        );
        Ok(index)
    }

    /// Commit pending writes and reopen the batch transaction.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT; BEGIN")?;
        self.pending = 0;
        Ok(())
    }

    /// Commit everything and close the connection ("close on success").
    pub fn close(self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    /// Roll back pending writes and close ("close on failure").
    pub fn abort(self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    fn bump_pending(&mut self) -> Result<(), StoreError> {
        self.pending += 1;
        if self.pending >= self.write_threshold {
            log::trace!("write threshold reached, committing batch of {}", self.pending);
            self.flush()?;
        }
        Ok(())
    }
}

fn parse_opt_digest(
    algorithm: HashAlgorithm,
    hex: Option<String>,
) -> Result<Option<Digest>, DigestError> {
    hex.map(|h| Digest::new(algorithm, &h)).transpose()
}
