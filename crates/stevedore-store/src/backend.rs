//! SQLite metadata backend
//!
//! Holds accounts, repositories and package records. Package content lives
//! in the blob store; the backend only keeps the envelope of each package.
//! A fresh backend can be created at any path, which is how installers get
//! their own isolated database.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use semver::Version;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use stevedore_core::{Labels, Locator, Manifest, PackageEnvelope};

use crate::error::{Result, StoreError};

/// File name of the metadata database inside a state directory
pub const BACKEND_FILE_NAME: &str = "gravity.db";

/// Account owning the packages of a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub org: String,
}

impl Account {
    pub fn new(id: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            org: org.into(),
        }
    }
}

/// Repository record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub name: String,
    /// `None` means the repository never expires
    pub expires: Option<DateTime<Utc>>,
}

/// SQLite metadata backend
pub struct Backend {
    conn: Mutex<Connection>,
}

impl Backend {
    /// Open or create a backend at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;

        let backend = Self {
            conn: Mutex::new(conn),
        };
        backend.init()?;
        Ok(backend)
    }

    /// Open an existing backend without write access
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open in-memory backend (for testing)
    pub fn open_memory() -> Result<Self> {
        let backend = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        backend.init()?;
        Ok(backend)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize database schema
    fn init(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                org TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS repositories (
                name TEXT PRIMARY KEY,
                expires INTEGER
            );

            CREATE TABLE IF NOT EXISTS packages (
                repository TEXT NOT NULL REFERENCES repositories(name) ON DELETE CASCADE,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                size_bytes INTEGER NOT NULL,
                sha256 TEXT NOT NULL,
                labels TEXT NOT NULL,
                manifest TEXT,
                created INTEGER NOT NULL,
                PRIMARY KEY (repository, name, version)
            );

            CREATE INDEX IF NOT EXISTS idx_packages_sha256 ON packages(sha256);
            "#,
        )?;

        Ok(())
    }

    // ============ Accounts ============

    /// Create a new account, failing if the id is taken
    ///
    /// An empty id is replaced with a generated one.
    pub fn create_account(&self, account: &Account) -> Result<Account> {
        let mut account = account.clone();
        if account.id.is_empty() {
            account.id = generate_account_id();
        }

        if self.find_account(&account.id)?.is_some() {
            return Err(StoreError::AccountAlreadyExists { id: account.id });
        }

        self.conn().execute(
            "INSERT INTO accounts (id, org) VALUES (?1, ?2)",
            params![account.id, account.org],
        )?;

        Ok(account)
    }

    /// Get an account by id
    pub fn get_account(&self, id: &str) -> Result<Account> {
        self.find_account(id)?
            .ok_or_else(|| StoreError::AccountNotFound { id: id.to_string() })
    }

    fn find_account(&self, id: &str) -> Result<Option<Account>> {
        let account = self
            .conn()
            .query_row(
                "SELECT id, org FROM accounts WHERE id = ?1",
                [id],
                |row| {
                    Ok(Account {
                        id: row.get(0)?,
                        org: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    // ============ Repositories ============

    /// Add or update a repository
    pub fn upsert_repository(&self, name: &str, expires: Option<DateTime<Utc>>) -> Result<()> {
        self.conn().execute(
            r#"
            INSERT INTO repositories (name, expires) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET expires = excluded.expires
            "#,
            params![name, expires.map(|t| t.timestamp())],
        )?;
        Ok(())
    }

    /// Get a repository by name
    pub fn get_repository(&self, name: &str) -> Result<Option<RepositoryRecord>> {
        let record = self
            .conn()
            .query_row(
                "SELECT name, expires FROM repositories WHERE name = ?1",
                [name],
                |row| {
                    let expires: Option<i64> = row.get(1)?;
                    Ok(RepositoryRecord {
                        name: row.get(0)?,
                        expires: expires.and_then(|t| DateTime::from_timestamp(t, 0)),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// List repository names
    pub fn get_repositories(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM repositories ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    // ============ Packages ============

    /// Insert a package record, failing if the locator is taken
    pub fn insert_package(&self, envelope: &PackageEnvelope) -> Result<()> {
        if self.get_package(&envelope.locator)?.is_some() {
            return Err(StoreError::PackageAlreadyExists {
                locator: envelope.locator.clone(),
            });
        }

        let labels = serde_json::to_string(&envelope.runtime_labels)?;
        let manifest = envelope
            .manifest
            .as_ref()
            .map(Manifest::to_yaml)
            .transpose()?;
        let loc = &envelope.locator;

        self.conn().execute(
            r#"
            INSERT INTO packages (repository, name, version, size_bytes, sha256, labels, manifest, created)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                loc.repository,
                loc.name,
                loc.version.to_string(),
                envelope.size_bytes as i64,
                envelope.sha256,
                labels,
                manifest,
                envelope.created.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Get a package record by locator
    pub fn get_package(&self, locator: &Locator) -> Result<Option<PackageEnvelope>> {
        let row = self
            .conn()
            .query_row(
                &format!("{} WHERE repository = ?1 AND name = ?2 AND version = ?3", SELECT_PACKAGE),
                params![locator.repository, locator.name, locator.version.to_string()],
                PackageRow::from_row,
            )
            .optional()?;
        row.map(PackageRow::into_envelope).transpose()
    }

    /// List packages of a repository, ordered by name and version
    pub fn list_packages(&self, repository: &str) -> Result<Vec<PackageEnvelope>> {
        let rows = {
            let conn = self.conn();
            let mut stmt = conn.prepare(&format!("{} WHERE repository = ?1", SELECT_PACKAGE))?;
            stmt.query_map([repository], PackageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut envelopes = rows
            .into_iter()
            .map(PackageRow::into_envelope)
            .collect::<Result<Vec<_>>>()?;
        envelopes.sort_by(|a, b| a.locator.cmp(&b.locator));
        Ok(envelopes)
    }

    /// Delete a package record; returns false if it did not exist
    pub fn delete_package(&self, locator: &Locator) -> Result<bool> {
        let deleted = self.conn().execute(
            "DELETE FROM packages WHERE repository = ?1 AND name = ?2 AND version = ?3",
            params![locator.repository, locator.name, locator.version.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Number of packages whose content has the given digest
    pub fn count_content_refs(&self, sha256: &str) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM packages WHERE sha256 = ?1",
            [sha256],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn generate_account_id() -> String {
    let seed = format!(
        "{}:{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    hex::encode(&Sha256::digest(seed.as_bytes())[..16])
}

const SELECT_PACKAGE: &str =
    "SELECT repository, name, version, size_bytes, sha256, labels, manifest, created FROM packages";

/// Raw package row before envelope conversion
struct PackageRow {
    repository: String,
    name: String,
    version: String,
    size_bytes: i64,
    sha256: String,
    labels: String,
    manifest: Option<String>,
    created: i64,
}

impl PackageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            repository: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            size_bytes: row.get(3)?,
            sha256: row.get(4)?,
            labels: row.get(5)?,
            manifest: row.get(6)?,
            created: row.get(7)?,
        })
    }

    fn into_envelope(self) -> Result<PackageEnvelope> {
        let version = Version::parse(&self.version).map_err(stevedore_core::CoreError::from)?;
        let locator = Locator::new(self.repository, self.name, version)?;
        let runtime_labels: Labels = serde_json::from_str(&self.labels)?;
        let manifest = self.manifest.as_deref().map(Manifest::parse).transpose()?;

        Ok(PackageEnvelope {
            locator,
            size_bytes: self.size_bytes as u64,
            sha256: self.sha256,
            runtime_labels,
            manifest,
            created: DateTime::from_timestamp(self.created, 0).unwrap_or_default(),
        })
    }
}
