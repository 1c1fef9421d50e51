//! Package store
//!
//! `PackageService` is the seam the mirror and bundler work against.
//! `LocalPackages` implements it over a SQLite backend and a blob store
//! rooted at a single directory.

use chrono::{DateTime, Utc};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use stevedore_core::{Labels, Locator, Manifest, PackageEnvelope};
use tracing::debug;

use crate::backend::{BACKEND_FILE_NAME, Backend};
use crate::blobs::BlobStore;
use crate::error::{Result, StoreError};

/// Directory holding package content inside a state directory
pub const PACKAGES_DIR: &str = "packages";

/// Options attached to a package when it is created
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    pub labels: Labels,
    pub manifest: Option<Manifest>,
}

impl PackageOptions {
    pub fn with_labels(labels: Labels) -> Self {
        Self {
            labels,
            manifest: None,
        }
    }
}

/// Package content stream
pub type PackageReader = Box<dyn Read + Send>;

/// Operations on a package store
pub trait PackageService: Send + Sync {
    /// Add or update a repository; `None` expiry means forever
    fn upsert_repository(&self, name: &str, expires: Option<DateTime<Utc>>) -> Result<()>;

    fn get_repositories(&self) -> Result<Vec<String>>;

    /// Store a new package read from `data`
    fn create_package(
        &self,
        locator: &Locator,
        data: &mut dyn Read,
        options: PackageOptions,
    ) -> Result<PackageEnvelope>;

    fn read_package_envelope(&self, locator: &Locator) -> Result<PackageEnvelope>;

    /// Envelope and content stream of a package
    fn read_package(&self, locator: &Locator) -> Result<(PackageEnvelope, PackageReader)>;

    /// Packages of a repository, ordered by locator
    fn get_packages(&self, repository: &str) -> Result<Vec<PackageEnvelope>>;

    fn delete_package(&self, locator: &Locator) -> Result<()>;

    /// Check if a package exists (default implementation)
    fn exists(&self, locator: &Locator) -> Result<bool> {
        match self.read_package_envelope(locator) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Package store over a local backend and blob directory
pub struct LocalPackages {
    backend: Arc<Backend>,
    blobs: BlobStore,
}

impl LocalPackages {
    /// Create a package store over an existing backend
    ///
    /// `dir` is the package content directory, usually `<state>/packages`.
    pub fn new(backend: Arc<Backend>, dir: &Path) -> Result<Self> {
        Ok(Self {
            backend,
            blobs: BlobStore::create(dir)?,
        })
    }

    /// Open or create a full state directory (`gravity.db` + `packages/`)
    pub fn open(state_dir: &Path) -> Result<Self> {
        let backend = Backend::open(&state_dir.join(BACKEND_FILE_NAME))?;
        Self::new(Arc::new(backend), &state_dir.join(PACKAGES_DIR))
    }

    /// Open an existing state directory without write access
    pub fn open_read_only(state_dir: &Path) -> Result<Self> {
        let backend = Backend::open_read_only(&state_dir.join(BACKEND_FILE_NAME))?;
        Ok(Self {
            backend: Arc::new(backend),
            blobs: BlobStore::open(state_dir.join(PACKAGES_DIR)),
        })
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    fn envelope(&self, locator: &Locator) -> Result<PackageEnvelope> {
        self.backend
            .get_package(locator)?
            .ok_or_else(|| StoreError::PackageNotFound {
                locator: locator.clone(),
            })
    }
}

impl PackageService for LocalPackages {
    fn upsert_repository(&self, name: &str, expires: Option<DateTime<Utc>>) -> Result<()> {
        self.backend.upsert_repository(name, expires)
    }

    fn get_repositories(&self) -> Result<Vec<String>> {
        self.backend.get_repositories()
    }

    fn create_package(
        &self,
        locator: &Locator,
        data: &mut dyn Read,
        options: PackageOptions,
    ) -> Result<PackageEnvelope> {
        if self.backend.get_repository(&locator.repository)?.is_none() {
            return Err(StoreError::RepositoryNotFound {
                name: locator.repository.clone(),
            });
        }
        if self.backend.get_package(locator)?.is_some() {
            return Err(StoreError::PackageAlreadyExists {
                locator: locator.clone(),
            });
        }

        let blob = self.blobs.write(data)?;
        let envelope = PackageEnvelope {
            locator: locator.clone(),
            size_bytes: blob.size,
            sha256: blob.sha256,
            runtime_labels: options.labels,
            manifest: options.manifest,
            created: Utc::now(),
        };
        self.backend.insert_package(&envelope)?;

        debug!(%locator, size = envelope.size_bytes, "created package");
        Ok(envelope)
    }

    fn read_package_envelope(&self, locator: &Locator) -> Result<PackageEnvelope> {
        self.envelope(locator)
    }

    fn read_package(&self, locator: &Locator) -> Result<(PackageEnvelope, PackageReader)> {
        let envelope = self.envelope(locator)?;
        let file = self
            .blobs
            .open_blob(&envelope.sha256)
            .map_err(|source| StoreError::ContentUnreadable {
                locator: locator.clone(),
                source,
            })?;
        Ok((envelope, Box::new(file)))
    }

    fn get_packages(&self, repository: &str) -> Result<Vec<PackageEnvelope>> {
        if self.backend.get_repository(repository)?.is_none() {
            return Err(StoreError::RepositoryNotFound {
                name: repository.to_string(),
            });
        }
        self.backend.list_packages(repository)
    }

    fn delete_package(&self, locator: &Locator) -> Result<()> {
        let envelope = self.envelope(locator)?;
        self.backend.delete_package(locator)?;

        if self.backend.count_content_refs(&envelope.sha256)? == 0 {
            self.blobs.remove(&envelope.sha256)?;
        }
        Ok(())
    }
}
