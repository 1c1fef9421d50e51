//! Read-only view of an existing application image

use std::path::{Path, PathBuf};
use stevedore_core::archive::extract_archive;
use stevedore_core::manifest::MANIFEST_FILE_NAME;
use stevedore_core::Manifest;
use stevedore_store::system::unpack;
use stevedore_store::LocalPackages;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{BuildError, Result};

/// An installer tarball or unpacked installer directory opened for reading
///
/// Tarballs are extracted into a temporary directory that lives as long
/// as the environment.
pub struct ImageEnvironment {
    pub packages: LocalPackages,
    pub manifest: Manifest,
    root: PathBuf,
    _extracted: Option<TempDir>,
}

impl ImageEnvironment {
    pub fn open(path: &Path) -> Result<Self> {
        let invalid = |message: String| BuildError::InvalidImage {
            path: path.to_path_buf(),
            message,
        };

        let (root, extracted) = if path.is_dir() {
            (path.to_path_buf(), None)
        } else {
            let dir = tempfile::Builder::new().prefix("image").tempdir()?;
            let file = std::fs::File::open(path).map_err(|e| invalid(e.to_string()))?;
            extract_archive(file, dir.path()).map_err(|e| invalid(e.to_string()))?;
            (dir.path().to_path_buf(), Some(dir))
        };
        debug!(image = %path.display(), root = %root.display(), "opened image");

        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| invalid(format!("failed to read {}: {}", MANIFEST_FILE_NAME, e)))?;
        let manifest = Manifest::parse(&content)?;

        let packages = LocalPackages::open_read_only(&root)?;

        Ok(Self {
            packages,
            manifest,
            root,
            _extracted: extracted,
        })
    }

    /// Extract the image's application package into `dir`
    pub fn unpack_app(&self, dir: &Path) -> Result<()> {
        let locator = self.manifest.locator()?;
        unpack(&self.packages, &locator, dir)?;
        Ok(())
    }
}

impl std::fmt::Debug for ImageEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageEnvironment")
            .field("root", &self.root)
            .field("manifest", &self.manifest.metadata.name)
            .finish()
    }
}
