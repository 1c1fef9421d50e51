//! Application registry
//!
//! An application is a package whose envelope carries a manifest. The
//! registry layers manifest-aware operations over any `PackageService`.

use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use stevedore_core::archive::read_file_from_archive;
use stevedore_core::{Labels, Locator, Manifest, PackageEnvelope};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::packages::{PackageOptions, PackageService};

/// Path of the manifest inside an application package
pub const APP_MANIFEST_PATH: &str = "resources/app.yaml";

/// A registered application
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    pub locator: Locator,
    pub manifest: Manifest,
    pub envelope: PackageEnvelope,
}

impl Application {
    fn from_envelope(envelope: PackageEnvelope) -> Result<Self> {
        let manifest = envelope
            .manifest
            .clone()
            .ok_or_else(|| StoreError::NotAnApplication {
                locator: envelope.locator.clone(),
            })?;
        Ok(Self {
            locator: envelope.locator.clone(),
            manifest,
            envelope,
        })
    }
}

/// Application registry over a package store
#[derive(Clone)]
pub struct Applications {
    packages: Arc<dyn PackageService>,
}

impl Applications {
    pub fn new(packages: Arc<dyn PackageService>) -> Self {
        Self { packages }
    }

    /// Underlying package store
    pub fn packages(&self) -> &Arc<dyn PackageService> {
        &self.packages
    }

    /// Get an application by locator
    pub fn get_app(&self, locator: &Locator) -> Result<Application> {
        let envelope = self.packages.read_package_envelope(locator)?;
        Application::from_envelope(envelope)
    }

    /// Register an application package with an already known manifest
    pub fn create_app_with_manifest(
        &self,
        locator: &Locator,
        manifest: Manifest,
        data: &mut dyn Read,
        labels: Labels,
    ) -> Result<Application> {
        self.packages.upsert_repository(&locator.repository, None)?;

        let envelope = self.packages.create_package(
            locator,
            data,
            PackageOptions {
                labels,
                manifest: Some(manifest),
            },
        )?;
        Application::from_envelope(envelope)
    }

    /// Register an application tarball, reading its manifest from the content
    pub fn create_app(&self, data: &mut dyn Read) -> Result<Application> {
        let mut buffer = tempfile::tempfile()?;
        std::io::copy(data, &mut buffer)?;
        buffer.seek(SeekFrom::Start(0))?;

        let raw = read_file_from_archive(&mut buffer, APP_MANIFEST_PATH).map_err(|e| {
            StoreError::InvalidApplication {
                message: format!("failed to read {}: {}", APP_MANIFEST_PATH, e),
            }
        })?;
        let manifest = Manifest::from_bytes(&raw)?;
        let locator = manifest.locator()?;
        buffer.seek(SeekFrom::Start(0))?;

        info!(%locator, kind = %manifest.kind, "importing application");
        self.create_app_with_manifest(&locator, manifest, &mut buffer, Labels::new())
    }

    /// Applications of a repository
    pub fn list_apps(&self, repository: &str) -> Result<Vec<Application>> {
        self.packages
            .get_packages(repository)?
            .into_iter()
            .filter(PackageEnvelope::is_application)
            .map(Application::from_envelope)
            .collect()
    }
}

impl std::fmt::Debug for Applications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applications").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::LocalPackages;
    use semver::Version;
    use stevedore_core::archive::{Item, SHARED_READ_MASK, write_items};
    use stevedore_core::{ErrorKind, ManifestKind};
    use tempfile::TempDir;

    fn registry() -> (TempDir, Applications) {
        let temp = TempDir::new().unwrap();
        let packages = LocalPackages::open(temp.path()).unwrap();
        (temp, Applications::new(Arc::new(packages)))
    }

    fn app_tarball(manifest: &Manifest) -> Vec<u8> {
        let mut out = Vec::new();
        write_items(
            &mut out,
            vec![
                Item::from_string_mode(
                    APP_MANIFEST_PATH,
                    manifest.to_yaml().unwrap(),
                    SHARED_READ_MASK,
                ),
                Item::from_string_mode("resources/charts/values.yaml", "replicas: 1\n", SHARED_READ_MASK),
            ],
        )
        .unwrap();
        out
    }

    #[test]
    fn test_create_app_reads_manifest() {
        let (_temp, apps) = registry();
        let manifest = Manifest::application("wordpress", Version::new(1, 2, 0));

        let app = apps
            .create_app(&mut app_tarball(&manifest).as_slice())
            .unwrap();
        assert_eq!(app.locator.to_string(), "gravitational.io/wordpress:1.2.0");
        assert_eq!(app.manifest.kind, ManifestKind::Application);

        let fetched = apps.get_app(&app.locator).unwrap();
        assert_eq!(fetched.manifest, manifest);
        assert_eq!(apps.list_apps("gravitational.io").unwrap().len(), 1);
    }

    #[test]
    fn test_create_app_without_manifest() {
        let (_temp, apps) = registry();
        let mut out = Vec::new();
        write_items(&mut out, vec![]).unwrap();

        let err = apps.create_app(&mut out.as_slice()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidApplication { .. }));
    }

    #[test]
    fn test_create_app_twice_already_exists() {
        let (_temp, apps) = registry();
        let manifest = Manifest::application("nginx", Version::new(0, 1, 0));
        let locator = manifest.locator().unwrap();

        apps.create_app_with_manifest(&locator, manifest.clone(), &mut &b"a"[..], Labels::new())
            .unwrap();
        let err = apps
            .create_app_with_manifest(&locator, manifest, &mut &b"a"[..], Labels::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_get_app_for_plain_package() {
        let (_temp, apps) = registry();
        let locator = Locator::parse("gravitational.io/planet:7.0.1").unwrap();
        apps.packages()
            .upsert_repository("gravitational.io", None)
            .unwrap();
        apps.packages()
            .create_package(&locator, &mut &b"x"[..], PackageOptions::default())
            .unwrap();

        let err = apps.get_app(&locator).unwrap_err();
        assert!(matches!(err, StoreError::NotAnApplication { .. }));
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(apps.list_apps("gravitational.io").unwrap().is_empty());
    }
}
