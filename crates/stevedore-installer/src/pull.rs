//! Mirroring packages and applications between stores
//!
//! Items are copied one at a time in order. The first failure aborts the
//! pull; items copied before it stay in the destination.

use stevedore_core::{Dependencies, PackageEnvelope};
use stevedore_store::{Application, Applications, PackageOptions};
use tracing::{debug, info};

use crate::dependencies::{DependencyRequest, get_dependencies};
use crate::error::{InstallerError, Result};

/// Copy packages from `src` into `dst`
///
/// A package already present in the destination is an error.
pub fn pull_packages(
    packages: &[PackageEnvelope],
    dst: &Applications,
    src: &Applications,
) -> Result<()> {
    info!(count = packages.len(), "pulling packages");

    for envelope in packages {
        let locator = &envelope.locator;
        let (_, mut reader) = src
            .packages()
            .read_package(locator)
            .map_err(InstallerError::pull(locator))?;

        dst.packages()
            .upsert_repository(&locator.repository, None)
            .map_err(InstallerError::pull(locator))?;
        dst.packages()
            .create_package(
                locator,
                &mut reader,
                PackageOptions::with_labels(envelope.runtime_labels.clone()),
            )
            .map_err(InstallerError::pull(locator))?;
    }

    Ok(())
}

/// Copy applications from `src` into `dst`
///
/// Applications already registered in the destination are skipped.
pub fn pull_applications(apps: &[Application], dst: &Applications, src: &Applications) -> Result<()> {
    info!(count = apps.len(), "pulling applications");

    for app in apps {
        let locator = &app.locator;
        let (_, mut reader) = src
            .packages()
            .read_package(locator)
            .map_err(InstallerError::pull(locator))?;

        match dst.create_app_with_manifest(
            locator,
            app.manifest.clone(),
            &mut reader,
            app.envelope.runtime_labels.clone(),
        ) {
            Ok(_) => {}
            Err(e) if e.is_already_exists() => {
                debug!(%locator, "application already exists");
            }
            Err(e) => return Err(InstallerError::pull(locator)(e)),
        }
    }

    Ok(())
}

/// Resolve the dependencies of `app` and mirror them together with `app`
pub fn pull_dependencies(
    app: &Application,
    additional: &Dependencies,
    dst: &Applications,
    src: &Applications,
) -> Result<()> {
    let set = get_dependencies(DependencyRequest { app, additional }, src)?;
    pull_packages(&set.packages, dst, src)?;
    pull_applications(&set.apps, dst, src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::Arc;
    use stevedore_core::{ErrorKind, Labels, Locator, Manifest, ManifestKind};
    use stevedore_store::{BlobStore, LocalPackages, PACKAGES_DIR, PackageService};
    use tempfile::TempDir;

    fn loc(s: &str) -> Locator {
        Locator::parse(s).unwrap()
    }

    fn store() -> (TempDir, Applications) {
        let temp = TempDir::new().unwrap();
        let packages = LocalPackages::open(temp.path()).unwrap();
        packages.upsert_repository("gravitational.io", None).unwrap();
        (temp, Applications::new(Arc::new(packages)))
    }

    fn add_package(apps: &Applications, locator: &str) -> PackageEnvelope {
        let mut labels = Labels::new();
        labels.insert("purpose".to_string(), "test".to_string());
        apps.packages()
            .create_package(
                &loc(locator),
                &mut locator.as_bytes(),
                PackageOptions::with_labels(labels),
            )
            .unwrap()
    }

    fn add_app(apps: &Applications, locator: &str, packages: &[&str]) -> Application {
        let locator = loc(locator);
        let mut manifest = Manifest::application(&locator.name, locator.version.clone());
        manifest.kind = ManifestKind::Cluster;
        manifest.dependencies.packages = packages.iter().map(|p| loc(p)).collect();
        apps.create_app_with_manifest(&locator, manifest, &mut &b"app"[..], Labels::new())
            .unwrap()
    }

    fn read(apps: &Applications, locator: &str) -> String {
        let (_, mut reader) = apps.packages().read_package(&loc(locator)).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_pull_dependencies() {
        let (_src_dir, src) = store();
        let (_dst_dir, dst) = store();
        add_package(&src, "gravitational.io/gravity:7.0.1");
        add_package(&src, "gravitational.io/planet:7.0.1");
        let app = add_app(
            &src,
            "gravitational.io/cluster:7.0.1",
            &["gravitational.io/gravity:7.0.1", "gravitational.io/planet:7.0.1"],
        );

        pull_dependencies(&app, &Dependencies::default(), &dst, &src).unwrap();

        assert_eq!(read(&dst, "gravitational.io/planet:7.0.1"), "gravitational.io/planet:7.0.1");
        let envelope = dst
            .packages()
            .read_package_envelope(&loc("gravitational.io/gravity:7.0.1"))
            .unwrap();
        assert_eq!(envelope.runtime_labels["purpose"], "test");
        assert_eq!(dst.get_app(&app.locator).unwrap().manifest, app.manifest);
    }

    #[test]
    fn test_pull_application_twice_is_idempotent() {
        let (_src_dir, src) = store();
        let (dst_dir, dst) = store();
        let app = add_app(&src, "gravitational.io/cluster:7.0.1", &[]);

        pull_applications(std::slice::from_ref(&app), &dst, &src).unwrap();
        pull_applications(std::slice::from_ref(&app), &dst, &src).unwrap();

        let apps = dst.list_apps("gravitational.io").unwrap();
        assert_eq!(apps.len(), 1);

        let blobs = BlobStore::open(dst_dir.path().join(PACKAGES_DIR));
        assert!(blobs.contains(&apps[0].envelope.sha256));
    }

    #[test]
    fn test_pull_package_twice_fails() {
        let (_src_dir, src) = store();
        let (_dst_dir, dst) = store();
        let envelope = add_package(&src, "gravitational.io/planet:7.0.1");

        pull_packages(std::slice::from_ref(&envelope), &dst, &src).unwrap();
        let err = pull_packages(std::slice::from_ref(&envelope), &dst, &src).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_pull_stops_at_unreadable_package() {
        let (src_dir, src) = store();
        let (_dst_dir, dst) = store();
        let first = add_package(&src, "gravitational.io/a:1.0.0");
        let broken = add_package(&src, "gravitational.io/b:1.0.0");
        let last = add_package(&src, "gravitational.io/c:1.0.0");

        let blobs = BlobStore::open(src_dir.path().join(PACKAGES_DIR));
        std::fs::remove_file(blobs.path(&broken.sha256)).unwrap();

        let err = pull_packages(&[first.clone(), broken.clone(), last.clone()], &dst, &src)
            .unwrap_err();
        assert!(matches!(err, InstallerError::Pull { ref locator, .. } if *locator == broken.locator));
        assert_eq!(err.kind(), ErrorKind::Io);

        // Items before the failure stay copied, nothing after it is attempted
        assert!(dst.packages().exists(&first.locator).unwrap());
        assert!(!dst.packages().exists(&broken.locator).unwrap());
        assert!(!dst.packages().exists(&last.locator).unwrap());
    }
}
