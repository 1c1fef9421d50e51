//! Installer bundle generation
//!
//! An installer is a tar.gz of a fresh state directory (`gravity.db` and
//! `packages/`) holding everything the application needs, together with
//! its manifest, the install scripts and, for cluster images, the
//! `gravity` binary.

use std::sync::Arc;
use stevedore_core::archive::{SHARED_EXECUTABLE_MASK, SHARED_READ_MASK};
use stevedore_core::locator::GRAVITY_PACKAGE;
use stevedore_core::manifest::MANIFEST_FILE_NAME;
use stevedore_core::{
    Dependencies, Item, Locator, ManifestKind, TrustedCluster, compress_directory,
};
use stevedore_store::system::{create_certificate_authority, create_trusted_cluster};
use stevedore_store::{
    Account, Application, Applications, BACKEND_FILE_NAME, Backend, EncryptedPackages,
    LocalPackages, PACKAGES_DIR, PackageService,
};
use tracing::info;

use crate::error::{InstallerError, Result};
use crate::pull::{pull_applications, pull_dependencies};
use crate::scripts::{
    CHECK_SCRIPT, CHECK_SCRIPT_FILE, GRAVITY_BINARY_FILE, INSTALL_SCRIPT, INSTALL_SCRIPT_FILE,
    README, README_FILE, UPGRADE_SCRIPT, UPGRADE_SCRIPT_FILE, UPLOAD_SCRIPT_FILE,
    render_upload_script,
};
use crate::stream::InstallerStream;

/// Prefix of installer working directories
const WORKDIR_PREFIX: &str = "installer";

const PEM_CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// Request to generate an installer
#[derive(Debug, Clone)]
pub struct InstallerRequest {
    /// Application to build the installer for
    pub application: Locator,

    /// Packages and applications carried in addition to the declared ones
    pub additional: Dependencies,

    /// Passphrase sealing the installer's package content; empty means none
    pub encryption_key: Option<String>,

    /// PEM certificate of the cluster certificate authority
    pub ca_cert: Option<String>,

    /// Remote control plane the installed cluster connects to
    pub trusted_cluster: Option<TrustedCluster>,

    /// Account created in the installer's store
    pub account: Account,
}

impl InstallerRequest {
    pub fn new(application: Locator) -> Self {
        Self {
            application,
            additional: Dependencies::default(),
            encryption_key: None,
            ca_cert: None,
            trusted_cluster: None,
            account: Account::new("", ""),
        }
    }

    /// Validate the request before any side effect
    pub fn check(&self) -> Result<()> {
        if let Some(cert) = &self.ca_cert {
            if !cert.contains(PEM_CERTIFICATE_HEADER) {
                return Err(InstallerError::InvalidRequest {
                    message: "CA certificate is not a PEM encoded certificate".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// How an installer is assembled for a manifest kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerKind {
    /// Full cluster image: dependencies, binary and cluster identity
    Cluster,
    /// Standalone application: the application package only
    Application,
}

impl InstallerKind {
    pub fn for_app(app: &Application) -> Result<Self> {
        match &app.manifest.kind {
            ManifestKind::Bundle | ManifestKind::Cluster => Ok(InstallerKind::Cluster),
            ManifestKind::Application => Ok(InstallerKind::Application),
            ManifestKind::Other(kind) => Err(InstallerError::UnsupportedKind {
                locator: app.locator.clone(),
                kind: kind.clone(),
            }),
        }
    }
}

/// Generate an installer for `request.application` from the `source` store
///
/// The returned stream owns a temporary working directory that is removed
/// once the stream is consumed, closed or dropped. On error the directory
/// is removed before returning.
pub fn get_app_installer(request: &InstallerRequest, source: &Applications) -> Result<InstallerStream> {
    request.check()?;

    let dir = tempfile::Builder::new().prefix(WORKDIR_PREFIX).tempdir()?;
    info!(app = %request.application, dir = %dir.path().display(), "generating installer");

    let backend = Arc::new(
        Backend::open(&dir.path().join(BACKEND_FILE_NAME))
            .map_err(InstallerError::store("create installer backend"))?,
    );
    let packages: Arc<dyn PackageService> = Arc::new(
        LocalPackages::new(backend.clone(), &dir.path().join(PACKAGES_DIR))
            .map_err(InstallerError::store("create installer package store"))?,
    );
    let packages = match request.encryption_key.as_deref() {
        Some(key) if !key.is_empty() => {
            info!(app = %request.application, "encrypting installer packages");
            Arc::new(EncryptedPackages::new(packages, key)) as Arc<dyn PackageService>
        }
        _ => packages,
    };
    let local = Applications::new(packages);

    backend
        .create_account(&request.account)
        .map_err(InstallerError::store("create account"))?;

    let app = source
        .get_app(&request.application)
        .map_err(InstallerError::pull(&request.application))?;

    let mut items = match InstallerKind::for_app(&app)? {
        InstallerKind::Cluster => cluster_items(request, &app, &local, source)?,
        InstallerKind::Application => {
            pull_applications(std::slice::from_ref(&app), &local, source)?;
            Vec::new()
        }
    };

    let manifest = app.manifest.to_yaml()?;
    items.push(Item::from_string_mode(MANIFEST_FILE_NAME, manifest, SHARED_READ_MASK));

    // The store must be closed before its files are archived
    drop(local);
    drop(backend);

    InstallerStream::spawn(dir, move |root, out| {
        let upload = render_upload_script()?;
        items.extend([
            Item::from_string_mode(INSTALL_SCRIPT_FILE, INSTALL_SCRIPT, SHARED_EXECUTABLE_MASK),
            Item::from_string_mode(UPLOAD_SCRIPT_FILE, upload, SHARED_EXECUTABLE_MASK),
            Item::from_string_mode(UPGRADE_SCRIPT_FILE, UPGRADE_SCRIPT, SHARED_EXECUTABLE_MASK),
            Item::from_string_mode(CHECK_SCRIPT_FILE, CHECK_SCRIPT, SHARED_EXECUTABLE_MASK),
            Item::from_string_mode(README_FILE, README, SHARED_READ_MASK),
        ]);
        compress_directory(root, out, items)?;
        Ok(())
    })
}

fn cluster_items(
    request: &InstallerRequest,
    app: &Application,
    local: &Applications,
    source: &Applications,
) -> Result<Vec<Item>> {
    pull_dependencies(app, &request.additional, local, source)?;
    let binary = gravity_binary(app, source)?;

    if let Some(cert) = &request.ca_cert {
        create_certificate_authority(local.packages().as_ref(), cert)
            .map_err(InstallerError::store("add certificate authority"))?;
    }

    if let Some(cluster) = &request.trusted_cluster {
        // Remote support ships disabled
        let mut cluster = cluster.clone();
        cluster.set_enabled(false);
        create_trusted_cluster(local.packages().as_ref(), &cluster)
            .map_err(InstallerError::store("add trusted cluster"))?;
    }

    Ok(vec![binary])
}

fn gravity_binary(app: &Application, source: &Applications) -> Result<Item> {
    let locator = app
        .manifest
        .dependencies
        .by_name(GRAVITY_PACKAGE)
        .ok_or_else(|| InstallerError::BinaryNotDeclared {
            locator: app.locator.clone(),
            name: GRAVITY_PACKAGE.to_string(),
        })?;

    let (envelope, reader) = source
        .packages()
        .read_package(locator)
        .map_err(InstallerError::pull(locator))?;

    Ok(Item::from_stream(
        GRAVITY_BINARY_FILE,
        reader,
        envelope.size_bytes,
        SHARED_EXECUTABLE_MASK,
    ))
}
