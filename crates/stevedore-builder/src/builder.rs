//! Application image builds
//!
//! A build turns a chart into an installer tarball: the chart is vendored
//! into an application package, registered in the builder's store and
//! bundled into an installer written to the output path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stevedore_core::Manifest;
use stevedore_installer::{InstallerRequest, InstallerStream, get_app_installer};
use stevedore_store::{Applications, LocalPackages, StoreError};
use tempfile::TempDir;
use tracing::info;

use crate::chart::{ChartLoader, HelmChartLoader};
use crate::environment::ImageEnvironment;
use crate::error::{BuildError, Result};
use crate::images::{ImageLister, REGISTRY_DIR, RegistryImageLister};
use crate::progress::{NoopProgress, Progress};
use crate::vendor::{ChartVendor, VendorOptions, VendorRequest, Vendorer};

/// Parameters of an application image build
#[derive(Debug, Clone, Default)]
pub struct ApplicationRequest {
    /// Chart directory to build from
    pub chart_path: PathBuf,

    /// Output file; `<name>-<version>.tar` in the current directory if unset
    pub output_path: Option<PathBuf>,

    /// Replace an existing output file
    pub overwrite: bool,

    pub vendor: VendorOptions,

    /// Previous image whose embedded images are not vendored again
    pub from: Option<PathBuf>,
}

/// Builds application images from charts
pub struct ApplicationBuilder {
    apps: Applications,
    loader: Box<dyn ChartLoader>,
    vendorer: Box<dyn Vendorer>,
    lister: Box<dyn ImageLister>,
    progress: Box<dyn Progress>,
    _state: Option<TempDir>,
}

impl ApplicationBuilder {
    /// Builder registering applications in `apps`
    pub fn new(apps: Applications) -> Self {
        Self {
            apps,
            loader: Box::new(HelmChartLoader),
            vendorer: Box::new(ChartVendor),
            lister: Box::new(RegistryImageLister),
            progress: Box::new(NoopProgress),
            _state: None,
        }
    }

    /// Builder with a private store removed when the builder is dropped
    pub fn ephemeral() -> Result<Self> {
        let state = tempfile::Builder::new().prefix("build").tempdir()?;
        let packages = LocalPackages::open(state.path())?;
        let mut builder = Self::new(Applications::new(Arc::new(packages)));
        builder._state = Some(state);
        Ok(builder)
    }

    pub fn with_loader(mut self, loader: impl ChartLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_vendorer(mut self, vendorer: impl Vendorer + 'static) -> Self {
        self.vendorer = Box::new(vendorer);
        self
    }

    pub fn with_image_lister(mut self, lister: impl ImageLister + 'static) -> Self {
        self.lister = Box::new(lister);
        self
    }

    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Store applications are registered in
    pub fn apps(&self) -> &Applications {
        &self.apps
    }

    /// Build an application image, returning the path it was written to
    pub fn build(&self, request: &ApplicationRequest) -> Result<PathBuf> {
        let chart = self.loader.load(&request.chart_path)?;
        let mut manifest = chart.manifest()?;
        if let Some(repository) = &request.vendor.repository {
            manifest.metadata.repository = repository.clone();
        }

        let output_path = check_output_path(&manifest, request)?;
        let locator = manifest.locator()?;
        if self.apps.packages().exists(&locator)? {
            return Err(StoreError::PackageAlreadyExists { locator }.into());
        }
        self.progress.next_step(&format!(
            "Building application image {} {} from Helm chart",
            locator.name, locator.version
        ));

        let mut options = request.vendor.clone();
        if let Some(from) = &request.from {
            self.progress
                .next_step("Discovering Docker images in the existing application image");
            options.skip_images.extend(self.baseline_images(from)?);
        }

        let vendor_dir = tempfile::Builder::new().prefix("vendor").tempdir()?;
        self.progress.next_step("Discovering and embedding Docker images");
        let mut output = self.vendorer.vendor(&VendorRequest {
            source_dir: request.chart_path.clone(),
            vendor_dir: vendor_dir.path().to_path_buf(),
            manifest: manifest.clone(),
            options,
        })?;

        self.progress.next_step("Creating application");
        let app = self.apps.create_app(&mut output.stream)?;
        info!(app = %app.locator, images = output.images.len(), "created application");

        self.progress.next_step("Packaging application image");
        let installer =
            get_app_installer(&InstallerRequest::new(app.locator.clone()), &self.apps)?;

        self.progress
            .next_step(&format!("Saving application image to {}", output_path.display()));
        save_installer(installer, &output_path)?;

        Ok(output_path)
    }

    /// Images embedded in the application of an existing image
    fn baseline_images(&self, from: &Path) -> Result<BTreeSet<String>> {
        let image = ImageEnvironment::open(from)?;
        let dir = tempfile::Builder::new().prefix("patch").tempdir()?;
        image.unpack_app(dir.path())?;
        self.lister.list_images(&dir.path().join(REGISTRY_DIR))
    }
}

/// Write an installer next to `output_path` and move it into place
///
/// A failed write leaves nothing at `output_path`.
fn save_installer(mut installer: InstallerStream, output_path: &Path) -> Result<()> {
    let parent = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::copy(&mut installer, &mut temp)?;
    installer.close();

    temp.persist(output_path).map_err(|e| BuildError::Io(e.error))?;
    Ok(())
}

/// Resolve the output path, refusing to replace a file unless asked to
fn check_output_path(manifest: &Manifest, request: &ApplicationRequest) -> Result<PathBuf> {
    let path = request.output_path.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "{}-{}.tar",
            manifest.metadata.name, manifest.metadata.resource_version
        ))
    });

    if path.exists() && !request.overwrite {
        return Err(BuildError::OutputExists { path });
    }
    Ok(path)
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("apps", &self.apps)
            .finish_non_exhaustive()
    }
}
