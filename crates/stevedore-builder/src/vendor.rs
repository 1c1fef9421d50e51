//! Vendoring a chart into an application package
//!
//! The vendor directory ends up with the layout application packages use:
//!
//! ```text
//! resources/           chart files
//! resources/app.yaml   application manifest
//! registry/images.yaml container images embedded in this package
//! ```

use std::collections::BTreeSet;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use stevedore_core::{Manifest, compress_directory};
use stevedore_store::APP_MANIFEST_PATH;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BuildError, Result};
use crate::images::{REGISTRY_DIR, find_image_references, write_image_list};

/// Directory holding chart files inside an application package
pub const RESOURCES_DIR: &str = "resources";

/// Vendoring options
#[derive(Debug, Clone, Default)]
pub struct VendorOptions {
    /// Images already shipped elsewhere; they are not embedded again
    pub skip_images: BTreeSet<String>,

    /// Repository the application is registered in, instead of the
    /// manifest's own
    pub repository: Option<String>,
}

/// Input to a `Vendorer`
#[derive(Debug, Clone)]
pub struct VendorRequest {
    /// Chart directory
    pub source_dir: PathBuf,
    /// Scratch directory the package is assembled in
    pub vendor_dir: PathBuf,
    pub manifest: Manifest,
    pub options: VendorOptions,
}

/// Vendored package content
pub struct VendorOutput {
    /// tar.gz of the vendor directory
    pub stream: Box<dyn Read + Send>,
    /// Images embedded in the package
    pub images: BTreeSet<String>,
}

/// Turns a chart into an application package stream
pub trait Vendorer: Send + Sync {
    fn vendor(&self, request: &VendorRequest) -> Result<VendorOutput>;
}

/// Vendorer for Helm chart directories
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartVendor;

impl Vendorer for ChartVendor {
    fn vendor(&self, request: &VendorRequest) -> Result<VendorOutput> {
        let resources = request.vendor_dir.join(RESOURCES_DIR);
        let discovered = copy_chart(&request.source_dir, &resources)?;

        std::fs::write(
            request.vendor_dir.join(APP_MANIFEST_PATH),
            request.manifest.to_yaml()?,
        )?;

        let images: BTreeSet<String> = discovered
            .difference(&request.options.skip_images)
            .cloned()
            .collect();
        for skipped in discovered.intersection(&request.options.skip_images) {
            debug!(image = %skipped, "image already present in base image");
        }
        write_image_list(&request.vendor_dir.join(REGISTRY_DIR), &images)?;
        info!(
            discovered = discovered.len(),
            embedded = images.len(),
            "vendored chart images"
        );

        let mut stream = tempfile::tempfile()?;
        compress_directory(&request.vendor_dir, &mut stream, Vec::new())?;
        stream.seek(SeekFrom::Start(0))?;

        Ok(VendorOutput {
            stream: Box::new(stream),
            images,
        })
    }
}

/// Copy chart files into `dest`, returning the images they reference
fn copy_chart(source: &Path, dest: &Path) -> Result<BTreeSet<String>> {
    let vendor_error = |source: std::io::Error| BuildError::Vendor {
        path: dest.to_path_buf(),
        source,
    };

    let mut images = BTreeSet::new();
    std::fs::create_dir_all(dest).map_err(vendor_error)?;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| vendor_error(e.into()))?;
        let rel_path = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(rel_path);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(vendor_error)?;
            continue;
        }

        std::fs::copy(entry.path(), &target).map_err(vendor_error)?;
        if is_yaml(entry.path()) {
            let content = std::fs::read_to_string(entry.path()).map_err(vendor_error)?;
            images.extend(find_image_references(&content));
        }
    }

    Ok(images)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("tpl")
    )
}

impl std::fmt::Debug for VendorOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorOutput")
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}
