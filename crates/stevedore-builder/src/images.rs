//! Container image references
//!
//! Vendored application images record the container images they embed in
//! `registry/images.yaml`. Listing reads that file back.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;

/// Directory holding embedded images inside an application image
pub const REGISTRY_DIR: &str = "registry";

/// File listing the embedded images inside the registry directory
pub const IMAGES_FILE_NAME: &str = "images.yaml";

static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*-?\s*image:\s*["']?([^\s"'#]+)["']?\s*(?:#.*)?$"#).expect("valid regex")
});

/// Lists images embedded in a registry directory
pub trait ImageLister: Send + Sync {
    fn list_images(&self, registry_dir: &Path) -> Result<BTreeSet<String>>;
}

/// Lister reading `images.yaml` from a vendored registry directory
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryImageLister;

impl ImageLister for RegistryImageLister {
    fn list_images(&self, registry_dir: &Path) -> Result<BTreeSet<String>> {
        let path = registry_dir.join(IMAGES_FILE_NAME);
        if !path.is_file() {
            return Ok(BTreeSet::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let images: Option<Vec<String>> = serde_yaml::from_str(&content)?;
        Ok(images.unwrap_or_default().into_iter().collect())
    }
}

/// Find literal `image:` references in YAML text
///
/// Templated references are not resolvable without values and are skipped.
pub fn find_image_references(content: &str) -> BTreeSet<String> {
    IMAGE_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|image| !image.contains("{{") && !image.contains("}}"))
        .map(str::to_string)
        .collect()
}

/// Write the list of embedded images
pub fn write_image_list(registry_dir: &Path, images: &BTreeSet<String>) -> Result<()> {
    std::fs::create_dir_all(registry_dir)?;
    let list: Vec<&String> = images.iter().collect();
    std::fs::write(registry_dir.join(IMAGES_FILE_NAME), serde_yaml::to_string(&list)?)?;
    Ok(())
}
