//! Helm chart loading
//!
//! Only the chart metadata (`Chart.yaml`) is interpreted. Templates and
//! values are carried into the application image as they are.

use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use stevedore_core::Manifest;

use crate::error::{BuildError, Result};

/// File holding chart metadata
pub const CHART_FILE_NAME: &str = "Chart.yaml";

/// Helm Chart.yaml structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// API version (v1 or v2)
    #[serde(default)]
    pub api_version: Option<String>,

    /// Chart name
    pub name: String,

    /// Chart version (SemVer)
    pub version: String,

    /// Chart description
    #[serde(default)]
    pub description: Option<String>,

    /// App version
    #[serde(default)]
    pub app_version: Option<String>,
}

/// A chart on disk
#[derive(Debug, Clone)]
pub struct Chart {
    pub path: PathBuf,
    pub metadata: ChartMetadata,
}

impl Chart {
    /// Parsed chart version
    pub fn version(&self) -> Result<Version> {
        Version::parse(&self.metadata.version).map_err(|e| BuildError::InvalidChart {
            path: self.path.clone(),
            message: format!("invalid version '{}': {}", self.metadata.version, e),
        })
    }

    /// Manifest of the application image built from this chart
    pub fn manifest(&self) -> Result<Manifest> {
        let mut manifest = Manifest::application(self.metadata.name.clone(), self.version()?);
        manifest.metadata.description = self.metadata.description.clone();
        if let Some(app_version) = &self.metadata.app_version {
            manifest
                .metadata
                .labels
                .insert("appVersion".to_string(), app_version.clone());
        }
        Ok(manifest)
    }
}

/// Loads charts from disk
pub trait ChartLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Chart>;
}

/// Loader for Helm chart directories
#[derive(Debug, Clone, Copy, Default)]
pub struct HelmChartLoader;

impl ChartLoader for HelmChartLoader {
    fn load(&self, path: &Path) -> Result<Chart> {
        let chart_file = path.join(CHART_FILE_NAME);
        if !chart_file.is_file() {
            return Err(BuildError::InvalidChart {
                path: path.to_path_buf(),
                message: format!("{} not found", CHART_FILE_NAME),
            });
        }

        let content = std::fs::read_to_string(&chart_file)?;
        let metadata: ChartMetadata =
            serde_yaml::from_str(&content).map_err(|e| BuildError::InvalidChart {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if metadata.name.is_empty() {
            return Err(BuildError::InvalidChart {
                path: path.to_path_buf(),
                message: "name is required".to_string(),
            });
        }

        let chart = Chart {
            path: path.to_path_buf(),
            metadata,
        };
        chart.version()?;
        Ok(chart)
    }
}
