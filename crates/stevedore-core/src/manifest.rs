//! Application manifest (`app.yaml`)
//!
//! The manifest describes what kind of image an application is and which
//! packages and nested applications it depends on.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::locator::Locator;

/// API version written into generated manifests
pub const API_VERSION: &str = "bundle.gravitational.io/v2";

/// File name of the manifest inside application packages and installers
pub const MANIFEST_FILE_NAME: &str = "app.yaml";

/// Application manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// API version
    pub api_version: String,

    /// Image kind (Bundle, Cluster, Application)
    pub kind: ManifestKind,

    /// Identity and descriptive metadata
    pub metadata: Metadata,

    /// Declared packages and nested applications
    #[serde(default, skip_serializing_if = "Dependencies::is_empty")]
    pub dependencies: Dependencies,
}

/// Kind of application image
///
/// Unknown kinds are preserved as `Other` so they can be rejected explicitly
/// by consumers instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ManifestKind {
    Bundle,
    Cluster,
    Application,
    Other(String),
}

impl ManifestKind {
    /// Whether this kind describes a full cluster image
    pub fn is_cluster(&self) -> bool {
        matches!(self, ManifestKind::Bundle | ManifestKind::Cluster)
    }
}

impl From<String> for ManifestKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Bundle" => ManifestKind::Bundle,
            "Cluster" => ManifestKind::Cluster,
            "Application" => ManifestKind::Application,
            _ => ManifestKind::Other(value),
        }
    }
}

impl From<ManifestKind> for String {
    fn from(kind: ManifestKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Bundle => f.write_str("Bundle"),
            ManifestKind::Cluster => f.write_str("Cluster"),
            ManifestKind::Application => f.write_str("Application"),
            ManifestKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Manifest metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Application name
    pub name: String,

    /// Application version (SemVer)
    #[serde(with = "version_serde")]
    pub resource_version: Version,

    /// Repository the application package is registered in
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

fn default_repository() -> String {
    crate::locator::SYSTEM_REPOSITORY.to_string()
}

/// Declared dependencies of an application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Plain packages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Locator>,

    /// Nested applications
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<Locator>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.apps.is_empty()
    }

    /// Find a package dependency by name
    pub fn by_name(&self, name: &str) -> Option<&Locator> {
        self.packages.iter().find(|loc| loc.name == name)
    }
}

impl Manifest {
    /// Create a manifest for a standalone application image
    pub fn application(name: impl Into<String>, version: Version) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: ManifestKind::Application,
            metadata: Metadata {
                name: name.into(),
                resource_version: version,
                repository: default_repository(),
                description: None,
                labels: BTreeMap::new(),
            },
            dependencies: Dependencies::default(),
        }
    }

    /// Parse a manifest from YAML
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content)?;
        manifest.check()?;
        Ok(manifest)
    }

    /// Parse a manifest from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data).map_err(|e| CoreError::InvalidManifest {
            message: format!("invalid UTF-8: {}", e),
        })?;
        Self::parse(text)
    }

    /// Canonical text form written into packages and installers
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Locator of the application package this manifest describes
    pub fn locator(&self) -> Result<Locator> {
        Locator::new(
            self.metadata.repository.clone(),
            self.metadata.name.clone(),
            self.metadata.resource_version.clone(),
        )
    }

    fn check(&self) -> Result<()> {
        if self.metadata.name.is_empty() {
            return Err(CoreError::InvalidManifest {
                message: "metadata.name is required".to_string(),
            });
        }
        self.locator().map(|_| ())
    }
}

/// Custom serde for semver::Version
mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}
