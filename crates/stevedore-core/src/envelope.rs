//! Package envelopes

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::manifest::Manifest;

/// Runtime labels attached to a package, in insertion order
pub type Labels = IndexMap<String, String>;

/// Metadata describing one stored package
///
/// The content itself is a byte stream retrievable by locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEnvelope {
    pub locator: Locator,

    /// Size of the content in bytes
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the content
    pub sha256: String,

    #[serde(default)]
    pub runtime_labels: Labels,

    /// Manifest, present when the package is an application
    #[serde(default)]
    pub manifest: Option<Manifest>,

    pub created: DateTime<Utc>,
}

impl PackageEnvelope {
    /// Whether this package carries an application manifest
    pub fn is_application(&self) -> bool {
        self.manifest.is_some()
    }
}
