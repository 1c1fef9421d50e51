//! Trusted cluster descriptor
//!
//! Cluster installers may carry the address of a remote control plane the
//! installed cluster connects to. Remote support ships disabled; operators
//! turn it on after installation.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const KIND_TRUSTED_CLUSTER: &str = "trusted_cluster";
pub const VERSION_V2: &str = "v2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedCluster {
    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default = "default_version")]
    pub version: String,

    pub metadata: TrustedClusterMetadata,

    pub spec: TrustedClusterSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedClusterMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedClusterSpec {
    /// Whether remote support is turned on
    #[serde(default)]
    pub enabled: bool,

    /// Join token
    pub token: String,

    /// Address of the remote web proxy
    pub web_proxy_addr: String,

    /// Address of the reverse tunnel endpoint
    pub tunnel_addr: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni_host: Option<String>,

    /// Whether the cluster pulls application updates from the remote
    #[serde(default)]
    pub pull_updates: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

fn default_kind() -> String {
    KIND_TRUSTED_CLUSTER.to_string()
}

fn default_version() -> String {
    VERSION_V2.to_string()
}

impl TrustedCluster {
    /// Parse a descriptor from YAML or JSON
    pub fn parse(content: &str) -> Result<Self> {
        let cluster: Self = serde_yaml::from_str(content)?;
        if cluster.kind != KIND_TRUSTED_CLUSTER {
            return Err(CoreError::InvalidTrustedCluster {
                message: format!("unexpected kind '{}'", cluster.kind),
            });
        }
        if cluster.metadata.name.is_empty() {
            return Err(CoreError::InvalidTrustedCluster {
                message: "metadata.name is required".to_string(),
            });
        }
        Ok(cluster)
    }

    pub fn is_enabled(&self) -> bool {
        self.spec.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.spec.enabled = enabled;
    }

    /// Serialized form stored inside the trusted cluster package
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
