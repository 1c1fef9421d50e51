//! Package locators
//!
//! A locator is the globally unique identity of a stored package, written
//! as `repository/name:version`, e.g. `gravitational.io/gravity:7.0.1`.

use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Repository holding system packages shipped with every cluster installer
pub const SYSTEM_REPOSITORY: &str = "gravitational.io";

/// Name of the package carrying the installer binary
pub const GRAVITY_PACKAGE: &str = "gravity";

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._-]*$").expect("valid regex"));

/// Identity of a package: repository, name and SemVer version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
    pub repository: String,
    pub name: String,
    pub version: Version,
}

impl Locator {
    /// Create a locator, validating repository and name
    pub fn new(
        repository: impl Into<String>,
        name: impl Into<String>,
        version: Version,
    ) -> Result<Self> {
        let locator = Self {
            repository: repository.into(),
            name: name.into(),
            version,
        };
        locator.check()?;
        Ok(locator)
    }

    /// Parse `repository/name:version`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidLocator {
            locator: input.to_string(),
            reason: reason.to_string(),
        };

        let (path, version) = input
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected repository/name:version"))?;
        let (repository, name) = path
            .split_once('/')
            .ok_or_else(|| invalid("missing repository"))?;
        let version = Version::parse(version).map_err(|e| invalid(&e.to_string()))?;

        Self::new(repository, name, version)
    }

    /// Package holding the certificate authority of an installer
    pub fn certificate_authority() -> Self {
        Self {
            repository: SYSTEM_REPOSITORY.to_string(),
            name: "cert-authority".to_string(),
            version: Version::new(0, 0, 1),
        }
    }

    /// Package holding the trusted cluster descriptor of an installer
    pub fn trusted_cluster() -> Self {
        Self {
            repository: SYSTEM_REPOSITORY.to_string(),
            name: "trusted-cluster".to_string(),
            version: Version::new(0, 0, 1),
        }
    }

    fn check(&self) -> Result<()> {
        for (field, value) in [("repository", &self.repository), ("name", &self.name)] {
            if !NAME_RE.is_match(value) {
                return Err(CoreError::InvalidLocator {
                    locator: self.to_string(),
                    reason: format!("invalid {} '{}'", field, value),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repository, self.name, self.version)
    }
}

impl FromStr for Locator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Locator {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Locator::parse(&s).map_err(serde::de::Error::custom)
    }
}
