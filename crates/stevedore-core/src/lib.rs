//! Stevedore Core - Core types shared by the installer pipeline
//!
//! This crate provides the foundational types used throughout Stevedore:
//! - `Locator`: Package identity (`repository/name:version`)
//! - `Manifest`: Application manifest (`app.yaml`) with kind and dependencies
//! - `PackageEnvelope`: Metadata describing one stored package
//! - `TrustedCluster`: Descriptor shipped inside cluster installers
//! - `archive`: tar.gz items and directory compression

pub mod archive;
pub mod envelope;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod trusted_cluster;

pub use archive::{ArchiveEntry, Item, ItemSource, compress_directory, write_items};
pub use envelope::{Labels, PackageEnvelope};
pub use error::{CoreError, ErrorKind, Result};
pub use locator::Locator;
pub use manifest::{Dependencies, Manifest, ManifestKind, Metadata};
pub use trusted_cluster::TrustedCluster;
