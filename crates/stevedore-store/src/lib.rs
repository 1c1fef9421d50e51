//! Stevedore Store - package storage for the installer pipeline
//!
//! This crate provides:
//!
//! - **Backend**: SQLite metadata (accounts, repositories, package records)
//! - **Blobs**: content-addressed package content, stored once per digest
//! - **Packages**: the `PackageService` trait and its local implementation
//! - **Encryption**: AES-GCM sealed package content over any store
//! - **Applications**: manifest-aware registry over any package store
//! - **System packages**: certificate authority and trusted cluster
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stevedore_store::{Applications, LocalPackages};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let packages = LocalPackages::open(std::path::Path::new("/var/lib/stevedore"))?;
//! let apps = Applications::new(Arc::new(packages));
//! for app in apps.list_apps("gravitational.io")? {
//!     println!("{} ({})", app.locator, app.manifest.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod backend;
pub mod blobs;
pub mod encrypted;
pub mod error;
pub mod packages;
pub mod system;

pub use apps::{APP_MANIFEST_PATH, Application, Applications};
pub use backend::{Account, BACKEND_FILE_NAME, Backend};
pub use blobs::{BlobInfo, BlobStore};
pub use encrypted::{ENCRYPTED_LABEL, EncryptedPackages};
pub use error::{Result, StoreError};
pub use packages::{LocalPackages, PACKAGES_DIR, PackageOptions, PackageReader, PackageService};
