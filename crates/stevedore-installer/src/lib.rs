//! Stevedore Installer - offline installer bundles
//!
//! Generating an installer resolves an application's dependency closure,
//! mirrors it into a fresh store and streams that store out as a
//! self-contained tar.gz together with the install scripts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stevedore_core::Locator;
//! use stevedore_installer::{InstallerRequest, get_app_installer};
//! use stevedore_store::{Applications, LocalPackages};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Applications::new(Arc::new(LocalPackages::open("/var/lib/stevedore".as_ref())?));
//! let request = InstallerRequest::new(Locator::parse("gravitational.io/telekube:7.0.1")?);
//!
//! let mut installer = get_app_installer(&request, &source)?;
//! let mut out = std::fs::File::create("telekube-7.0.1.tar")?;
//! std::io::copy(&mut installer, &mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod dependencies;
pub mod error;
pub mod installer;
pub mod pull;
pub mod scripts;
pub mod stream;

pub use dependencies::{DependencyRequest, DependencySet, get_dependencies};
pub use error::{InstallerError, Result};
pub use installer::{InstallerKind, InstallerRequest, get_app_installer};
pub use pull::{pull_applications, pull_dependencies, pull_packages};
pub use stream::InstallerStream;
