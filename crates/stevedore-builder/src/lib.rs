//! Stevedore Builder - application images from Helm charts
//!
//! A build loads a chart, vendors it into an application package,
//! registers the package and writes a standalone installer for it:
//!
//! - **Chart**: `Chart.yaml` metadata and the manifest derived from it
//! - **Vendor**: chart files plus the list of embedded container images
//! - **Environment**: read access to a previously built image, used as the
//!   baseline of incremental builds
//!
//! ## Example
//!
//! ```rust,no_run
//! use stevedore_builder::{ApplicationBuilder, ApplicationRequest};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = ApplicationBuilder::ephemeral()?;
//! let output = builder.build(&ApplicationRequest {
//!     chart_path: "charts/wordpress".into(),
//!     ..Default::default()
//! })?;
//! println!("wrote {}", output.display());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod chart;
pub mod environment;
pub mod error;
pub mod images;
pub mod progress;
pub mod vendor;

pub use builder::{ApplicationBuilder, ApplicationRequest};
pub use chart::{Chart, ChartLoader, ChartMetadata, HelmChartLoader};
pub use environment::ImageEnvironment;
pub use error::{BuildError, Result};
pub use images::{ImageLister, RegistryImageLister};
pub use progress::{NoopProgress, Progress, RecordedProgress};
pub use vendor::{ChartVendor, VendorOptions, VendorOutput, VendorRequest, Vendorer};
